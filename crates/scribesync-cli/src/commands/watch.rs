//! Watch command - continuous sync until interrupted
//!
//! Runs one full pass, then keeps a filesystem watch alive so edits sync
//! seconds after they settle. A periodic full pass catches anything the
//! watch missed, and the proactive refresh task keeps the access token
//! fresh the whole time.

use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;
use scribesync_engine::EngineError;
use tracing::{info, warn};

use crate::commands::sync::print_report;
use crate::context::AppContext;
use crate::output::{OutputFormat, Printer};

#[derive(Debug, Args)]
pub struct WatchCommand {
    /// Skip the initial full pass
    #[arg(long)]
    pub no_initial_sync: bool,
}

impl WatchCommand {
    pub async fn execute(&self, config: Option<&str>, format: OutputFormat) -> Result<()> {
        let printer = Printer::new(format);
        let ctx = AppContext::build(config).await?;
        let orchestrator = ctx.orchestrator().await?;

        let refresh_task = ctx.tokens.clone().spawn_refresh_task();

        if !self.no_initial_sync {
            match orchestrator.sync_all(false).await {
                Ok(report) => print_report(&printer, &report),
                Err(EngineError::NotAuthenticated) => {
                    printer.error("Not signed in. Run 'scribesync auth login' first.");
                    refresh_task.abort();
                    anyhow::bail!("not authenticated");
                }
                Err(EngineError::AuthInvalidated) => {
                    printer.error("Your session has expired. Run 'scribesync auth login' again.");
                    refresh_task.abort();
                    anyhow::bail!("credentials invalidated");
                }
                Err(e) => warn!(error = %e, "Initial sync pass failed; watching anyway"),
            }
        }

        orchestrator
            .start_watching()
            .await
            .context("Failed to start the vault watch")?;
        printer.success(&format!(
            "Watching {} (Ctrl-C to stop)",
            ctx.config.vault.root.display()
        ));

        let mut full_pass = tokio::time::interval(Duration::from_secs(
            ctx.config.sync.full_sync_interval_secs,
        ));
        full_pass.tick().await; // the first tick fires immediately

        loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    info!("Interrupt received, shutting down");
                    break;
                }
                _ = full_pass.tick() => {
                    match orchestrator.sync_all(false).await {
                        Ok(report) => info!(
                            created = report.created,
                            updated = report.updated,
                            deleted = report.deleted,
                            failed = report.failed,
                            "Periodic full pass finished"
                        ),
                        Err(EngineError::AlreadyRunning) => {}
                        Err(EngineError::AuthInvalidated) => {
                            printer.error(
                                "Your session has expired. Run 'scribesync auth login' again.",
                            );
                            break;
                        }
                        Err(e) => warn!(error = %e, "Periodic full pass failed"),
                    }
                }
            }
        }

        orchestrator.stop_watching().await;
        refresh_task.abort();
        printer.success("Watch stopped");
        Ok(())
    }
}
