//! Sync command - one full pass over the vault

use anyhow::{Context, Result};
use clap::Args;
use scribesync_engine::engine::SyncReport;
use scribesync_engine::EngineError;
use tracing::info;

use crate::context::AppContext;
use crate::output::{OutputFormat, Printer};

#[derive(Debug, Args)]
pub struct SyncCommand {
    /// Re-upload everything, ignoring recorded sync state
    #[arg(long)]
    pub force: bool,
}

impl SyncCommand {
    pub async fn execute(&self, config: Option<&str>, format: OutputFormat) -> Result<()> {
        let printer = Printer::new(format);
        let ctx = AppContext::build(config).await?;

        if self.force {
            info!("Ignoring recorded sync state (--force)");
        }

        let orchestrator = ctx.orchestrator().await?;
        let report = match orchestrator.sync_all(self.force).await {
            Ok(report) => report,
            Err(EngineError::NotAuthenticated) => {
                printer.error("Not signed in. Run 'scribesync auth login' first.");
                anyhow::bail!("not authenticated");
            }
            Err(EngineError::AuthInvalidated) => {
                printer.error("Your session has expired. Run 'scribesync auth login' again.");
                anyhow::bail!("credentials invalidated");
            }
            Err(e) => return Err(e).context("Sync pass failed"),
        };

        print_report(&printer, &report);

        if report.failed > 0 {
            return Err(EngineError::Incomplete {
                failed: report.failed,
            }
            .into());
        }
        Ok(())
    }
}

pub fn print_report(printer: &Printer, report: &SyncReport) {
    printer.json(&serde_json::json!({
        "scanned": report.scanned,
        "created": report.created,
        "updated": report.updated,
        "deleted": report.deleted,
        "skipped": report.skipped,
        "failed": report.failed,
    }));
    if printer.is_json() {
        return;
    }

    printer.success(&format!(
        "Sync complete: {} scanned, {} created, {} updated, {} deleted",
        report.scanned, report.created, report.updated, report.deleted
    ));
    if report.skipped > 0 {
        printer.detail(&format!("{} unchanged", report.skipped));
    }
    if report.failed > 0 {
        printer.warn(&format!("{} item(s) failed; see the log for details", report.failed));
    }
}
