//! Status command - authentication and sync state at a glance

use anyhow::Result;
use chrono::{TimeZone, Utc};
use clap::Args;
use scribesync_core::ports::auth::AuthGate;
use scribesync_engine::state::{JsonFileState, SyncStateStore};

use crate::context::AppContext;
use crate::output::{OutputFormat, Printer};

#[derive(Debug, Args)]
pub struct StatusCommand {}

impl StatusCommand {
    pub async fn execute(&self, config: Option<&str>, format: OutputFormat) -> Result<()> {
        let printer = Printer::new(format);
        let ctx = AppContext::build(config).await?;

        // Read the snapshot directly; status must not require a live vault
        let state = SyncStateStore::new(Box::new(JsonFileState::new(
            ctx.config.sync.state_file.clone(),
        )));
        state.load().await?;

        let auth_state = ctx.tokens.auth_state();
        let last_sync_ms = state.last_sync_time();
        let last_sync = (last_sync_ms > 0)
            .then(|| Utc.timestamp_millis_opt(last_sync_ms).single())
            .flatten();

        printer.json(&serde_json::json!({
            "authState": auth_state.name(),
            "vaultRoot": ctx.config.vault.root,
            "serverUrl": ctx.config.api.base_url,
            "trackedFiles": state.len(),
            "lastSyncTime": last_sync.map(|t| t.to_rfc3339()),
            "conflictPolicy": ctx.config.sync.conflict_policy,
        }));
        if printer.is_json() {
            return Ok(());
        }

        printer.success(&format!("Server: {}", ctx.config.api.base_url));
        printer.detail(&format!("Vault: {}", ctx.config.vault.root.display()));
        printer.detail(&format!("Authentication: {auth_state}"));
        printer.detail(&format!("Tracked files: {}", state.len()));
        match last_sync {
            Some(t) => printer.detail(&format!("Last full sync: {t}")),
            None => printer.detail("Last full sync: never"),
        }
        printer.detail(&format!(
            "Conflict policy: {}",
            ctx.config.sync.conflict_policy
        ));
        Ok(())
    }
}
