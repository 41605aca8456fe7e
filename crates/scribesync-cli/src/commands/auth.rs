//! Auth commands - login, logout, and status
//!
//! `login` exchanges an email/password for a credential pair and hands it
//! to the token manager, which persists it in the keyring (or the file
//! fallback). `logout` clears stored credentials. `status` reports the
//! manager's state and the credential expiry.

use anyhow::{Context, Result};
use clap::Subcommand;
use scribesync_core::ports::auth::AuthGate;

use crate::context::AppContext;
use crate::output::{OutputFormat, Printer};

#[derive(Debug, Subcommand)]
pub enum AuthCommand {
    /// Sign in to the note server
    Login {
        /// Account email (prompted when omitted)
        #[arg(long)]
        email: Option<String>,
    },
    /// Remove stored credentials
    Logout,
    /// Check authentication status
    Status,
}

impl AuthCommand {
    pub async fn execute(&self, config: Option<&str>, format: OutputFormat) -> Result<()> {
        let printer = Printer::new(format);
        let ctx = AppContext::build(config).await?;

        match self {
            AuthCommand::Login { email } => {
                self.execute_login(&ctx, email.as_deref(), &printer).await
            }
            AuthCommand::Logout => {
                ctx.tokens.logout().await?;
                printer.success("Signed out; credentials removed");
                Ok(())
            }
            AuthCommand::Status => self.execute_status(&ctx, &printer),
        }
    }

    async fn execute_login(
        &self,
        ctx: &AppContext,
        email: Option<&str>,
        printer: &Printer,
    ) -> Result<()> {
        let email = match email {
            Some(e) => e.to_string(),
            None => prompt("Email")?,
        };
        let password = match std::env::var("SCRIBESYNC_PASSWORD") {
            Ok(p) if !p.is_empty() => p,
            _ => prompt("Password (input is echoed)")?,
        };

        let credential = scribesync_api::provider::login(&ctx.client, &email, &password)
            .await
            .context("Login failed")?;
        ctx.tokens.install(credential).await?;

        printer.success(&format!("Signed in as {email}"));
        if ctx.insecure_store {
            printer.warn("Credentials are stored in a plaintext file; no OS keyring was found");
        }
        Ok(())
    }

    fn execute_status(&self, ctx: &AppContext, printer: &Printer) -> Result<()> {
        let state = ctx.tokens.auth_state();
        let expiry = ctx.tokens.credential_expiry();

        printer.json(&serde_json::json!({
            "authState": state.name(),
            "expiresAt": expiry.map(|t| t.to_rfc3339()),
            "insecureStore": ctx.insecure_store,
        }));
        if printer.is_json() {
            return Ok(());
        }

        printer.success(&format!("Authentication state: {state}"));
        match expiry {
            Some(t) => printer.detail(&format!("Access token expires at {t}")),
            None => printer.detail("No credential stored; run 'scribesync auth login'"),
        }
        if ctx.insecure_store {
            printer.warn("Credentials are stored in a plaintext file");
        }
        Ok(())
    }
}

/// Reads one line from stdin after printing a label
fn prompt(label: &str) -> Result<String> {
    use std::io::Write;

    print!("{label}: ");
    std::io::stdout().flush()?;
    let mut line = String::new();
    std::io::stdin()
        .read_line(&mut line)
        .context("Failed to read input")?;
    Ok(line.trim().to_string())
}
