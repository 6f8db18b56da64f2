//! Authentication commands.

use super::Context;
use crate::output::{self, OutputFormat, Reported};
use anyhow::Result;
use sessionkit_auth::{AuthError, LoginMode, SessionManager};

/// Exchange a credential interactively and persist it on success.
pub async fn login(ctx: &Context, credential: Option<String>) -> Result<()> {
    let manager = ctx.session_manager()?;
    manager.ensure_provider_script();

    let credential = match credential {
        Some(credential) => credential,
        None => rpassword::prompt_password("Credential: ")?,
    };

    if credential.trim().is_empty() {
        output::print_error("Credential is required", &ctx.format);
        return Err(Reported.into());
    }

    match manager
        .exchange_credential(&credential, LoginMode::Interactive)
        .await
    {
        Ok(_) => Ok(()),
        // Rejections and unreachable backends were already printed as notices.
        Err(AuthError::ExchangeRejected { .. }) => Err(Reported.into()),
        Err(e) if e.is_transport() => Err(Reported.into()),
        Err(e) => Err(e.into()),
    }
}

/// Restore the session from the persisted credential.
pub async fn check(ctx: &Context) -> Result<()> {
    let manager = ctx.session_manager()?;
    manager.initialize().await;

    if manager.is_logged_in() {
        output::print_success("Session restored", &ctx.format);
        Ok(())
    } else {
        output::print_error("Not logged in", &ctx.format);
        Err(Reported.into())
    }
}

/// Show configuration and session state.
pub async fn status(ctx: &Context) -> Result<()> {
    let manager = ctx.session_manager()?;
    let has_credential = manager.has_persisted_credential()?;
    if has_credential {
        manager.initialize().await;
    }

    print_status(ctx, &manager, has_credential)
}

fn print_status(ctx: &Context, manager: &SessionManager, has_credential: bool) -> Result<()> {
    let backend_url = ctx.config.backend_base_url()?;
    let profile = manager.profile();

    match ctx.format {
        OutputFormat::Text => {
            output::print_heading("sessionkit");
            output::print_row("Client id", manager.client_id());
            output::print_row(
                "Configured",
                output::yes_no(ctx.config.is_client_id_configured()),
            );
            output::print_row("Backend", backend_url.as_str());
            output::print_row("Credential", output::yes_no(has_credential));
            output::print_row(
                "Auth",
                if manager.is_logged_in() {
                    "logged in"
                } else {
                    "not logged in"
                },
            );
            if let Some(profile) = &profile {
                output::print_row("User ID", profile.user_id().unwrap_or("unknown"));
                output::print_row("Email", profile.email.as_deref().unwrap_or("unknown"));
            }
        }
        OutputFormat::Json => {
            output::print_json(&serde_json::json!({
                "client_id": manager.client_id(),
                "client_id_configured": ctx.config.is_client_id_configured(),
                "backend_url": backend_url.as_str(),
                "has_credential": has_credential,
                "logged_in": manager.is_logged_in(),
                "state": manager.auth_state(),
                "profile": profile,
            }));
        }
    }

    Ok(())
}

/// Erase the persisted credential.
pub async fn logout(ctx: &Context) -> Result<()> {
    let manager = ctx.session_manager()?;
    manager.logout().await;
    output::print_success("Logged out", &ctx.format);
    Ok(())
}
