//! Configuration commands.

use super::Context;
use crate::output::{self, OutputFormat};
use anyhow::Result;

/// Print the effective configuration (file, then environment, then flags).
pub fn config_show(ctx: &Context) -> Result<()> {
    match ctx.format {
        OutputFormat::Text => {
            let config = &ctx.config;
            output::print_heading("Configuration");
            output::print_row("Config file", &ctx.paths.config_file().display().to_string());
            output::print_row("Client id", &config.client_id);
            output::print_row("Backend", config.backend_url.as_deref().unwrap_or("(auto)"));
            output::print_row("Page", config.page_url.as_deref().unwrap_or("(none)"));
            output::print_row("Provider", &config.provider_script_url);
            output::print_row("Log level", &config.log_level);
            output::print_row(
                "Widget poll",
                &format!(
                    "{} x {}ms",
                    config.widget.max_attempts, config.widget.poll_interval_ms
                ),
            );
        }
        OutputFormat::Json => output::print_json(&ctx.config),
    }
    Ok(())
}

/// Write the effective configuration to the config file.
pub fn config_init(ctx: &Context) -> Result<()> {
    ctx.config.save(&ctx.paths)?;
    output::print_success(
        &format!("Wrote {}", ctx.paths.config_file().display()),
        &ctx.format,
    );
    Ok(())
}
