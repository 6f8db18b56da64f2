//! sessionkit CLI - sign in, sync and sign out from the terminal.

mod commands;
mod host;
mod output;

use clap::{Parser, Subcommand};
use commands::{Context, SyncSource};
use sessionkit_config::{Config, Paths};
use std::path::PathBuf;
use tracing::debug;

/// sessionkit CLI - Manage the persisted sign-in session.
#[derive(Parser)]
#[command(name = "sessionkit")]
#[command(about = "sessionkit CLI for sign-in and data sync")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format (text or json)
    #[arg(short, long, default_value = "text", global = true)]
    format: output::OutputFormat,

    /// Log level (trace, debug, info, warn, error); defaults to the configured level
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// State directory (defaults to ~/.sessionkit)
    #[arg(long, global = true, env = "SESSIONKIT_HOME")]
    base_dir: Option<PathBuf>,

    /// Backend base URL, overriding config and environment
    #[arg(long, global = true)]
    backend_url: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Exchange a provider credential and persist it
    Login {
        /// Provider credential; prompted for when omitted
        #[arg(long)]
        credential: Option<String>,
    },

    /// Restore the session from the persisted credential
    Check,

    /// Show configuration and session state
    Status,

    /// Push application data for the signed-in user
    Sync {
        /// Read the JSON payload from a file
        #[arg(long, conflicts_with = "json", required_unless_present = "json")]
        file: Option<PathBuf>,

        /// Inline JSON payload
        #[arg(long)]
        json: Option<String>,
    },

    /// Erase the persisted credential
    Logout,

    /// Inspect or write the configuration file
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Print the effective configuration
    Show,
    /// Write the effective configuration to the config file
    Init,
}

fn resolve_context(cli: &Cli) -> anyhow::Result<Context> {
    let paths = match &cli.base_dir {
        Some(base_dir) => Paths::with_base_dir(base_dir.clone()),
        None => Paths::new()?,
    };

    let mut config = Config::load(&paths)?;
    if let Some(backend_url) = &cli.backend_url {
        config.backend_url = Some(backend_url.clone());
    }
    if let Some(level) = &cli.log_level {
        config.log_level = level.clone();
    }

    Ok(Context {
        paths,
        config,
        format: cli.format,
    })
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let ctx = match resolve_context(&cli) {
        Ok(ctx) => ctx,
        Err(e) => {
            output::print_error(&format!("{:#}", e), &cli.format);
            std::process::exit(1);
        }
    };

    sessionkit_config::init_logging("cli", &ctx.config.log_level, &ctx.paths);
    debug!(base_dir = %ctx.paths.base_dir().display(), "CLI starting");

    let result = match cli.command {
        Commands::Login { credential } => commands::login(&ctx, credential).await,
        Commands::Check => commands::check(&ctx).await,
        Commands::Status => commands::status(&ctx).await,
        Commands::Sync { file, json } => {
            match (file.as_deref(), json.as_deref()) {
                (Some(path), _) => commands::sync(&ctx, SyncSource::File(path)).await,
                (None, Some(text)) => commands::sync(&ctx, SyncSource::Inline(text)).await,
                (None, None) => Err(anyhow::anyhow!("either --file or --json is required")),
            }
        }
        Commands::Logout => commands::logout(&ctx).await,
        Commands::Config { command } => match command {
            ConfigCommands::Show => commands::config_show(&ctx),
            ConfigCommands::Init => commands::config_init(&ctx),
        },
    };

    if let Err(e) = result {
        if e.downcast_ref::<output::Reported>().is_none() {
            output::print_error(&format!("{:#}", e), &ctx.format);
        }
        std::process::exit(1);
    }
}
