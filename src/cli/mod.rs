//! Command parsing and dispatch. `main.rs` calls `cli::run()`.

pub mod call;
pub mod validate;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand};

use ecm_gateway::config::Config;

#[derive(Parser)]
#[command(name = "ecm-gateway")]
#[command(version)]
#[command(about = "Expose an ECM REST API as callable operations", long_about = None)]
struct Cli {
    /// Config file (JSON, YAML or TOML). Defaults to ~/.ecm-gateway/config.json
    #[arg(short, long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the operation catalog with parameter schemas
    Operations {
        /// Print the full catalog as JSON
        #[arg(long)]
        json: bool,
    },
    /// Run one operation and print its result
    Call {
        /// Operation name, e.g. get_document
        operation: String,
        /// Arguments as a JSON object
        #[arg(short, long, default_value = "{}")]
        args: String,
    },
    /// Read one ecm:// resource and print it
    Read {
        /// Resource URI, e.g. ecm://documents/DOC-1
        uri: String,
    },
    /// Serve newline-delimited JSON requests on stdin/stdout
    Stdio,
    /// Check the configuration and print diagnostics
    Validate,
}

/// Resolve the config path from the flag or the default location.
pub(crate) fn config_path(flag: Option<&Path>) -> PathBuf {
    flag.map(Path::to_path_buf).unwrap_or_else(Config::path)
}

/// Load configuration with environment overrides applied.
pub(crate) fn load_config(path: &Path) -> Result<Config> {
    Config::load_from_path(path)
        .with_context(|| format!("Failed to load configuration from {}", path.display()))
}

pub async fn run() -> Result<()> {
    let cli = Cli::parse();
    let path = config_path(cli.config.as_deref());

    // Validate must report a broken config rather than fail to start on it.
    if let Some(Commands::Validate) = cli.command {
        return validate::cmd_validate(&path);
    }

    let config = load_config(&path)?;
    ecm_gateway::utils::logging::init_logging(&config.logging)
        .context("Failed to initialize logging")?;

    match cli.command {
        None => {
            let mut cmd = Cli::command();
            cmd.print_help()?;
            println!();
        }
        Some(Commands::Operations { json }) => call::cmd_operations(&config, json)?,
        Some(Commands::Call { operation, args }) => {
            call::cmd_call(&config, &operation, &args).await?
        }
        Some(Commands::Read { uri }) => call::cmd_read(&config, &uri).await?,
        Some(Commands::Stdio) => call::cmd_stdio(&config).await?,
        Some(Commands::Validate) => validate::cmd_validate(&path)?,
    }
    Ok(())
}
