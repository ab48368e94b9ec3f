use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use docsync_agent::build_info;
use docsync_agent::config::{AgentConfig, default_config_path};
use docsync_agent::logging::{init_logging, init_stderr_logging};
use docsync_agent::service::{ServiceDefinition, platform_service};
use docsync_agent::{run_agent, shutdown_signal};
use docsync_credentials::CredentialStore;
use tokio_util::sync::CancellationToken;
use tracing::error;

// ============================================================================
// CLI Types
// ============================================================================

/// Docsync - watches a folder and delivers finished documents to the DMS
#[derive(Parser, Debug)]
#[command(name = "docsync", version = build_info::version_string(), about, long_about = None)]
struct Cli {
    /// Path to configuration file (defaults to config.yaml next to the binary)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the agent in the foreground (default)
    Run,

    /// Register the agent as an OS service
    Install,

    /// Stop and unregister the OS service
    Uninstall,

    /// Start the OS service
    Start,

    /// Stop the OS service
    Stop,

    /// Show the OS service status
    Status,

    /// Store the ingest token in the credential store
    SetToken {
        #[arg(value_name = "TOKEN")]
        token: String,
    },
}

// ============================================================================
// Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config.unwrap_or_else(default_config_path);

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run_foreground(&config_path).await,
        Commands::SetToken { token } => {
            init_stderr_logging();
            let store = docsync_credentials::default_store();
            let holder = store.store(&token).context("Failed to store token")?;
            println!("Token stored in {holder}");
            Ok(())
        }
        command => {
            init_stderr_logging();
            manage_service(command, &config_path)
        }
    }
}

async fn run_foreground(config_path: &Path) -> Result<()> {
    let config = match AgentConfig::load(config_path) {
        Ok(config) => config,
        Err(e) => {
            init_stderr_logging();
            return Err(e)
                .with_context(|| format!("Failed to load config {}", config_path.display()));
        }
    };
    let _log_guard = init_logging(&config.log_dir());

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            shutdown_signal().await;
            cancel.cancel();
        });
    }

    let credentials = docsync_credentials::default_store();
    run_agent(&config, credentials.as_ref(), cancel).await
}

fn manage_service(command: Commands, config_path: &Path) -> Result<()> {
    let config_path = std::path::absolute(config_path)
        .with_context(|| format!("Invalid config path {}", config_path.display()))?;
    let executable = std::env::current_exe().context("Cannot locate the docsync binary")?;
    let service = platform_service(ServiceDefinition::new(executable, &config_path))?;

    match command {
        Commands::Install => {
            AgentConfig::materialize(&config_path)
                .with_context(|| format!("Failed to load config {}", config_path.display()))?;
            service.install()?;
            println!("Service installed ({})", service.name());
        }
        Commands::Uninstall => {
            service.uninstall()?;
            println!("Service uninstalled");
        }
        Commands::Start => {
            service.start()?;
            println!("Service started");
        }
        Commands::Stop => {
            service.stop()?;
            println!("Service stopped");
        }
        Commands::Status => {
            println!("Service status: {}", service.status()?);
        }
        Commands::Run | Commands::SetToken { .. } => {}
    }
    Ok(())
}
