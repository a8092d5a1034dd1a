//! `filebridge`: mirror directory trees to and from an SFTP server.

mod config;
mod server;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use filebridge_sftp::SftpConnector;
use filebridge_transfer::{TransferDirection, TransferOrchestrator};
use tracing_subscriber::EnvFilter;

use config::AppConfig;

#[derive(Parser)]
#[command(name = "filebridge", version)]
#[command(about = "Mirror directory trees over SFTP with per-file integrity checks")]
struct Cli {
    /// Configuration file (defaults to $XDG_CONFIG_HOME/filebridge/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Copy a remote tree under the local base path
    Download {
        /// Tree identifier, relative to both base paths
        id: String,
    },
    /// Copy a local tree under the remote base path
    Upload {
        id: String,
    },
    /// Run the HTTP trigger server
    Serve {
        /// Listen address (overrides server.bind)
        #[arg(long)]
        bind: Option<SocketAddr>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,filebridge=debug")),
        )
        .init();

    let cli = Cli::parse();
    let config = AppConfig::load(cli.config.as_deref())?;
    let orchestrator = TransferOrchestrator::new(
        SftpConnector::new(config.sftp.clone()),
        config.transfer.clone(),
    );

    match cli.command {
        Command::Download { id } => run_once(orchestrator, TransferDirection::Download, id).await,
        Command::Upload { id } => run_once(orchestrator, TransferDirection::Upload, id).await,
        Command::Serve { bind } => {
            server::serve(Arc::new(orchestrator), bind.unwrap_or(config.bind)).await?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

async fn run_once(
    orchestrator: TransferOrchestrator<SftpConnector>,
    direction: TransferDirection,
    id: String,
) -> anyhow::Result<ExitCode> {
    let task = tokio::task::spawn_blocking(move || orchestrator.run_transfer(direction, &id));
    let ok = match task.await {
        Ok(ok) => ok,
        Err(e) => {
            tracing::error!(%direction, error = %e, "transfer task did not complete");
            false
        }
    };
    if ok {
        println!("success");
        Ok(ExitCode::SUCCESS)
    } else {
        println!("failure");
        Ok(ExitCode::FAILURE)
    }
}
