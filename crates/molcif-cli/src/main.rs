mod cli;
mod commands;
mod config;
mod error;
mod logging;
mod utils;

use crate::cli::{Cli, Commands};
use crate::commands::Context;
use crate::config::PartialConfig;
use crate::error::{CliError, Result};
use clap::Parser;
use molcif::engine::computation::CancellationToken;
use tracing::{debug, error, info, warn};

#[tokio::main]
async fn main() {
    if let Err(e) = run_app().await {
        if e.is_cancelled() {
            eprintln!("\nInterrupted.");
            std::process::exit(130);
        }
        eprintln!("\n❌ Error: {}", e);
        std::process::exit(1);
    }
}

/// Cancels `token` on the first Ctrl-C. Parsing stops at its next chunk
/// boundary.
fn watch_for_interrupt(token: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, cancelling.");
            token.cancel();
        }
    });
}

async fn run_app() -> Result<()> {
    let cli = Cli::parse();
    logging::setup_logging(cli.verbose, cli.quiet, cli.log_file.clone())?;

    info!("molcif CLI v{} starting up.", env!("CARGO_PKG_VERSION"));
    debug!("Full CLI arguments parsed: {:?}", &cli);

    if let Some(num_threads) = cli.threads {
        info!(
            "Setting Rayon global thread pool to {} threads.",
            num_threads
        );
        rayon::ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .build_global()
            .map_err(|e| {
                CliError::Other(anyhow::anyhow!("Failed to build global thread pool: {}", e))
            })?;
    }

    let settings = PartialConfig::load(cli.config.as_deref())?.merge_with_cli(&cli)?;
    debug!(?settings, "Resolved settings");

    let token = CancellationToken::new();
    watch_for_interrupt(token.clone());
    let ctx = Context {
        settings,
        token,
        quiet: cli.quiet,
    };

    let command_result = match cli.command {
        Commands::Info(args) => {
            info!("Dispatching to 'info' command.");
            commands::info::run(args, &ctx).await
        }
        Commands::Convert(args) => {
            info!("Dispatching to 'convert' command.");
            commands::convert::run(args, &ctx).await
        }
        Commands::Export(args) => {
            info!("Dispatching to 'export' command.");
            commands::export::run(args, &ctx).await
        }
        Commands::Query(args) => {
            info!("Dispatching to 'query' command.");
            commands::query::run(args, &ctx).await
        }
    };

    match &command_result {
        Ok(_) => info!("Command completed successfully."),
        Err(e) if e.is_cancelled() => warn!("Command was cancelled."),
        Err(e) => error!("Command failed: {}", e),
    }

    command_result
}
