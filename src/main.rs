//! gitspace - workspace and git root detection
//!
//! CLI entry point that dispatches to subcommands.

use clap::Parser;
use console::style;
use gitspace::cli::{commands, Cli, Commands, LogFormat};
use gitspace::config::ConfigManager;
use gitspace::error::GitspaceResult;
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            if let Some(hint) = e.hint() {
                eprintln!("{} {}", style("Hint:").yellow(), hint);
            }
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: u8, format: LogFormat) {
    // RUST_LOG wins; otherwise 0 = warn, 1 = info, 2+ = debug
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| match verbose {
        0 => EnvFilter::new("gitspace=warn"),
        1 => EnvFilter::new("gitspace=info"),
        _ => EnvFilter::new("gitspace=debug"),
    });

    // stdout carries command output and the serve protocol
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    match format {
        LogFormat::Text => builder.without_time().init(),
        LogFormat::Json => builder.json().init(),
    }
}

async fn run() -> GitspaceResult<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.log_format);

    // Completions don't need config loading
    if let Commands::Completions(args) = cli.command {
        commands::completions(args);
        return Ok(());
    }

    let config_manager = match cli.config {
        Some(ref path) => ConfigManager::with_path(path.clone()),
        None => ConfigManager::new(),
    };
    debug!(path = %config_manager.path().display(), "Loading configuration");
    let config = config_manager.load().await?;

    match cli.command {
        Commands::Detect(args) => commands::detect(args, &config).await,
        Commands::Info(args) => commands::info(args, &config).await,
        Commands::Repo(args) => commands::repo(args, &config).await,
        Commands::Status => commands::status(&config).await,
        Commands::Changes(args) => commands::changes(args, &config).await,
        Commands::Diff(args) => commands::diff(args, &config).await,
        Commands::CleanupLock(args) => commands::cleanup_lock(args, &config).await,
        Commands::Config(args) => commands::config(args, &config_manager, &config).await,
        Commands::Serve => commands::serve(&config).await,
        Commands::Completions(_) => unreachable!("completions handled above"),
    }
}
