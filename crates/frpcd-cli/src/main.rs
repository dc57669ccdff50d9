//! CLI entry point - the composition root.

use std::process::ExitCode;

use clap::Parser;
use frpcd_cli::{Cli, CliConfig, bootstrap, handlers, init_tracing};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config = CliConfig::from_env(&cli)?;

    // Held for the life of main so buffered file logs are flushed
    let _log_guard = init_tracing(config.app_log_file.as_deref(), cli.verbose);

    let ctx = bootstrap(config)?;
    let command = cli.command.unwrap_or_default();
    info!(?command, "frpcd starting");

    let result = handlers::dispatch(&ctx, command).await;
    ctx.shutdown().await;

    Ok(if result? {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
