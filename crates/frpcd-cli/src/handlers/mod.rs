//! Command handlers. Each returns whether the command succeeded.

pub mod run;
pub mod service;
pub mod watch;

use anyhow::Result;

use crate::bootstrap::CliContext;
use crate::commands::Commands;

/// Route a command to its handler.
pub async fn dispatch(ctx: &CliContext, command: Commands) -> Result<bool> {
    match command {
        Commands::Run {
            no_auto_start,
            no_network_check,
        } => {
            run::execute(
                ctx,
                run::RunOptions {
                    auto_start: !no_auto_start,
                    network_check: !no_network_check,
                },
            )
            .await
        }
        Commands::Start => Ok(service::report(&ctx.supervisor.start().await)),
        Commands::Stop => Ok(service::report(&ctx.supervisor.stop().await)),
        Commands::Restart => Ok(service::report(&ctx.supervisor.restart().await)),
        Commands::Status { json } => service::status(ctx, json),
        Commands::Logs { lines } => Ok(service::logs(ctx, lines)),
        Commands::ClearLogs => Ok(service::clear_logs(ctx)),
        Commands::Watch => watch::execute(ctx).await,
    }
}
