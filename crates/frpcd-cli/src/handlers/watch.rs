//! `frpcd watch`: a stdio observer of the broadcast hub.
//!
//! Each stdin line is an observer request, for example
//! `{"type":"get_status"}`. Every message the hub delivers is written to
//! stdout as one JSON line. EOF on stdin or Ctrl-C disconnects.

use std::sync::Arc;

use anyhow::Result;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;

use crate::bootstrap::CliContext;
use crate::stdio::StdioObserver;

pub async fn execute(ctx: &CliContext) -> Result<bool> {
    ctx.hub.spawn_log_drain(ctx.supervisor.log_queue());

    let id = ctx.hub.connect(Arc::new(StdioObserver::stdout()));
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                match line? {
                    Some(line) if line.trim().is_empty() => {}
                    Some(line) => ctx.hub.handle_message(id, &line).await,
                    None => break,
                }
            }
            signal = tokio::signal::ctrl_c() => {
                signal?;
                break;
            }
        }
    }

    info!(observer = %id, "Watch ended");
    ctx.hub.disconnect(id).await;
    Ok(true)
}
