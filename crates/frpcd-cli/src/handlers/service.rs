//! One-shot service commands.

use anyhow::Result;
use frpcd_core::{OperationOutcome, StatusSnapshot};

use crate::bootstrap::CliContext;

/// Print an operation outcome. Failures go to stderr.
pub fn report(outcome: &OperationOutcome) -> bool {
    if outcome.success {
        println!("{}", outcome.message);
    } else {
        eprintln!("Error: {}", outcome.message);
    }
    outcome.success
}

/// Human-readable status block.
pub fn format_status(snapshot: &StatusSnapshot) -> String {
    let pid = snapshot
        .pid
        .map_or_else(|| "-".to_string(), |pid| pid.to_string());
    let mut out = format!("status: {}\npid:    {pid}", snapshot.state);
    if !snapshot.error_message.is_empty() {
        out.push_str("\nerror:  ");
        out.push_str(&snapshot.error_message);
    }
    out
}

pub fn status(ctx: &CliContext, json: bool) -> Result<bool> {
    let snapshot = ctx.supervisor.get_status();
    if json {
        println!("{}", serde_json::to_string(&snapshot)?);
    } else {
        println!("{}", format_status(&snapshot));
    }
    Ok(true)
}

pub fn logs(ctx: &CliContext, lines: Option<usize>) -> bool {
    let lines = lines.unwrap_or(ctx.supervisor.config().log_snapshot_lines);
    for line in ctx.supervisor.get_logs(lines) {
        println!("{line}");
    }
    true
}

pub fn clear_logs(ctx: &CliContext) -> bool {
    let cleared = ctx.supervisor.clear_logs();
    if cleared {
        println!("log cleared");
    } else {
        eprintln!("Error: failed to clear log");
    }
    cleared
}
