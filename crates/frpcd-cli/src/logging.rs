//! Tracing initialisation for the binary.

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Initialise tracing with a console layer and an optional daily-rolling file.
///
/// Console output goes to stderr so stdout stays clean for `watch`. The
/// file is written next to `app_log_file`, rotated daily, without ANSI
/// colours. Level comes from `RUST_LOG` (default `info`, or `debug` with
/// `verbose`).
///
/// The returned guard must be held for the life of the program.
pub fn init_tracing(app_log_file: Option<&Path>, verbose: bool) -> Option<WorkerGuard> {
    let default_level = if verbose { "debug" } else { "info" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let (file_layer, guard) = match app_log_file.and_then(file_target) {
        Some((dir, prefix)) => {
            let appender = tracing_appender::rolling::daily(dir, prefix);
            let (non_blocking, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .compact();
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .compact(),
        )
        .with(file_layer)
        .try_init()
        .ok();

    guard
}

/// Directory and file-name prefix for the rolling appender.
fn file_target(app_log_file: &Path) -> Option<(&Path, &std::ffi::OsStr)> {
    let dir = app_log_file.parent().filter(|d| !d.as_os_str().is_empty())?;
    let prefix = app_log_file.file_name()?;
    if let Err(e) = std::fs::create_dir_all(dir) {
        eprintln!(
            "Failed to create log directory {}: {e}; file logging disabled",
            dir.display()
        );
        return None;
    }
    Some((dir, prefix))
}
