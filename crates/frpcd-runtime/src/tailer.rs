//! Background follower for the managed log file.
//!
//! One task per supervisor. It starts at the current end of the file and
//! only moves back to the start after a truncation made through
//! [`LogTailer::rewind_with`].
//!
//! Truncations bump a generation counter twice, once before and once after
//! the file is cut. An odd generation means a truncation is in progress. A
//! read that overlaps a generation change is discarded, so bytes written by
//! the truncation are only ever delivered once, after the rewind.

use std::io::SeekFrom;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use frpcd_core::{LogLine, SupervisorError};
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncBufReadExt, AsyncSeekExt, BufReader};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::classifier::classify;
use crate::error_state::ErrorState;
use crate::logfile::{LogFile, annotation, sanitize_line};
use crate::queue::LogQueue;

struct TailContext {
    log: LogFile,
    poll_interval: Duration,
    queue: Arc<LogQueue>,
    errors: Arc<ErrorState>,
}

impl TailContext {
    /// Sanitize, classify and enqueue one raw line.
    ///
    /// Lifecycle markers written by the supervisor are delivered but never
    /// classified: a failure marker quotes the offending line.
    fn dispatch(&self, raw: &[u8]) {
        let decoded = String::from_utf8_lossy(raw);
        let Some(text) = sanitize_line(&decoded) else {
            return;
        };
        if !annotation::is_annotation(&text) {
            if let Some(kind) = classify(&text) {
                debug!(%kind, line = %text, "Classified failure line");
                self.errors.set(text.clone());
            }
        }
        if let Some(line) = LogLine::new(text) {
            self.queue.push(line);
        }
    }

    /// Record a failed (re)open or read. Logged once per distinct reason.
    fn record_failure(&self, reason: String, last: &mut Option<String>) {
        if last.as_deref() == Some(reason.as_str()) {
            return;
        }
        let err = SupervisorError::LogReadFailure {
            path: self.log.path().to_path_buf(),
            reason,
        };
        error!(error = %err, "Log tail failed, will retry");
        self.errors.set(err.to_string());
        if let SupervisorError::LogReadFailure { reason, .. } = err {
            *last = Some(reason);
        }
    }
}

/// Moves the generation back to even when a truncation ends, on every path.
struct TruncationEnd<'a>(&'a watch::Sender<u64>);

impl Drop for TruncationEnd<'_> {
    fn drop(&mut self) {
        self.0.send_modify(|generation| *generation += 1);
    }
}

/// Owner of the tail task.
pub struct LogTailer {
    context: Arc<TailContext>,
    rewind_tx: watch::Sender<u64>,
    cancel: CancellationToken,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl LogTailer {
    pub fn new(
        log: LogFile,
        poll_interval: Duration,
        queue: Arc<LogQueue>,
        errors: Arc<ErrorState>,
    ) -> Self {
        let (rewind_tx, _) = watch::channel(0);
        Self {
            context: Arc::new(TailContext {
                log,
                poll_interval,
                queue,
                errors,
            }),
            rewind_tx,
            cancel: CancellationToken::new(),
            task: Mutex::new(None),
        }
    }

    /// Spawn the tail task unless one is alive. Must be called within a Tokio runtime.
    pub fn ensure_running(&self) {
        if self.cancel.is_cancelled() {
            return;
        }
        let mut task = self.task.lock().unwrap_or_else(PoisonError::into_inner);
        if task.as_ref().is_some_and(|t| !t.is_finished()) {
            return;
        }
        let context = Arc::clone(&self.context);
        let rewind_rx = self.rewind_tx.subscribe();
        let cancel = self.cancel.clone();
        *task = Some(tokio::spawn(run(context, rewind_rx, cancel)));
        debug!(path = %self.context.log.path().display(), "Log tailer started");
    }

    pub fn is_running(&self) -> bool {
        self.task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|t| !t.is_finished())
    }

    /// Run `truncate`, then continue reading from the start of the file.
    ///
    /// Nothing read while `truncate` runs is delivered.
    pub fn rewind_with<T>(&self, truncate: impl FnOnce() -> T) -> T {
        self.rewind_tx.send_modify(|generation| *generation += 1);
        let _end = TruncationEnd(&self.rewind_tx);
        truncate()
    }

    /// Cancel the task and wait up to `join_timeout` for it to finish.
    pub async fn shutdown(&self, join_timeout: Duration) {
        self.cancel.cancel();
        let task = self
            .task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(task) = task {
            if timeout(join_timeout, task).await.is_err() {
                warn!("Log tailer did not stop within {:?}", join_timeout);
            }
        }
    }
}

const fn truncating(generation: u64) -> bool {
    generation & 1 == 1
}

async fn run(
    context: Arc<TailContext>,
    mut rewind_rx: watch::Receiver<u64>,
    cancel: CancellationToken,
) {
    let mut position = TailPosition {
        offset: None,
        generation: {
            let generation = *rewind_rx.borrow_and_update();
            generation - u64::from(truncating(generation))
        },
    };
    let mut failure: Option<String> = None;

    while !cancel.is_cancelled() {
        match follow(&context, &mut rewind_rx, &cancel, &mut position, &mut failure).await {
            Ok(()) => break,
            Err(e) => {
                context.record_failure(e.to_string(), &mut failure);
                tokio::select! {
                    () = cancel.cancelled() => break,
                    () = sleep(context.poll_interval) => {}
                }
            }
        }
    }

    debug!("Log tailer exiting");
}

/// Read state that survives a reopen, so a transient failure neither replays
/// lines nor misses a truncation made while the file was unavailable.
struct TailPosition {
    offset: Option<u64>,
    /// Last truncation generation acted on. Always even.
    generation: u64,
}

/// Follow the file until cancelled (`Ok`) or an I/O error occurs (`Err`).
async fn follow(
    context: &TailContext,
    rewind_rx: &mut watch::Receiver<u64>,
    cancel: &CancellationToken,
    position: &mut TailPosition,
    failure: &mut Option<String>,
) -> std::io::Result<()> {
    let path = context.log.path();
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await?;

    let file = File::open(path).await?;
    let len = file.metadata().await?.len();
    let mut reader = BufReader::new(file);

    let start = match position.offset {
        Some(pos) if pos <= len => pos,
        Some(_) => 0,
        None => len,
    };
    let mut offset = reader.seek(SeekFrom::Start(start)).await?;
    position.offset = Some(offset);

    if let Some(reason) = failure.take() {
        info!(%reason, "Log tail recovered");
    }

    let mut pending: Vec<u8> = Vec::with_capacity(1024);

    loop {
        if cancel.is_cancelled() {
            return Ok(());
        }

        let generation = *rewind_rx.borrow_and_update();
        if truncating(generation) {
            tokio::select! {
                () = cancel.cancelled() => return Ok(()),
                Ok(()) = rewind_rx.changed() => {}
            }
            continue;
        }
        if generation != position.generation {
            position.generation = generation;
            offset = reader.seek(SeekFrom::Start(0)).await?;
            pending.clear();
            position.offset = Some(offset);
        }

        let read = reader.read_until(b'\n', &mut pending).await?;
        if *rewind_rx.borrow() != position.generation {
            // Overlapped a truncation
            pending.clear();
            continue;
        }

        if read == 0 {
            // A missing file surfaces as an error and a reopen
            tokio::fs::metadata(path).await?;
            tokio::select! {
                () = cancel.cancelled() => return Ok(()),
                () = sleep(context.poll_interval) => {}
                Ok(()) = rewind_rx.changed() => {}
            }
            continue;
        }

        offset += read as u64;
        position.offset = Some(offset);

        // Partial line: keep buffering until its newline arrives.
        if pending.last() != Some(&b'\n') {
            continue;
        }

        context.dispatch(&pending);
        pending.clear();
    }
}
