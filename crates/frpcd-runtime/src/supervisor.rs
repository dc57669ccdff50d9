//! Lifecycle supervision of the single managed `frpc` process.
//!
//! The supervisor never keeps a child handle as the source of truth. Every
//! status query rescans the process table, so a process started by a
//! previous supervisor instance, or killed out-of-band, is always reported
//! correctly.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use frpcd_core::{
    OperationOutcome, ServicePort, ServiceState, StatusSnapshot, SupervisorConfig,
    SupervisorError, ensure_directory,
};
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::error_state::ErrorState;
use crate::logfile::{LogFile, annotation};
use crate::process::{
    ProcessMatcher, ensure_executable, find_matching, find_running, spawn_detached, terminate_pid,
};
use crate::queue::LogQueue;
use crate::tailer::LogTailer;

const TAILER_JOIN_TIMEOUT: Duration = Duration::from_secs(1);

/// Scope guard that clears the starting flag on drop.
///
/// The flag is cleared on every exit path of a start attempt.
struct StartingGuard<'a> {
    starting: &'a AtomicBool,
}

impl<'a> StartingGuard<'a> {
    fn new(starting: &'a AtomicBool) -> Self {
        starting.store(true, Ordering::SeqCst);
        Self { starting }
    }
}

impl Drop for StartingGuard<'_> {
    fn drop(&mut self) {
        self.starting.store(false, Ordering::SeqCst);
    }
}

/// Supervisor of the managed process.
pub struct ProcessSupervisor {
    config: SupervisorConfig,
    name: String,
    matcher: ProcessMatcher,
    log: LogFile,
    errors: Arc<ErrorState>,
    queue: Arc<LogQueue>,
    tailer: LogTailer,
    /// Serializes start/stop/restart.
    lifecycle: tokio::sync::Mutex<()>,
    starting: AtomicBool,
    /// PID found at construction; diagnostics only.
    attached_pid: Mutex<Option<u32>>,
}

impl ProcessSupervisor {
    /// Create the supervisor, start its tailer and attach to a running process if present.
    ///
    /// Must be called within a Tokio runtime. Fails only when the log
    /// directory cannot be prepared.
    pub fn new(config: SupervisorConfig) -> Result<Self, SupervisorError> {
        ensure_directory(&config.log_dir).map_err(|e| SupervisorError::LogDirectory {
            path: config.log_dir.clone(),
            reason: e.to_string(),
        })?;

        let log = LogFile::new(config.log_path());
        log.ensure_exists()?;

        let errors = Arc::new(ErrorState::new());
        let queue = Arc::new(LogQueue::new());
        let tailer = LogTailer::new(
            log.clone(),
            config.tail_poll_interval,
            Arc::clone(&queue),
            Arc::clone(&errors),
        );

        let supervisor = Self {
            name: config.executable_name(),
            matcher: ProcessMatcher::new(&config.executable_path, &config.config_path),
            config,
            log,
            errors,
            queue,
            tailer,
            lifecycle: tokio::sync::Mutex::new(()),
            starting: AtomicBool::new(false),
            attached_pid: Mutex::new(None),
        };

        supervisor.tailer.ensure_running();
        supervisor.recover_on_construction();
        Ok(supervisor)
    }

    /// Attach to an already-running match. Never spawns.
    fn recover_on_construction(&self) {
        let Some(pid) = find_running(&self.matcher) else {
            debug!("No running {} to attach to", self.name);
            return;
        };
        info!(pid = %pid, "Attached to running {}", self.name);
        *self
            .attached_pid
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(pid);
        self.annotate(&annotation::attached(&self.name, pid));
    }

    pub const fn config(&self) -> &SupervisorConfig {
        &self.config
    }

    pub const fn log_file(&self) -> &LogFile {
        &self.log
    }

    /// Queue of tailed lines consumed by the hub's drain loop.
    pub fn log_queue(&self) -> Arc<LogQueue> {
        Arc::clone(&self.queue)
    }

    /// PID recorded by attach-recovery, if it has not been stopped since.
    pub fn attached_pid(&self) -> Option<u32> {
        *self
            .attached_pid
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_running(&self) -> bool {
        find_running(&self.matcher).is_some()
    }

    /// Status computed from a fresh process-table scan.
    pub fn get_status(&self) -> StatusSnapshot {
        let error_message = self.errors.get();
        if let Some(pid) = find_running(&self.matcher) {
            return StatusSnapshot::running(pid, error_message.unwrap_or_default());
        }
        if self.starting.load(Ordering::SeqCst) {
            return StatusSnapshot {
                state: ServiceState::Starting,
                pid: None,
                error_message: error_message.unwrap_or_default(),
            };
        }
        match error_message {
            Some(message) => StatusSnapshot {
                state: ServiceState::Error,
                pid: None,
                error_message: message,
            },
            None => StatusSnapshot::stopped(),
        }
    }

    pub async fn start(&self) -> OperationOutcome {
        let _lock = self.lifecycle.lock().await;
        self.start_locked(&annotation::started_banner(&self.name))
            .await
            .into()
    }

    pub async fn stop(&self) -> OperationOutcome {
        let _lock = self.lifecycle.lock().await;
        self.stop_locked().await.into()
    }

    pub async fn restart(&self) -> OperationOutcome {
        let _lock = self.lifecycle.lock().await;
        match self.stop_locked().await {
            Ok(_) | Err(SupervisorError::NotRunning) => {}
            Err(e) => return OperationOutcome::fail(e.to_string()),
        }
        self.start_locked(&annotation::restarted_banner(&self.name))
            .await
            .into()
    }

    /// Start at boot when the executable and config exist and nothing is running.
    ///
    /// Returns `None` when the start was skipped.
    pub async fn auto_start(&self) -> Option<OperationOutcome> {
        if !self.config.executable_path.exists() {
            info!(path = %self.config.executable_path.display(), "Auto-start skipped: executable missing");
            return None;
        }
        if !self.config.config_path.exists() {
            info!(path = %self.config.config_path.display(), "Auto-start skipped: config missing");
            return None;
        }
        if let Some(pid) = find_running(&self.matcher) {
            info!(pid = %pid, "Auto-start skipped: already running");
            return None;
        }
        let outcome = self.start().await;
        if outcome.success {
            info!("Auto-start: {}", outcome.message);
        } else {
            warn!("Auto-start failed: {}", outcome.message);
        }
        Some(outcome)
    }

    /// Last `lines` sanitized lines of the managed log.
    pub fn get_logs(&self, lines: usize) -> Vec<String> {
        self.log.tail(lines)
    }

    /// Truncate the log, rewind the tailer and drop queued lines.
    pub fn clear_logs(&self) -> bool {
        let cleared = self.tailer.rewind_with(|| {
            let cleared = self.log.clear();
            self.queue.clear();
            cleared
        });
        match cleared {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "Failed to clear log");
                false
            }
        }
    }

    /// Stop the tailer. The managed process keeps running.
    pub async fn shutdown(&self) {
        self.tailer.shutdown(TAILER_JOIN_TIMEOUT).await;
    }

    async fn start_locked(&self, banner: &str) -> Result<String, SupervisorError> {
        if let Some(pid) = find_running(&self.matcher) {
            return Err(SupervisorError::AlreadyRunning { pid });
        }

        self.errors.clear();
        let _starting = StartingGuard::new(&self.starting);

        let result = self.launch(banner).await;
        match &result {
            Ok(message) => info!("{message}"),
            // The sticky message for these is already the offending text
            Err(e @ (SupervisorError::StartTimeout(_) | SupervisorError::StartRejected(_))) => {
                warn!(error = %e, "Start failed");
            }
            Err(e) => {
                warn!(error = %e, "Start failed");
                self.errors.set(e.to_string());
                self.annotate(&annotation::failure(&e.to_string()));
            }
        }
        result
    }

    async fn launch(&self, banner: &str) -> Result<String, SupervisorError> {
        let executable = &self.config.executable_path;
        ensure_executable(executable)?;

        self.tailer
            .rewind_with(|| self.log.truncate_with_banner(banner))?;
        self.tailer.ensure_running();

        let spawned = spawn_detached(executable, &self.config.config_path, &self.log)?;
        sleep(self.config.start_grace_period).await;

        let Some(pid) = find_running(&self.matcher) else {
            let message = format!("{} exited immediately after start, check the log", self.name);
            self.errors.set(message.clone());
            self.annotate(&annotation::failure(&message));
            return Err(SupervisorError::StartTimeout(message));
        };
        if pid != spawned {
            debug!(spawned = %spawned, found = %pid, "Scan found a different PID than spawned");
        }

        if let Some(line) = self.errors.get() {
            self.annotate(&annotation::failure(&line));
            return Err(SupervisorError::StartRejected(line));
        }

        self.annotate(&annotation::start_success(&self.name, pid));
        Ok(format!("{} started, PID: {pid}", self.name))
    }

    async fn stop_locked(&self) -> Result<String, SupervisorError> {
        let pids = find_matching(&self.matcher);
        if pids.is_empty() {
            return Err(SupervisorError::NotRunning);
        }

        let mut first_error = None;
        for pid in pids {
            info!(pid = %pid, "Stopping {}", self.name);
            if let Err(e) = terminate_pid(pid, self.config.terminate_timeout).await {
                warn!(error = %e, "Terminate failed");
                first_error.get_or_insert(e);
            }
        }
        if let Some(e) = first_error {
            self.annotate(&annotation::failure(&e.to_string()));
            return Err(e);
        }

        *self
            .attached_pid
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = None;
        self.annotate(&annotation::stopped(&self.name));
        Ok(format!("{} stopped", self.name))
    }

    fn annotate(&self, line: &str) {
        if let Err(e) = self.log.append_line(line) {
            warn!(error = %e, "Failed to annotate log");
        }
    }
}

impl ServicePort for ProcessSupervisor {
    fn status(&self) -> StatusSnapshot {
        self.get_status()
    }

    fn recent_logs(&self, lines: usize) -> Vec<String> {
        self.get_logs(lines)
    }

    fn clear_logs(&self) -> bool {
        Self::clear_logs(self)
    }
}
