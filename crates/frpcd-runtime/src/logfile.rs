//! Managed log file access: truncation, annotation and snapshots.
//!
//! The external process holds the file open in append mode, so truncating
//! it from here is safe: its next write lands at the new end.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use chrono::Local;
use frpcd_core::SupervisorError;
use regex::Regex;

static ANSI_ESCAPE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"\x1B\[[0-9;]*[A-Za-z]").ok());

/// Strip ANSI escape sequences and surrounding whitespace.
///
/// Returns `None` for lines that are empty after sanitizing.
pub fn sanitize_line(raw: &str) -> Option<String> {
    let stripped = match ANSI_ESCAPE.as_ref() {
        Some(re) => re.replace_all(raw, ""),
        None => raw.into(),
    };
    let trimmed = stripped.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Lifecycle marker lines written into the managed log.
pub mod annotation {
    use std::sync::LazyLock;

    use regex::Regex;

    use super::Local;

    static MARKER: LazyLock<Option<Regex>> = LazyLock::new(|| {
        Regex::new(
            r"^(?:=== .* ===|\d{4}-\d{2}-\d{2} \d{2}:\d{2}:\d{2}\.\d{3} \[(?:success|error)\] )",
        )
        .ok()
    });

    fn seconds() -> String {
        Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
    }

    fn millis() -> String {
        Local::now().format("%Y-%m-%d %H:%M:%S%.3f").to_string()
    }

    pub fn started_banner(name: &str) -> String {
        format!("=== {name} started at {} ===", seconds())
    }

    pub fn restarted_banner(name: &str) -> String {
        format!("=== {name} restarted at {} ===", seconds())
    }

    pub fn start_success(name: &str, pid: u32) -> String {
        format!("{} [success] {name} started, PID: {pid}", millis())
    }

    pub fn stopped(name: &str) -> String {
        format!("{} [success] {name} stopped", millis())
    }

    pub fn failure(message: &str) -> String {
        format!("{} [error] {message}", millis())
    }

    pub fn attached(name: &str, pid: u32) -> String {
        format!("=== attached to running {name} at {}, PID: {pid} ===", seconds())
    }

    /// Whether a sanitized line is one of the markers above.
    pub fn is_annotation(line: &str) -> bool {
        MARKER.as_ref().is_some_and(|re| re.is_match(line))
    }
}

/// Handle on the managed log file path.
#[derive(Debug, Clone)]
pub struct LogFile {
    path: PathBuf,
}

impl LogFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_error(&self, e: &std::io::Error) -> SupervisorError {
        SupervisorError::LogWrite {
            path: self.path.clone(),
            reason: e.to_string(),
        }
    }

    /// Create the file if it does not exist yet.
    pub fn ensure_exists(&self) -> Result<(), SupervisorError> {
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map(drop)
            .map_err(|e| self.write_error(&e))
    }

    /// Open for append, as handed to the child for stdout/stderr.
    pub fn open_append(&self) -> Result<File, SupervisorError> {
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| self.write_error(&e))
    }

    /// Truncate to zero length.
    pub fn clear(&self) -> Result<(), SupervisorError> {
        OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&self.path)
            .map(drop)
            .map_err(|e| self.write_error(&e))
    }

    /// Truncate and write `banner` as the first line.
    pub fn truncate_with_banner(&self, banner: &str) -> Result<(), SupervisorError> {
        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&self.path)
            .map_err(|e| self.write_error(&e))?;
        writeln!(file, "{banner}").map_err(|e| self.write_error(&e))
    }

    /// Append one line.
    pub fn append_line(&self, line: &str) -> Result<(), SupervisorError> {
        let mut file = self.open_append()?;
        writeln!(file, "{line}").map_err(|e| self.write_error(&e))
    }

    /// Last `n` non-empty sanitized lines in file order.
    ///
    /// A missing or unreadable file yields an empty list.
    pub fn tail(&self, n: usize) -> Vec<String> {
        let Ok(bytes) = fs::read(&self.path) else {
            return Vec::new();
        };
        let text = String::from_utf8_lossy(&bytes);
        let lines: Vec<String> = text.lines().filter_map(sanitize_line).collect();
        let skip = lines.len().saturating_sub(n);
        lines.into_iter().skip(skip).collect()
    }
}
