//! Path utilities for the managed log directory.

mod ensure;
mod error;

pub use ensure::{ensure_directory, verify_writable};
pub use error::PathError;

use std::path::PathBuf;

/// Current working directory, mapped into [`PathError`].
pub fn current_dir() -> Result<PathBuf, PathError> {
    std::env::current_dir().map_err(|e| PathError::CurrentDirError(e.to_string()))
}
