//! Sticky error message shared between the tailer and status queries.

use std::sync::{Mutex, PoisonError};

/// Holds the last classified failure until explicitly cleared.
#[derive(Debug, Default)]
pub struct ErrorState {
    message: Mutex<Option<String>>,
}

impl ErrorState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, message: impl Into<String>) {
        *self.message.lock().unwrap_or_else(PoisonError::into_inner) = Some(message.into());
    }

    pub fn clear(&self) {
        *self.message.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }

    pub fn get(&self) -> Option<String> {
        self.message
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn is_set(&self) -> bool {
        self.message
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }
}
