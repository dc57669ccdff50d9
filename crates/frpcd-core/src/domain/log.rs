//! Log line value type.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A single sanitized line read from the managed log file.
///
/// Lines are produced in file order by the tailer. The text has already
/// had ANSI escape sequences and surrounding whitespace removed and is never
/// empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogLine {
    text: String,
}

impl LogLine {
    /// Wrap already-sanitized text. Returns `None` for empty text.
    pub fn new(text: impl Into<String>) -> Option<Self> {
        let text = text.into();
        if text.is_empty() {
            None
        } else {
            Some(Self { text })
        }
    }

    /// The line text.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Consume the line, returning its text.
    pub fn into_text(self) -> String {
        self.text
    }
}

impl fmt::Display for LogLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}
