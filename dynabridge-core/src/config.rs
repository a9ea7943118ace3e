//! # Settings
//!
//! Process-wide toggles consulted by every call made through a [`crate::Bridge`].
//! They are plain data so they can be loaded from a file or built from CLI flags.
use serde::{Deserialize, Serialize};

/// Pattern used for string → date coercion when nothing else is configured.
pub const DEFAULT_DATE_FORMAT: &str = "yyyy-MM-dd";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct Settings {
    /// Date pattern using `yyyy`/`MM`/`dd`/`HH`/`mm`/`ss` style letters.
    pub date_format: String,
    /// Collapse a single-key result map into the value of that key.
    pub unwrap_root: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            date_format: DEFAULT_DATE_FORMAT.to_string(),
            unwrap_root: false,
        }
    }
}
