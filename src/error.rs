//! Error types for configuration loading and message normalization

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading a configuration.
///
/// Every variant is fatal: a failing load never yields a partial binding table.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Malformed binding line or message pattern
    #[error("syntax error on line {line}: {message}")]
    Syntax { line: usize, message: String },

    /// `accumulate_window` is not a usable, strictly positive number of seconds.
    /// `line` is `None` for the YAML layout.
    #[error(
        "invalid accumulate_window {value:?}{} (expected a positive number of seconds)",
        on_line(.line)
    )]
    InvalidAccumulateWindow { line: Option<usize>, value: String },

    /// Well-formed YAML with an unexpected binding layout
    #[error("invalid configuration: {0}")]
    Layout(String),

    /// Nested YAML layout could not be deserialized
    #[error("invalid YAML configuration: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Configuration file could not be read
    #[error("can't read file {}", .path.display())]
    NotFound {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl ConfigError {
    pub(crate) fn syntax(line: usize, message: impl Into<String>) -> Self {
        ConfigError::Syntax {
            line,
            message: message.into(),
        }
    }
}

fn on_line(line: &Option<usize>) -> String {
    line.map(|n| format!(" on line {}", n)).unwrap_or_default()
}

/// Returned by normalization for message types the engine does not route.
///
/// Callers treat this as "no binding", never as a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("unsupported message type: {0}")]
pub struct UnsupportedMessageType(pub &'static str);
