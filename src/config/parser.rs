//! Line-oriented configuration parser
//!
//! ```text
//! port: <device name>
//! accumulate_window: <seconds>
//! pitchwheel channel=<int>: <shell command>
//! control_change channel=<int> control=<int>: <shell command>
//! ```

use std::time::Duration;
use tracing::{debug, warn};

use super::{parse_accumulate_window, Config};
use crate::binding::{BindingTable, MessageKey};
use crate::error::ConfigError;

const PORT_KEY: &str = "port";
const WINDOW_KEY: &str = "accumulate_window";

/// Parse configuration text into a [`Config`].
///
/// `port` and `accumulate_window` keep their first occurrence. Later binding
/// lines for the same key replace earlier ones.
pub fn parse(text: &str) -> Result<Config, ConfigError> {
    let mut port: Option<String> = None;
    let mut accumulate_window: Option<Duration> = None;
    let mut bindings = BindingTable::new();

    for (index, raw_line) in text.lines().enumerate() {
        let line_no = index + 1;
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let (head, tail) = line.split_once(':').ok_or_else(|| {
            ConfigError::syntax(line_no, "expected '<message pattern>: <command>'")
        })?;

        match head.trim() {
            PORT_KEY => {
                let value = tail.trim();
                if value.is_empty() {
                    continue;
                }
                if let Some(existing) = &port {
                    warn!(
                        "Ignoring port '{}' on line {} (already set to '{}')",
                        value, line_no, existing
                    );
                } else {
                    port = Some(value.to_string());
                }
            }
            WINDOW_KEY => {
                // Trailing comments are allowed here since a number never contains '#'
                let value = tail.split('#').next().unwrap_or_default();
                let window = parse_accumulate_window(value, Some(line_no))?;
                if accumulate_window.is_none() {
                    accumulate_window = Some(window);
                } else {
                    debug!("Ignoring repeated accumulate_window on line {}", line_no);
                }
            }
            pattern => {
                let key: MessageKey = pattern
                    .parse()
                    .map_err(|e| ConfigError::syntax(line_no, format!("'{}': {}", pattern, e)))?;
                let command = tail.trim();
                if command.is_empty() {
                    return Err(ConfigError::syntax(
                        line_no,
                        format!("no command bound to '{}'", pattern),
                    ));
                }
                if let Some(previous) = bindings.insert(key, command) {
                    debug!("Line {} rebinds {} (was: {})", line_no, key, previous);
                }
            }
        }
    }

    let mut config = Config {
        port,
        bindings,
        ..Config::default()
    };
    if let Some(window) = accumulate_window {
        config.accumulate_window = window;
    }
    Ok(config)
}
