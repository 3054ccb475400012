//! Nested YAML binding layout
//!
//! Older configurations group bindings by channel:
//!
//! ```yaml
//! port: My Device
//! channels:
//!   "10":
//!     pitchwheel: echo pitch
//!     control_change:
//!       "9": echo control9
//! ```
//!
//! Channel and control keys may be written as strings or integers.

use serde::Deserialize;
use serde_yaml::{Mapping, Value};

use super::{parse_accumulate_window, Config};
use crate::binding::{BindingTable, MessageKey};
use crate::error::ConfigError;

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct NestedConfig {
    #[serde(default)]
    port: Option<String>,
    #[serde(default)]
    accumulate_window: Option<Value>,
    #[serde(default)]
    channels: Mapping,
}

/// Parse the nested YAML layout into a [`Config`]
pub fn parse(text: &str) -> Result<Config, ConfigError> {
    // An empty document deserializes to unit, not to a mapping
    let nested: NestedConfig = if text.trim().is_empty() {
        NestedConfig::default()
    } else {
        serde_yaml::from_str(text)?
    };

    let mut config = Config {
        port: nested.port.map(|p| p.trim().to_string()).filter(|p| !p.is_empty()),
        ..Config::default()
    };

    if let Some(window) = nested.accumulate_window {
        config.accumulate_window = parse_accumulate_window(&scalar_text(&window), None)?;
    }

    config.bindings = flatten_channels(&nested.channels)?;
    Ok(config)
}

fn flatten_channels(channels: &Mapping) -> Result<BindingTable, ConfigError> {
    let mut bindings = BindingTable::new();

    for (channel_key, entry) in channels {
        let channel = integer_key(channel_key, "channel", 15)?;
        let entry = entry.as_mapping().ok_or_else(|| {
            ConfigError::Layout(format!("channel {} must map message types to commands", channel))
        })?;

        for (kind, target) in entry {
            match kind.as_str() {
                Some("pitchwheel") => {
                    let command = command_text(target, || format!("channel {} pitchwheel", channel))?;
                    bindings.insert(MessageKey::PitchBend { channel }, command);
                }
                Some("control_change") => {
                    let controls = target.as_mapping().ok_or_else(|| {
                        ConfigError::Layout(format!(
                            "channel {} control_change must map control numbers to commands",
                            channel
                        ))
                    })?;
                    for (control_key, command) in controls {
                        let control = integer_key(control_key, "control", 127)?;
                        let command = command_text(command, || {
                            format!("channel {} control {}", channel, control)
                        })?;
                        bindings.insert(MessageKey::ControlChange { channel, control }, command);
                    }
                }
                _ => {
                    return Err(ConfigError::Layout(format!(
                        "unsupported message type {} on channel {}",
                        scalar_text(kind),
                        channel
                    )))
                }
            }
        }
    }

    Ok(bindings)
}

/// Accept `10` and `"10"` alike
fn integer_key(value: &Value, what: &str, max: u8) -> Result<u8, ConfigError> {
    let parsed = match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    };
    parsed
        .filter(|n| *n <= u64::from(max))
        .map(|n| n as u8)
        .ok_or_else(|| {
            ConfigError::Layout(format!(
                "{} must be an integer in 0..={}, got {}",
                what,
                max,
                scalar_text(value)
            ))
        })
}

fn command_text(value: &Value, context: impl FnOnce() -> String) -> Result<String, ConfigError> {
    value
        .as_str()
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_string)
        .ok_or_else(|| ConfigError::Layout(format!("{} needs a command string", context())))
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        other => format!("{:?}", other),
    }
}
