//! Message keys and the binding table
//!
//! A [`MessageKey`] is the identity of a message with every transient field
//! (value, pitch, time) stripped off. The [`BindingTable`] maps keys to the
//! shell command templates loaded from the configuration.

use std::collections::hash_map::{self, HashMap};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::error::UnsupportedMessageType;
use crate::midi::MidiMessage;

/// Message types that can be bound to a command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    PitchBend,
    ControlChange,
}

impl MessageKind {
    /// Type token used in binding patterns
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageKind::PitchBend => "pitchwheel",
            MessageKind::ControlChange => "control_change",
        }
    }
}

impl FromStr for MessageKind {
    type Err = PatternError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pitchwheel" => Ok(MessageKind::PitchBend),
            "control_change" => Ok(MessageKind::ControlChange),
            other => Err(PatternError(format!(
                "unsupported message type '{}' (expected pitchwheel or control_change)",
                other
            ))),
        }
    }
}

/// Normalized lookup key.
///
/// Pitch bend keys carry no control number, so two pitch bend keys are equal
/// whenever their channels are.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKey {
    PitchBend { channel: u8 },
    ControlChange { channel: u8, control: u8 },
}

impl MessageKey {
    pub fn kind(&self) -> MessageKind {
        match self {
            MessageKey::PitchBend { .. } => MessageKind::PitchBend,
            MessageKey::ControlChange { .. } => MessageKind::ControlChange,
        }
    }

    pub fn channel(&self) -> u8 {
        match *self {
            MessageKey::PitchBend { channel } | MessageKey::ControlChange { channel, .. } => {
                channel
            }
        }
    }

    /// Control number, only meaningful for control change keys
    pub fn control(&self) -> Option<u8> {
        match *self {
            MessageKey::PitchBend { .. } => None,
            MessageKey::ControlChange { control, .. } => Some(control),
        }
    }
}

impl fmt::Display for MessageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            MessageKey::PitchBend { channel } => write!(f, "pitchwheel channel={}", channel),
            MessageKey::ControlChange { channel, control } => {
                write!(f, "control_change channel={} control={}", channel, control)
            }
        }
    }
}

/// Error produced when a message pattern can't be resolved to a key
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct PatternError(String);

impl FromStr for MessageKey {
    type Err = PatternError;

    /// Parse a pattern such as `control_change channel=10 control=9`.
    ///
    /// Omitted attributes default to 0. `pitch`, `value` and `time` are
    /// validated but don't take part in the key.
    fn from_str(pattern: &str) -> Result<Self, Self::Err> {
        let mut tokens = pattern.split_whitespace();
        let kind: MessageKind = tokens
            .next()
            .ok_or_else(|| PatternError("empty message pattern".to_string()))?
            .parse()?;

        let mut seen: Vec<&str> = Vec::new();
        let mut channel = 0u8;
        let mut control = 0u8;

        for token in tokens {
            let (name, raw) = token.split_once('=').ok_or_else(|| {
                PatternError(format!("expected name=value attribute, got '{}'", token))
            })?;
            if seen.contains(&name) {
                return Err(PatternError(format!("{} specified more than once", name)));
            }
            seen.push(name);

            match (kind, name) {
                (_, "channel") => channel = parse_in_range(name, raw, 0, 15)? as u8,
                (_, "time") => {
                    raw.parse::<f64>()
                        .ok()
                        .filter(|t| t.is_finite())
                        .ok_or_else(|| PatternError(format!("time must be a number, got '{}'", raw)))?;
                }
                (MessageKind::ControlChange, "control") => {
                    control = parse_in_range(name, raw, 0, 127)? as u8
                }
                (MessageKind::ControlChange, "value") => {
                    parse_in_range(name, raw, 0, 127)?;
                }
                (MessageKind::PitchBend, "pitch") => {
                    parse_in_range(name, raw, -8192, 8191)?;
                }
                _ => {
                    return Err(PatternError(format!(
                        "{} has no attribute '{}'",
                        kind.as_str(),
                        name
                    )))
                }
            }
        }

        Ok(match kind {
            MessageKind::PitchBend => MessageKey::PitchBend { channel },
            MessageKind::ControlChange => MessageKey::ControlChange { channel, control },
        })
    }
}

fn parse_in_range(name: &str, raw: &str, min: i32, max: i32) -> Result<i32, PatternError> {
    let value: i32 = raw
        .parse()
        .map_err(|_| PatternError(format!("{} must be an integer, got '{}'", name, raw)))?;
    if !(min..=max).contains(&value) {
        return Err(PatternError(format!(
            "{} must be in range {}..={}, got {}",
            name, min, max, value
        )));
    }
    Ok(value)
}

/// Derive the lookup key for an incoming message.
///
/// Value, pitch and timing never take part in the key. Message types other
/// than pitch bend and control change yield [`UnsupportedMessageType`].
pub fn normalize(message: &MidiMessage) -> Result<MessageKey, UnsupportedMessageType> {
    match *message {
        MidiMessage::PitchBend { channel, .. } => Ok(MessageKey::PitchBend { channel }),
        MidiMessage::ControlChange {
            channel, control, ..
        } => Ok(MessageKey::ControlChange { channel, control }),
        ref other => Err(UnsupportedMessageType(other.type_name())),
    }
}

/// Numeric value exposed to the bound command: the signed bend for pitch
/// bend, the controller value for control change.
pub fn message_value(message: &MidiMessage) -> Option<i32> {
    match *message {
        MidiMessage::PitchBend { .. } => message.pitch().map(i32::from),
        MidiMessage::ControlChange { value, .. } => Some(i32::from(value)),
        _ => None,
    }
}

/// Read-only mapping from message key to command template
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BindingTable {
    commands: HashMap<MessageKey, String>,
}

impl BindingTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a command, returning the command it replaced
    pub fn insert(&mut self, key: MessageKey, command: impl Into<String>) -> Option<String> {
        self.commands.insert(key, command.into())
    }

    pub fn get(&self, key: &MessageKey) -> Option<&str> {
        self.commands.get(key).map(String::as_str)
    }

    /// Normalize a message and look up its command
    pub fn lookup(&self, message: &MidiMessage) -> Option<&str> {
        normalize(message).ok().and_then(|key| self.get(&key))
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn iter(&self) -> hash_map::Iter<'_, MessageKey, String> {
        self.commands.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_pattern_parsing() {
        assert_eq!(
            "control_change channel=10 control=9".parse::<MessageKey>().unwrap(),
            MessageKey::ControlChange {
                channel: 10,
                control: 9
            }
        );
        assert_eq!(
            "pitchwheel channel=10".parse::<MessageKey>().unwrap(),
            MessageKey::PitchBend { channel: 10 }
        );
        // Attribute order and extra whitespace don't matter
        assert_eq!(
            "  control_change   control=18 channel=2 value=3 ".parse::<MessageKey>().unwrap(),
            MessageKey::ControlChange {
                channel: 2,
                control: 18
            }
        );
    }

    #[test]
    fn test_pattern_defaults_to_zero() {
        assert_eq!(
            "control_change".parse::<MessageKey>().unwrap(),
            MessageKey::ControlChange {
                channel: 0,
                control: 0
            }
        );
    }

    #[test]
    fn test_pattern_value_fields_are_ignored() {
        let a: MessageKey = "pitchwheel channel=3 pitch=-200".parse().unwrap();
        let b: MessageKey = "pitchwheel channel=3 pitch=4000 time=1.5".parse().unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_pattern_errors() {
        for bad in [
            "",
            "note_on channel=1 note=60",
            "pitchwheel channel=1 control=3",
            "control_change channel=16 control=1",
            "control_change channel=1 control=128",
            "control_change channel=x",
            "control_change channel",
            "control_change channel=1 channel=2",
            "pitchwheel pitch=9000",
            "control_change time=soon",
        ] {
            assert!(bad.parse::<MessageKey>().is_err(), "accepted {:?}", bad);
        }
    }

    #[test]
    fn test_normalize_unsupported() {
        let note = MidiMessage::NoteOn {
            channel: 10,
            note: 60,
            velocity: 100,
        };
        assert_eq!(normalize(&note), Err(UnsupportedMessageType("note_on")));
        assert_eq!(message_value(&note), None);
    }

    #[test]
    fn test_lookup_is_exact() {
        let mut table = BindingTable::new();
        table.insert(
            MessageKey::ControlChange {
                channel: 10,
                control: 9,
            },
            "echo ten",
        );

        assert_eq!(table.lookup(&MidiMessage::control_change(10, 9, 1)), Some("echo ten"));
        assert_eq!(table.lookup(&MidiMessage::control_change(6, 9, 1)), None);
        assert_eq!(table.lookup(&MidiMessage::control_change(10, 8, 1)), None);
        assert_eq!(table.lookup(&MidiMessage::pitch_bend(10, 0)), None);
    }

    #[test]
    fn test_insert_overwrites() {
        let mut table = BindingTable::new();
        let key = MessageKey::PitchBend { channel: 1 };
        assert_eq!(table.insert(key, "echo foo"), None);
        assert_eq!(table.insert(key, "echo bar").as_deref(), Some("echo foo"));
        assert_eq!(table.len(), 1);
        assert_eq!(table.get(&key), Some("echo bar"));
    }

    #[test]
    fn test_key_display_roundtrips_through_parser() {
        let key = MessageKey::ControlChange {
            channel: 4,
            control: 77,
        };
        assert_eq!(key.to_string().parse::<MessageKey>().unwrap(), key);
    }

    proptest! {
        #[test]
        fn prop_control_change_value_is_ignored(
            channel in 0u8..16, control in 0u8..128, a in 0u8..128, b in 0u8..128
        ) {
            let first = normalize(&MidiMessage::control_change(channel, control, a)).unwrap();
            let second = normalize(&MidiMessage::control_change(channel, control, b)).unwrap();
            prop_assert_eq!(first, second);
            prop_assert_eq!(first.control(), Some(control));
        }

        #[test]
        fn prop_pitch_bend_magnitude_is_ignored(
            channel in 0u8..16, a in -8192i16..=8191, b in -8192i16..=8191
        ) {
            let first = normalize(&MidiMessage::pitch_bend(channel, a)).unwrap();
            let second = normalize(&MidiMessage::pitch_bend(channel, b)).unwrap();
            prop_assert_eq!(first, second);
            prop_assert_eq!(first.control(), None);
        }

        #[test]
        fn prop_unrouted_types_never_match(
            channel in 0u8..16, note in 0u8..128, velocity in 1u8..128, program in 0u8..128
        ) {
            let mut table = BindingTable::new();
            for ch in 0..16 {
                table.insert(MessageKey::PitchBend { channel: ch }, "echo pb");
                for ctl in 0..128 {
                    table.insert(MessageKey::ControlChange { channel: ch, control: ctl }, "echo cc");
                }
            }
            let unrouted = [
                MidiMessage::NoteOn { channel, note, velocity },
                MidiMessage::NoteOff { channel, note, velocity },
                MidiMessage::ProgramChange { channel, program },
                MidiMessage::Realtime { status: 0xF8 },
            ];
            for message in &unrouted {
                prop_assert!(table.lookup(message).is_none());
            }
        }
    }
}
