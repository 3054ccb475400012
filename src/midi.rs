//! MIDI message types
//!
//! Decodes raw MIDI bytes into [`MidiMessage`], the event type consumed by the
//! dispatcher. The textual form follows the same vocabulary as binding patterns
//! (`control_change channel=10 control=9 value=64`), so `dump` output can be pasted
//! straight into a configuration file.

use std::fmt;

/// Centre position of the 14-bit pitch bend range
pub const PITCH_BEND_CENTER: u16 = 8192;

/// Decoded MIDI message. Channels are 0-based (0-15).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MidiMessage {
    /// Note Off: channel, note (0-127), velocity (0-127)
    NoteOff { channel: u8, note: u8, velocity: u8 },

    /// Note On: channel, note (0-127), velocity (1-127)
    NoteOn { channel: u8, note: u8, velocity: u8 },

    /// Polyphonic Key Pressure
    PolyPressure { channel: u8, note: u8, pressure: u8 },

    /// Control Change: channel, control number (0-127), value (0-127)
    ControlChange { channel: u8, control: u8, value: u8 },

    /// Program Change
    ProgramChange { channel: u8, program: u8 },

    /// Channel Pressure
    ChannelPressure { channel: u8, pressure: u8 },

    /// Pitch Bend: channel, raw 14-bit value (0-16383, centre 8192)
    PitchBend { channel: u8, value: u16 },

    /// System Exclusive payload without the F0/F7 framing
    SysEx { data: Vec<u8> },

    /// Single-byte system message (clock, start/stop, active sensing, ...).
    /// Only shown by `dump`; never bound.
    Realtime { status: u8 },
}

/// Names of the single-byte system messages
fn realtime_name(status: u8) -> Option<&'static str> {
    match status {
        0xF6 => Some("tune_request"),
        0xF8 => Some("clock"),
        0xFA => Some("start"),
        0xFB => Some("continue"),
        0xFC => Some("stop"),
        0xFE => Some("active_sensing"),
        0xFF => Some("reset"),
        _ => None,
    }
}

impl MidiMessage {
    /// Build a pitch bend message from a signed bend (-8192..=8191)
    pub fn pitch_bend(channel: u8, pitch: i16) -> Self {
        let raw = (pitch.clamp(-8192, 8191) as i32 + PITCH_BEND_CENTER as i32) as u16;
        MidiMessage::PitchBend {
            channel,
            value: raw,
        }
    }

    /// Build a control change message
    pub fn control_change(channel: u8, control: u8, value: u8) -> Self {
        MidiMessage::ControlChange {
            channel,
            control,
            value,
        }
    }

    /// Parse a MIDI message from raw bytes
    pub fn parse(data: &[u8]) -> Option<Self> {
        let (&status, rest) = data.split_first()?;

        // Running status needs state we don't keep
        if status < 0x80 {
            return None;
        }

        let byte = |i: usize| rest.get(i).map(|b| b & 0x7F);

        if status < 0xF0 {
            let channel = status & 0x0F;
            return match status & 0xF0 {
                0x80 => Some(MidiMessage::NoteOff {
                    channel,
                    note: byte(0)?,
                    velocity: byte(1)?,
                }),
                0x90 => {
                    let note = byte(0)?;
                    let velocity = byte(1)?;
                    if velocity == 0 {
                        Some(MidiMessage::NoteOff {
                            channel,
                            note,
                            velocity: 0,
                        })
                    } else {
                        Some(MidiMessage::NoteOn {
                            channel,
                            note,
                            velocity,
                        })
                    }
                }
                0xA0 => Some(MidiMessage::PolyPressure {
                    channel,
                    note: byte(0)?,
                    pressure: byte(1)?,
                }),
                0xB0 => Some(MidiMessage::ControlChange {
                    channel,
                    control: byte(0)?,
                    value: byte(1)?,
                }),
                0xC0 => Some(MidiMessage::ProgramChange {
                    channel,
                    program: byte(0)?,
                }),
                0xD0 => Some(MidiMessage::ChannelPressure {
                    channel,
                    pressure: byte(0)?,
                }),
                0xE0 => {
                    let lsb = byte(0)? as u16;
                    let msb = byte(1)? as u16;
                    Some(MidiMessage::PitchBend {
                        channel,
                        value: (msb << 7) | lsb,
                    })
                }
                _ => None,
            };
        }

        if status == 0xF0 {
            let end = rest.iter().position(|&b| b == 0xF7)?;
            return Some(MidiMessage::SysEx {
                data: rest[..end].to_vec(),
            });
        }

        // Time code and song position/select carry nothing worth dumping
        realtime_name(status).map(|_| MidiMessage::Realtime { status })
    }

    /// Encode the message to MIDI bytes
    pub fn encode(&self) -> Vec<u8> {
        match *self {
            MidiMessage::NoteOff {
                channel,
                note,
                velocity,
            } => vec![0x80 | (channel & 0x0F), note & 0x7F, velocity & 0x7F],
            MidiMessage::NoteOn {
                channel,
                note,
                velocity,
            } => vec![0x90 | (channel & 0x0F), note & 0x7F, velocity & 0x7F],
            MidiMessage::PolyPressure {
                channel,
                note,
                pressure,
            } => vec![0xA0 | (channel & 0x0F), note & 0x7F, pressure & 0x7F],
            MidiMessage::ControlChange {
                channel,
                control,
                value,
            } => vec![0xB0 | (channel & 0x0F), control & 0x7F, value & 0x7F],
            MidiMessage::ProgramChange { channel, program } => {
                vec![0xC0 | (channel & 0x0F), program & 0x7F]
            }
            MidiMessage::ChannelPressure { channel, pressure } => {
                vec![0xD0 | (channel & 0x0F), pressure & 0x7F]
            }
            MidiMessage::PitchBend { channel, value } => {
                let lsb = (value & 0x7F) as u8;
                let msb = ((value >> 7) & 0x7F) as u8;
                vec![0xE0 | (channel & 0x0F), lsb, msb]
            }
            MidiMessage::SysEx { ref data } => {
                let mut result = Vec::with_capacity(data.len() + 2);
                result.push(0xF0);
                result.extend_from_slice(data);
                result.push(0xF7);
                result
            }
            MidiMessage::Realtime { status } => vec![status],
        }
    }

    /// Message type name, in binding pattern vocabulary
    pub fn type_name(&self) -> &'static str {
        match self {
            MidiMessage::NoteOff { .. } => "note_off",
            MidiMessage::NoteOn { .. } => "note_on",
            MidiMessage::PolyPressure { .. } => "polytouch",
            MidiMessage::ControlChange { .. } => "control_change",
            MidiMessage::ProgramChange { .. } => "program_change",
            MidiMessage::ChannelPressure { .. } => "aftertouch",
            MidiMessage::PitchBend { .. } => "pitchwheel",
            MidiMessage::SysEx { .. } => "sysex",
            MidiMessage::Realtime { status } => realtime_name(*status).unwrap_or("system"),
        }
    }

    /// Get the channel for channel messages (0-15), None for system messages
    pub fn channel(&self) -> Option<u8> {
        match *self {
            MidiMessage::NoteOff { channel, .. }
            | MidiMessage::NoteOn { channel, .. }
            | MidiMessage::PolyPressure { channel, .. }
            | MidiMessage::ControlChange { channel, .. }
            | MidiMessage::ProgramChange { channel, .. }
            | MidiMessage::ChannelPressure { channel, .. }
            | MidiMessage::PitchBend { channel, .. } => Some(channel),
            _ => None,
        }
    }

    /// Signed pitch bend (-8192..=8191), None for other message types
    pub fn pitch(&self) -> Option<i16> {
        match *self {
            MidiMessage::PitchBend { value, .. } => {
                Some((value as i32 - PITCH_BEND_CENTER as i32) as i16)
            }
            _ => None,
        }
    }
}

impl fmt::Display for MidiMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = self.type_name();
        match *self {
            MidiMessage::NoteOff {
                channel,
                note,
                velocity,
            }
            | MidiMessage::NoteOn {
                channel,
                note,
                velocity,
            } => write!(f, "{name} channel={channel} note={note} velocity={velocity}"),
            MidiMessage::PolyPressure {
                channel,
                note,
                pressure,
            } => write!(f, "{name} channel={channel} note={note} value={pressure}"),
            MidiMessage::ControlChange {
                channel,
                control,
                value,
            } => write!(f, "{name} channel={channel} control={control} value={value}"),
            MidiMessage::ProgramChange { channel, program } => {
                write!(f, "{name} channel={channel} program={program}")
            }
            MidiMessage::ChannelPressure { channel, pressure } => {
                write!(f, "{name} channel={channel} value={pressure}")
            }
            MidiMessage::PitchBend { channel, .. } => {
                write!(f, "{name} channel={channel} pitch={}", self.pitch().unwrap_or(0))
            }
            MidiMessage::SysEx { ref data } => write!(f, "{name} data=({})", format_hex(data)),
            MidiMessage::Realtime { .. } => f.write_str(name),
        }
    }
}

/// Format MIDI bytes as hex string for debugging
pub fn format_hex(data: &[u8]) -> String {
    data.iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(" ")
}
