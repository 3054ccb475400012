//! MIDI input ports
//!
//! Port discovery and the input connection feeding decoded messages into a
//! Tokio channel. The dispatcher only ever sees the receiving end.

use anyhow::{anyhow, Context, Result};
use midir::{MidiInput, MidiInputConnection, MidiInputPort};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::midi::{format_hex, MidiMessage};

const CLIENT_NAME: &str = "midi2cmd";

/// Capacity of the message channel between the MIDI callback and the reader
const CHANNEL_CAPACITY: usize = 1000;

/// Information about a MIDI input port
#[derive(Debug, Clone)]
pub struct PortInfo {
    pub name: String,
    pub is_virtual: bool,
}

/// Discover input ports
pub fn discover_input_ports() -> Result<Vec<PortInfo>> {
    let midi_in = MidiInput::new(&format!("{}-discovery", CLIENT_NAME))
        .context("Failed to create MIDI input")?;

    let port_infos = midi_in
        .ports()
        .iter()
        .filter_map(|port| midi_in.port_name(port).ok())
        .map(|name| PortInfo {
            is_virtual: is_virtual_port(&name),
            name,
        })
        .collect();

    Ok(port_infos)
}

fn is_virtual_port(name: &str) -> bool {
    name.contains("Virtual") || name.contains("loopMIDI") || name.contains("IAC")
}

/// The port to open, or the error shown when none was configured
pub fn require_port(port: Option<&str>) -> Result<&str> {
    port.map(str::trim)
        .filter(|p| !p.is_empty())
        .ok_or_else(|| anyhow!("No MIDI input port configured. Hint: use `midi2cmd list`."))
}

fn unavailable(port: &str) -> anyhow::Error {
    anyhow!("Port '{}' is not available. Hint: use `midi2cmd list`.", port)
}

/// Pick a port by exact name, falling back to a case-insensitive substring match
pub fn match_port<S: AsRef<str>>(names: &[S], pattern: &str) -> Option<usize> {
    names
        .iter()
        .position(|name| name.as_ref() == pattern)
        .or_else(|| {
            let pattern = pattern.to_lowercase();
            names
                .iter()
                .position(|name| name.as_ref().to_lowercase().contains(&pattern))
        })
}

fn find_input_port(midi_in: &MidiInput, pattern: &str) -> Option<(MidiInputPort, String)> {
    let ports = midi_in.ports();
    let names: Vec<String> = ports
        .iter()
        .map(|port| midi_in.port_name(port).unwrap_or_default())
        .collect();

    let index = match_port(names.as_slice(), pattern)?;
    debug!("Found port '{}' matching '{}'", names[index], pattern);
    Some((ports[index].clone(), names[index].clone()))
}

/// Open input connection. Dropping it closes the port and ends the stream.
pub struct MidiInputStream {
    _connection: MidiInputConnection<()>,
    port_name: String,
}

impl MidiInputStream {
    /// Connect to `port` and return the stream with its message receiver
    pub fn open(port: &str) -> Result<(Self, mpsc::Receiver<MidiMessage>)> {
        let midi_in = MidiInput::new(CLIENT_NAME).context("Failed to create MIDI input")?;
        debug!("Found {} MIDI input ports", midi_in.port_count());

        let (in_port, port_name) =
            find_input_port(&midi_in, port).ok_or_else(|| unavailable(port))?;

        info!("Connecting to input port: {}", port_name);

        let (event_tx, event_rx) = mpsc::channel(CHANNEL_CAPACITY);

        let connection = midi_in
            .connect(
                &in_port,
                CLIENT_NAME,
                move |_timestamp, data, _| match MidiMessage::parse(data) {
                    // Don't block the MIDI thread; drop on overflow
                    Some(message) => {
                        if let Err(e) = event_tx.try_send(message) {
                            warn!("Dropping MIDI message: {}", e);
                        }
                    }
                    None => debug!("Failed to parse MIDI: {}", format_hex(data)),
                },
                (),
            )
            .map_err(|e| {
                debug!("Connect failed: {}", e);
                unavailable(port)
            })?;

        Ok((
            Self {
                _connection: connection,
                port_name,
            },
            event_rx,
        ))
    }

    /// Full name of the connected port
    pub fn port_name(&self) -> &str {
        &self.port_name
    }
}
