//! midi2cmd - run shell commands from MIDI controllers
//!
//! A plain-text configuration binds pitch bend and control change messages to
//! shell commands. Incoming messages are normalized to a [`MessageKey`], looked
//! up in the [`BindingTable`], optionally coalesced per key, and executed with
//! the message value in `MIDI_VALUE`.

pub mod binding;
pub mod coalescer;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod executor;
pub mod input;
pub mod midi;
pub mod monitor;

pub use binding::{normalize, BindingTable, MessageKey, MessageKind};
pub use config::Config;
pub use dispatcher::{Dispatch, Dispatcher};
pub use error::{ConfigError, UnsupportedMessageType};
pub use executor::{CommandExecutor, ShellExecutor, VALUE_VAR};
pub use midi::MidiMessage;
