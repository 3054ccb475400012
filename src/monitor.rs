//! Terminal output for `list` and `dump`

use colored::*;
use std::future::Future;
use std::time::Instant;
use tokio::sync::mpsc;

use crate::input::PortInfo;
use crate::midi::{format_hex, MidiMessage};

/// Print available input ports, one per line
pub fn print_ports(ports: &[PortInfo]) {
    println!("{}", "Available MIDI input ports:".bold());
    if ports.is_empty() {
        println!("    {}", "No input ports found".dimmed());
    }
    for port in ports {
        let marker = if port.is_virtual {
            " [VIRTUAL]".yellow()
        } else {
            "".normal()
        };
        println!("    {}{}", port.name, marker);
    }
}

/// Plain one-line rendering of a received message
fn format_event(elapsed_ms: u64, message: &MidiMessage) -> String {
    format!(
        "[{:08}ms] {:<9} | {}",
        elapsed_ms,
        format_hex(&message.encode()),
        message
    )
}

fn event_color(message: &MidiMessage) -> Color {
    match message {
        MidiMessage::NoteOn { .. } => Color::BrightGreen,
        MidiMessage::NoteOff { .. } => Color::BrightRed,
        MidiMessage::ControlChange { .. } => Color::BrightYellow,
        MidiMessage::PitchBend { .. } => Color::BrightCyan,
        MidiMessage::SysEx { .. } => Color::BrightMagenta,
        _ => Color::White,
    }
}

fn print_event(elapsed_ms: u64, message: &MidiMessage) {
    println!(
        "{} {}",
        chrono::Local::now().format("%H:%M:%S%.3f").to_string().dimmed(),
        format_event(elapsed_ms, message).color(event_color(message))
    );
}

/// Print every message until the stream closes or `shutdown` resolves
pub async fn dump(mut events: mpsc::Receiver<MidiMessage>, shutdown: impl Future<Output = ()>) {
    tokio::pin!(shutdown);
    let start = Instant::now();

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Some(message) => print_event(start.elapsed().as_millis() as u64, &message),
                None => break,
            },
            _ = &mut shutdown => break,
        }
    }

    println!("\n{}", "Dump stopped".yellow());
}
