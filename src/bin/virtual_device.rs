//! Virtual MIDI device for testing midi2cmd
//!
//! Creates a virtual output port named `miditest` and sends a fixed sequence
//! of messages, one per trigger:
//!
//! ```text
//! WAIT_MODE=signal midi2cmd-virtual-device   # SIGUSR1 sends the next message
//! WAIT_MODE=key    midi2cmd-virtual-device   # Enter sends the next message
//! WAIT_MODE=pause  midi2cmd-virtual-device   # one message per second
//! ```

use anyhow::Result;
use clap::{Parser, ValueEnum};
use tracing::info;

use midi2cmd::MidiMessage;

const PORT_NAME: &str = "miditest";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum WaitMode {
    Signal,
    Key,
    Pause,
}

/// Virtual MIDI output port that plays a test sequence
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// What triggers each message
    #[arg(long, env = "WAIT_MODE", value_enum, default_value_t = WaitMode::Key)]
    wait_mode: WaitMode,

    /// Name of the virtual port
    #[arg(long, default_value = PORT_NAME)]
    port_name: String,
}

fn messages() -> Vec<MidiMessage> {
    vec![
        MidiMessage::pitch_bend(10, 0),
        MidiMessage::control_change(10, 9, 64),
        MidiMessage::control_change(10, 18, 0),
        MidiMessage::control_change(10, 26, 127),
        MidiMessage::control_change(10, 1, 1),
    ]
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let args = Args::parse();
    run(args).await
}

#[cfg(unix)]
async fn run(args: Args) -> Result<()> {
    use anyhow::Context;
    use midir::os::unix::VirtualOutput;
    use midir::MidiOutput;
    use std::time::Duration;
    use tokio::io::{AsyncBufReadExt, BufReader};
    use tokio::signal::unix::{signal, SignalKind};

    let midi_out = MidiOutput::new("midi2cmd-virtual-device")?;
    let mut port = midi_out
        .create_virtual(&args.port_name)
        .map_err(|e| anyhow::anyhow!("Failed to create virtual port '{}': {}", args.port_name, e))?;
    info!("Virtual port '{}' ready ({:?} mode)", args.port_name, args.wait_mode);

    let mut usr1 = match args.wait_mode {
        WaitMode::Signal => Some(signal(SignalKind::user_defined1())?),
        _ => None,
    };
    let mut stdin = BufReader::new(tokio::io::stdin()).lines();

    for message in messages() {
        match args.wait_mode {
            WaitMode::Signal => {
                if let Some(usr1) = usr1.as_mut() {
                    usr1.recv().await;
                }
            }
            WaitMode::Key => {
                println!("Press Enter to send next message...");
                if stdin.next_line().await?.is_none() {
                    break;
                }
            }
            WaitMode::Pause => tokio::time::sleep(Duration::from_secs(1)).await,
        }

        port.send(&message.encode())
            .with_context(|| format!("Failed to send {}", message))?;
        info!("Sent {}", message);
    }

    Ok(())
}

#[cfg(not(unix))]
async fn run(_args: Args) -> Result<()> {
    anyhow::bail!("Virtual MIDI ports are only supported on Unix platforms")
}
