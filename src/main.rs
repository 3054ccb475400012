//! midi2cmd - run shell commands from MIDI controllers

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use midi2cmd::config::{self, Config};
use midi2cmd::input::{self, MidiInputStream};
use midi2cmd::{monitor, Dispatcher, ShellExecutor};

/// Run shell commands when MIDI controls move
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log level (error, warn, info, debug, trace)
    #[arg(short, long, env = "LOG_LEVEL", default_value = "info", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List available MIDI input ports
    List,
    /// Print MIDI messages as they are received
    Dump(PortArgs),
    /// Run the MIDI command processor
    Run(PortArgs),
    /// Print the built-in default configuration
    Defaults,
}

#[derive(Args, Debug)]
struct PortArgs {
    /// Configuration file [default: <user config dir>/midi2cmd/config.txt]
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Name of the MIDI input port to use (overrides the config file)
    #[arg(short, long)]
    port: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    init_logging(&cli.log_level)?;

    match cli.command {
        Command::List => {
            let ports = input::discover_input_ports()?;
            monitor::print_ports(&ports);
        }
        Command::Defaults => {
            print!("{}", config::DEFAULT_CONFIG);
        }
        Command::Dump(args) => {
            let cfg = load_config(args.config.as_deref()).await?;
            let port = args.port.or(cfg.port);
            let (stream, rx) = MidiInputStream::open(input::require_port(port.as_deref())?)?;
            info!("Dumping messages from '{}' (Ctrl+C to stop)", stream.port_name());

            monitor::dump(rx, shutdown_signal()).await;
        }
        Command::Run(args) => {
            let cfg = load_config(args.config.as_deref()).await?;
            let port = args.port.clone().or_else(|| cfg.port.clone());
            let (stream, rx) = MidiInputStream::open(input::require_port(port.as_deref())?)?;

            let dispatcher = Dispatcher::from_config(&cfg, Arc::new(ShellExecutor::new()));
            info!(
                "Listening on '{}' with {} bindings (accumulate_window: {:?})",
                stream.port_name(),
                cfg.bindings.len(),
                cfg.accumulate_window
            );

            let handled = dispatcher.run(rx, shutdown_signal()).await;
            info!("Processed {} messages", handled);
        }
    }

    Ok(())
}

/// Load the given config file, or the per-user one.
///
/// Only the implicit per-user path falls back to the built-in defaults when
/// missing; an explicit `--config` must exist.
async fn load_config(path: Option<&std::path::Path>) -> Result<Config> {
    if let Some(path) = path {
        info!("Configuration file: {}", path.display());
        return Ok(Config::load(path).await?);
    }

    let path = config::default_path();
    if tokio::fs::try_exists(&path).await.unwrap_or(false) {
        info!("Configuration file: {}", path.display());
        Ok(Config::load(&path).await?)
    } else {
        warn!(
            "No configuration at {}, using built-in defaults (see `midi2cmd defaults`)",
            path.display()
        );
        Ok(Config::defaults()?)
    }
}

fn init_logging(level: &str) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_thread_names(false),
        )
        .try_init()?;

    Ok(())
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install CTRL+C signal handler");
    info!("Shutdown signal received");
}
