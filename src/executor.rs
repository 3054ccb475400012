//! Command execution
//!
//! The dispatcher never waits on the commands it launches. Execution sits
//! behind the [`CommandExecutor`] trait so tests can record calls instead of
//! spawning shells.

use std::collections::HashMap;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info, warn};

/// Environment variable carrying the message value into the command
pub const VALUE_VAR: &str = "MIDI_VALUE";

/// Fire-and-forget command launcher
pub trait CommandExecutor: Send + Sync {
    /// Start `command` with `env` layered over the inherited environment.
    ///
    /// Must return without waiting for the command. Failures are the
    /// implementation's to report; nothing is propagated to the caller.
    fn execute(&self, command: &str, env: &HashMap<String, String>);
}

/// Runs commands through the platform shell (`sh -c`, or `cmd /C` on Windows).
///
/// Must be used from within a Tokio runtime: children are reaped on a
/// background task.
#[derive(Debug, Clone, Default)]
pub struct ShellExecutor;

impl ShellExecutor {
    pub fn new() -> Self {
        Self
    }

    fn shell_command(command: &str) -> Command {
        #[cfg(windows)]
        {
            let mut cmd = Command::new("cmd");
            cmd.arg("/C").arg(command);
            cmd
        }
        #[cfg(not(windows))]
        {
            let mut cmd = Command::new("sh");
            cmd.arg("-c").arg(command);
            cmd
        }
    }
}

impl CommandExecutor for ShellExecutor {
    fn execute(&self, command: &str, env: &HashMap<String, String>) {
        info!("▶ {} {:?}", command, env);

        let spawned = Self::shell_command(command)
            .envs(env)
            .stdin(Stdio::null())
            .spawn();

        let mut child = match spawned {
            Ok(child) => child,
            Err(e) => {
                warn!("Failed to spawn '{}': {}", command, e);
                return;
            }
        };

        let command = command.to_string();
        tokio::spawn(async move {
            match child.wait().await {
                Ok(status) if status.success() => debug!("'{}' finished", command),
                Ok(status) => debug!("'{}' exited with {}", command, status),
                Err(e) => warn!("Failed to wait for '{}': {}", command, e),
            }
        });
    }
}
