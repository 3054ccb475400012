//! Configuration loading
//!
//! A configuration holds the global settings (input port, debounce window) and
//! the [`BindingTable`]. It is built once at startup and never changes after.
//! Two on-disk layouts are understood: the line-oriented text format (see
//! [`parser`]) and the nested YAML layout used by older setups (see [`yaml`]),
//! picked by file extension.

pub mod parser;
pub mod yaml;

use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;
use tracing::debug;

use crate::binding::BindingTable;
use crate::error::ConfigError;

/// Debounce window used when the configuration doesn't set one
pub const DEFAULT_ACCUMULATE_WINDOW: Duration = Duration::from_millis(500);

/// Application name used for the per-user config directory
const APP_NAME: &str = "midi2cmd";

/// Built-in bindings, used when no configuration file exists yet
pub const DEFAULT_CONFIG: &str = include_str!("default.config.txt");

/// Global settings plus bindings
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// MIDI input port name; `None` means it must be given on the command line
    pub port: Option<String>,
    /// Debounce window, always > 0
    pub accumulate_window: Duration,
    pub bindings: BindingTable,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: None,
            accumulate_window: DEFAULT_ACCUMULATE_WINDOW,
            bindings: BindingTable::new(),
        }
    }
}

impl Config {
    /// Parse the line-oriented text format
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        parser::parse(text)
    }

    /// Parse the nested YAML layout
    pub fn from_yaml(text: &str) -> Result<Self, ConfigError> {
        yaml::parse(text)
    }

    /// The built-in configuration, parsed the same way as a file
    pub fn defaults() -> Result<Self, ConfigError> {
        Self::parse(DEFAULT_CONFIG)
    }

    /// Load configuration from file
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::NotFound {
                path: path.to_path_buf(),
                source,
            })?;

        let config = if is_yaml(path) {
            Self::from_yaml(&contents)?
        } else {
            Self::parse(&contents)?
        };

        debug!(
            "Loaded {} bindings from {} (port: {:?}, accumulate_window: {:?})",
            config.bindings.len(),
            path.display(),
            config.port,
            config.accumulate_window
        );
        Ok(config)
    }

    /// Debounce window applied to every bound key
    pub fn accumulate_window(&self) -> Duration {
        self.accumulate_window
    }
}

fn is_yaml(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml"))
}

/// Per-user configuration file, e.g. `~/.config/midi2cmd/config.txt` on Linux
pub fn default_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
        .join("config.txt")
}

/// Validate an `accumulate_window` value: a single number of seconds > 0 that
/// fits in a [`Duration`]. Surrounding whitespace is accepted.
///
/// `line` is the 1-based source line when the format has one.
pub(crate) fn parse_accumulate_window(
    raw: &str,
    line: Option<usize>,
) -> Result<Duration, ConfigError> {
    let invalid = || ConfigError::InvalidAccumulateWindow {
        line,
        value: raw.trim().to_string(),
    };
    let seconds: f64 = raw.trim().parse().map_err(|_| invalid())?;
    if !seconds.is_finite() || seconds <= 0.0 {
        return Err(invalid());
    }
    match Duration::try_from_secs_f64(seconds) {
        Ok(window) if !window.is_zero() => Ok(window),
        _ => Err(invalid()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::midi::MidiMessage;
    use std::fs as std_fs;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_parse() {
        let cfg = Config::defaults().unwrap();
        assert_eq!(cfg.accumulate_window, DEFAULT_ACCUMULATE_WINDOW);
        assert_eq!(cfg.bindings.len(), 3);
        assert!(cfg
            .bindings
            .lookup(&MidiMessage::control_change(10, 9, 0))
            .is_some_and(|cmd| cmd.contains("MIDI_VALUE")));
        assert!(cfg.bindings.lookup(&MidiMessage::pitch_bend(10, 0)).is_some());
    }

    #[test]
    fn test_accumulate_window_duration() {
        let cfg = Config::parse("accumulate_window: 0.2\n").unwrap();
        assert_eq!(cfg.accumulate_window(), Duration::from_millis(200));
    }

    #[test]
    fn test_window_must_fit_a_duration() {
        assert_eq!(
            parse_accumulate_window(" 1.5 ", None).unwrap(),
            Duration::from_millis(1500)
        );
        for value in ["1e20", "1e-12"] {
            assert!(
                matches!(
                    parse_accumulate_window(value, Some(3)),
                    Err(ConfigError::InvalidAccumulateWindow { line: Some(3), .. })
                ),
                "value {:?}",
                value
            );
        }
    }

    #[test]
    fn test_huge_window_is_rejected_before_dispatch() {
        let err = Config::parse("accumulate_window: 1e20\n").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidAccumulateWindow { line: Some(1), .. }
        ));
        let err = Config::from_yaml("accumulate_window: 1e20\n").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidAccumulateWindow { line: None, .. }
        ));
    }

    #[test]
    fn test_default_path_file_name() {
        let path = default_path();
        assert!(path.ends_with("midi2cmd/config.txt"));
    }

    #[tokio::test]
    async fn test_load_text_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.txt");
        std_fs::write(&path, "port: Test\ncontrol_change channel=1 control=2: echo hi\n").unwrap();

        let cfg = Config::load(&path).await.unwrap();
        assert_eq!(cfg.port.as_deref(), Some("Test"));
        assert_eq!(cfg.bindings.len(), 1);
    }

    #[tokio::test]
    async fn test_load_yaml_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.yml");
        std_fs::write(&path, "channels:\n  1:\n    pitchwheel: echo hi\n").unwrap();

        let cfg = Config::load(&path).await.unwrap();
        assert_eq!(cfg.bindings.lookup(&MidiMessage::pitch_bend(1, 5)), Some("echo hi"));
    }

    #[tokio::test]
    async fn test_load_missing_file() {
        let err = Config::load("non_existent_file").await.unwrap_err();
        assert!(matches!(err, ConfigError::NotFound { .. }));
        assert_eq!(err.to_string(), "can't read file non_existent_file");
    }

    #[tokio::test]
    async fn test_load_invalid_file_yields_no_table() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.txt");
        std_fs::write(
            &path,
            "control_change channel=1 control=2: echo ok\nthis line is broken\n",
        )
        .unwrap();

        assert!(matches!(
            Config::load(&path).await,
            Err(ConfigError::Syntax { line: 2, .. })
        ));
    }
}
