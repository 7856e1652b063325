//! TOML configuration for the adaptor.
//!
//! All settings can come from the command line; a config file is optional and
//! useful when the adaptor runs as a service.  Command-line values win over
//! file values.
//!
//! ```toml
//! [mouse]
//! path = "/dev/input/by-id/usb-Logitech_USB_Optical_Mouse-event-mouse"
//! wheel = true
//! exclusive = true
//!
//! [serial]
//! path = "/dev/ttyUSB0"
//! baud_rate = 1200
//!
//! [handshake]
//! immediate = false
//!
//! [logging]
//! debug = false
//! ```
//!
//! # Serde default values
//!
//! Every field is `#[serde(default)]`-annotated so that a partial file (or no
//! file at all) still yields a complete [`AppConfig`].  The two device paths
//! have no sensible default; [`AppConfig::resolve`] rejects a configuration
//! where either is still missing after the command line has been applied.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sermouse_core::DEFAULT_BAUD_RATE;
use thiserror::Error;

use crate::application::relay::{RelayConfig, DEFAULT_IDLE_SLEEP};

/// Error type for configuration loading and validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A file system I/O error occurred.
    #[error("I/O error reading config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("no input device given (use --mouse or [mouse] path)")]
    MissingMousePath,

    #[error("no serial device given (use --serial or [serial] path)")]
    MissingSerialPath,

    #[error("baud rate must be greater than zero")]
    ZeroBaudRate,
}

// ── Config schema types ───────────────────────────────────────────────────────

/// Top-level configuration file contents.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppConfig {
    #[serde(default)]
    pub mouse: MouseConfig,
    #[serde(default)]
    pub serial: SerialConfig,
    #[serde(default)]
    pub handshake: HandshakeConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// The USB mouse side.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MouseConfig {
    /// evdev node, e.g. `/dev/input/event3`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Emulate an IntelliMouse (wheel + middle button) instead of a
    /// two-button Microsoft mouse.
    #[serde(default = "default_true")]
    pub wheel: bool,
    /// Grab the device so its events do not reach the local desktop.
    #[serde(default = "default_true")]
    pub exclusive: bool,
}

/// The RS-232 side.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SerialConfig {
    /// tty node, e.g. `/dev/ttyUSB0`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct HandshakeConfig {
    /// Send the identification once at startup and ignore the control lines.
    #[serde(default)]
    pub immediate: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct LoggingConfig {
    /// Log every transmitted byte.
    #[serde(default)]
    pub debug: bool,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_true() -> bool {
    true
}
fn default_baud_rate() -> u32 {
    DEFAULT_BAUD_RATE
}

impl Default for MouseConfig {
    fn default() -> Self {
        Self {
            path: None,
            wheel: default_true(),
            exclusive: default_true(),
        }
    }
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            path: None,
            baud_rate: default_baud_rate(),
        }
    }
}

// ── Loading ───────────────────────────────────────────────────────────────────

/// Settings after merging file and command line, with both paths known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeSettings {
    pub mouse_path: String,
    pub serial_path: String,
    pub wheel: bool,
    pub exclusive: bool,
    pub immediate: bool,
    pub baud_rate: u32,
    pub debug: bool,
}

impl BridgeSettings {
    /// The subset of settings the control loop needs.
    pub fn relay_config(&self) -> RelayConfig {
        RelayConfig {
            wheel_enabled: self.wheel,
            immediate_ident: self.immediate,
            baud_rate: self.baud_rate,
            idle_sleep: DEFAULT_IDLE_SLEEP,
        }
    }
}

impl AppConfig {
    /// Reads and parses a config file.
    ///
    /// Unlike a settings store there is no fallback here: a file named on the
    /// command line must exist.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read and
    /// [`ConfigError::Parse`] if the TOML is malformed.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Parses config text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] if the TOML is malformed.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Checks the merged configuration and flattens it.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingMousePath`] or
    /// [`ConfigError::MissingSerialPath`] when a device is not named, and
    /// [`ConfigError::ZeroBaudRate`] for a zero baud rate.
    pub fn resolve(&self) -> Result<BridgeSettings, ConfigError> {
        let mouse_path = self
            .mouse
            .path
            .clone()
            .filter(|p| !p.is_empty())
            .ok_or(ConfigError::MissingMousePath)?;
        let serial_path = self
            .serial
            .path
            .clone()
            .filter(|p| !p.is_empty())
            .ok_or(ConfigError::MissingSerialPath)?;
        if self.serial.baud_rate == 0 {
            return Err(ConfigError::ZeroBaudRate);
        }

        Ok(BridgeSettings {
            mouse_path,
            serial_path,
            wheel: self.mouse.wheel,
            exclusive: self.mouse.exclusive,
            immediate: self.handshake.immediate,
            baud_rate: self.serial.baud_rate,
            debug: self.logging.debug,
        })
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
