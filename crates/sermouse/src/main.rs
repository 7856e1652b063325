//! sermouse: entry point.
//!
//! Reads a USB mouse through Linux evdev and presents it to a vintage PC as a
//! Microsoft (two-button) or IntelliMouse (wheel) serial mouse.
//!
//! # Usage
//!
//! ```text
//! sermouse [OPTIONS]
//!
//! Options:
//!   -m, --mouse <PATH>    evdev node of the USB mouse
//!   -s, --serial <PATH>   tty the PC's mouse cable is wired to
//!   -w, --no-wheel        emulate a two-button Microsoft mouse
//!   -e, --no-exclusive    do not grab the input device
//!   -i, --immediate       identify once at startup, ignore RTS/DTR
//!   -d, --debug           log every transmitted byte
//!   -c, --config <FILE>   TOML config file (command-line options win)
//! ```
//!
//! # Environment variable overrides
//!
//! | Variable          | Description                   |
//! |-------------------|-------------------------------|
//! | `SERMOUSE_MOUSE`  | evdev node of the USB mouse   |
//! | `SERMOUSE_SERIAL` | serial tty                    |
//! | `RUST_LOG`        | log filter, overrides `-d`    |

use std::path::PathBuf;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use sermouse::infrastructure::config::{AppConfig, BridgeSettings};

// ── CLI argument definitions ──────────────────────────────────────────────────

/// USB mouse to RS-232 serial mouse adaptor.
///
/// Flags only ever switch features off or on relative to the config file;
/// an absent flag leaves the file's value alone.
#[derive(Debug, Parser)]
#[command(
    name = "sermouse",
    about = "Use a USB mouse as a Microsoft / IntelliMouse serial mouse",
    version
)]
struct Cli {
    /// evdev node of the USB mouse, e.g. /dev/input/event3.
    #[arg(short, long, env = "SERMOUSE_MOUSE")]
    mouse: Option<String>,

    /// Serial device wired to the PC's mouse port, e.g. /dev/ttyUSB0.
    #[arg(short, long, env = "SERMOUSE_SERIAL")]
    serial: Option<String>,

    /// Emulate a two-button Microsoft mouse (no wheel, no middle button).
    #[arg(short = 'w', long)]
    no_wheel: bool,

    /// Do not grab the input device; its events also reach the local desktop.
    #[arg(short = 'e', long)]
    no_exclusive: bool,

    /// Send the identification once at startup instead of waiting for the
    /// host to toggle RTS/DTR.
    #[arg(short, long)]
    immediate: bool,

    /// Log every transmitted byte.
    #[arg(short, long)]
    debug: bool,

    /// Optional TOML configuration file.
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,
}

impl Cli {
    /// Loads the config file (if any) and applies the command line on top.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or if the
    /// merged settings are incomplete.
    fn into_settings(self) -> anyhow::Result<BridgeSettings> {
        let mut config = match &self.config {
            Some(path) => AppConfig::load(path)
                .with_context(|| format!("loading config {}", path.display()))?,
            None => AppConfig::default(),
        };

        if self.mouse.is_some() {
            config.mouse.path = self.mouse;
        }
        if self.serial.is_some() {
            config.serial.path = self.serial;
        }
        if self.no_wheel {
            config.mouse.wheel = false;
        }
        if self.no_exclusive {
            config.mouse.exclusive = false;
        }
        config.handshake.immediate |= self.immediate;
        config.logging.debug |= self.debug;

        Ok(config.resolve()?)
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

/// Program entry point.
///
/// # What happens at startup
///
/// 1. CLI arguments are parsed and merged over the optional config file.
/// 2. `tracing_subscriber` is initialised; `RUST_LOG` wins over `--debug`.
/// 3. A Ctrl+C handler clears a shared `AtomicBool`.
/// 4. The mouse and serial port are opened and the relay runs until the flag
///    is cleared or the mouse disappears.
/// 5. RTS/DTR are dropped and the input grab is released.
fn main() -> anyhow::Result<()> {
    let settings = Cli::parse().into_settings()?;

    // ── Logging setup ─────────────────────────────────────────────────────────
    let default_level = if settings.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    info!(
        mouse = %settings.mouse_path,
        serial = %settings.serial_path,
        wheel = settings.wheel,
        immediate = settings.immediate,
        "sermouse starting"
    );

    // ── Graceful shutdown flag ────────────────────────────────────────────────
    let running = Arc::new(AtomicBool::new(true));
    let running_clone = Arc::clone(&running);
    ctrlc::set_handler(move || {
        info!("received termination signal, shutting down");
        running_clone.store(false, Ordering::Relaxed);
    })
    .context("installing signal handler")?;

    run(&settings, &running)?;

    info!("sermouse stopped");
    Ok(())
}

#[cfg(target_os = "linux")]
fn run(settings: &BridgeSettings, running: &AtomicBool) -> anyhow::Result<()> {
    use sermouse::application::relay::MouseRelay;
    use sermouse::infrastructure::input::EvdevMouse;
    use sermouse::infrastructure::serial::SerialPortLink;

    let mouse = EvdevMouse::open(&settings.mouse_path, settings.exclusive)
        .with_context(|| format!("opening input device {}", settings.mouse_path))?;
    let serial = SerialPortLink::open(&settings.serial_path, settings.baud_rate)
        .with_context(|| format!("opening serial device {}", settings.serial_path))?;

    let mut relay = MouseRelay::new(serial, mouse, settings.relay_config())?;
    relay.start();
    let result = relay.run(running);
    relay.shutdown();
    result.context("relay stopped")
}

#[cfg(not(target_os = "linux"))]
fn run(_settings: &BridgeSettings, _running: &AtomicBool) -> anyhow::Result<()> {
    anyhow::bail!("reading a USB mouse requires Linux evdev; this platform is not supported")
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::parse_from(std::iter::once("sermouse").chain(args.iter().copied()))
    }

    #[test]
    fn test_short_flags_are_accepted() {
        // Arrange / Act
        let cli = parse(&["-m", "/dev/input/event3", "-s", "/dev/ttyS0", "-w", "-e", "-i", "-d"]);

        // Assert
        assert_eq!(cli.mouse.as_deref(), Some("/dev/input/event3"));
        assert_eq!(cli.serial.as_deref(), Some("/dev/ttyS0"));
        assert!(cli.no_wheel && cli.no_exclusive && cli.immediate && cli.debug);
    }

    #[test]
    fn test_command_line_without_file_resolves() {
        let settings = parse(&["--mouse", "/dev/input/event3", "--serial", "/dev/ttyUSB0", "--no-wheel"])
            .into_settings()
            .unwrap();

        assert_eq!(settings.mouse_path, "/dev/input/event3");
        assert_eq!(settings.serial_path, "/dev/ttyUSB0");
        assert!(!settings.wheel);
        assert!(settings.exclusive);
        assert!(!settings.immediate);
        assert_eq!(settings.baud_rate, 1200);
    }

    #[test]
    fn test_command_line_overrides_file() {
        // Arrange
        let path = std::env::temp_dir().join(format!("sermouse-test-{}.toml", std::process::id()));
        std::fs::write(
            &path,
            "[mouse]\npath = \"/dev/input/event1\"\n[serial]\npath = \"/dev/ttyS0\"\nbaud_rate = 2400\n",
        )
        .unwrap();

        // Act
        let settings = parse(&["-c", path.to_str().unwrap(), "-s", "/dev/ttyUSB1", "-i"])
            .into_settings();
        std::fs::remove_file(&path).ok();
        let settings = settings.unwrap();

        // Assert
        assert_eq!(settings.mouse_path, "/dev/input/event1");
        assert_eq!(settings.serial_path, "/dev/ttyUSB1");
        assert_eq!(settings.baud_rate, 2400);
        assert!(settings.immediate);
    }

    #[test]
    fn test_missing_devices_is_an_error() {
        let result = parse(&["--mouse", "/dev/input/event3"]).into_settings();

        assert!(result.is_err());
    }
}
