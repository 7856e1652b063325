//! Identification driver: runs the handshake against a real serial link.
//!
//! The pure state machine lives in [`sermouse_core::Handshake`]; this module
//! owns the blocking part.  Once the host has dropped its control lines the
//! driver busy-polls them until the sequence completes, then waits the
//! mouse's power-on latency and writes the identification string.
//!
//! There is no timeout: a physical mouse simply waits for the host, and so do
//! we.  The only way out of a wait is the shutdown flag.

use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use sermouse_core::{Handshake, HandshakeStep, HostLines, Identification};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Delay between the host's request edge and our identification bytes.
pub const POWER_ON_DELAY: Duration = Duration::from_micros(14);

/// Sleep between two control-line reads while a handshake is in progress.
pub const LINE_POLL_INTERVAL: Duration = Duration::from_micros(1);

/// Error type for serial transport operations.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("failed to open serial device {path}: {reason}")]
    Open { path: String, reason: String },
    #[error("serial write failed: {0}")]
    Write(#[source] std::io::Error),
    #[error("control line access failed: {0}")]
    ControlLines(String),
}

/// The serial side of the adaptor.
///
/// The production implementation wraps a tty opened with `serialport`; tests
/// use a scripted or `mockall` mock.
#[cfg_attr(test, mockall::automock)]
pub trait SerialLink {
    /// Writes `bytes` in order, handing each byte to the driver on its own.
    fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), TransportError>;

    /// Reads the host's RTS/DTR as seen on our CTS/DSR inputs.
    fn read_host_lines(&mut self) -> Result<HostLines, TransportError>;

    /// Asserts (`true`) or deasserts our RTS and DTR outputs together.
    fn set_output_lines(&mut self, asserted: bool) -> Result<(), TransportError>;
}

/// Result of one call to [`Identifier::service`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentifyOutcome {
    /// The host is not resetting the driver; carry on.
    NotRequested,
    /// The identification string was written.
    Announced,
    /// Shutdown was requested while waiting on the host.
    Interrupted,
}

/// Drives the handshake and writes the identification string.
pub struct Identifier {
    handshake: Handshake,
    identification: Identification,
}

impl Identifier {
    pub fn new(immediate: bool, identification: Identification) -> Self {
        Self {
            handshake: Handshake::new(immediate),
            identification,
        }
    }

    /// Announces at startup when immediate identification is configured.
    ///
    /// Returns `Ok(true)` if the identification string was written.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] if the identification bytes could not be
    /// written.
    pub fn start<S: SerialLink + ?Sized>(&mut self, link: &mut S) -> Result<bool, TransportError> {
        match self.handshake.start() {
            HandshakeStep::Announce => {
                info!("performing immediate identification as mouse");
                self.announce(link)?;
                Ok(true)
            }
            HandshakeStep::Pass | HandshakeStep::Wait => Ok(false),
        }
    }

    /// Checks the host lines once and, if a driver reset has begun, blocks
    /// until the identification has been sent.
    ///
    /// In immediate mode the lines are never read.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] if the identification bytes could not be
    /// written.  Control-line read failures are logged and retried.
    pub fn service<S: SerialLink + ?Sized>(
        &mut self,
        link: &mut S,
        running: &AtomicBool,
    ) -> Result<IdentifyOutcome, TransportError> {
        if self.handshake.is_immediate() {
            return Ok(IdentifyOutcome::NotRequested);
        }

        let mut step = self.handshake.observe(read_lines(link));
        if step == HandshakeStep::Pass {
            return Ok(IdentifyOutcome::NotRequested);
        }

        debug!("host RTS & DTR low, identifying as mouse");
        while step == HandshakeStep::Wait {
            if !running.load(Ordering::Relaxed) {
                return Ok(IdentifyOutcome::Interrupted);
            }
            thread::sleep(LINE_POLL_INTERVAL);
            step = self.handshake.observe(read_lines(link));
        }

        thread::sleep(POWER_ON_DELAY);
        self.announce(link)?;
        info!("mouse initialized, good to go");
        Ok(IdentifyOutcome::Announced)
    }

    pub fn handshake(&self) -> &Handshake {
        &self.handshake
    }

    pub fn identification(&self) -> Identification {
        self.identification
    }

    fn announce<S: SerialLink + ?Sized>(&self, link: &mut S) -> Result<(), TransportError> {
        debug!(ident = ?self.identification, "sending identification");
        link.write_bytes(self.identification.as_bytes())
    }
}

/// A failed read is "no new information", never a reason to stop.
fn read_lines<S: SerialLink + ?Sized>(link: &mut S) -> Option<HostLines> {
    match link.read_host_lines() {
        Ok(lines) => Some(lines),
        Err(e) => {
            warn!("control line read failed: {e}");
            None
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
