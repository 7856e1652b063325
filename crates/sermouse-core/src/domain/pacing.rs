//! Baud-paced transmission scheduler.
//!
//! # Why pace at all? (for beginners)
//!
//! A real serial mouse cannot send faster than its UART: at 1200 baud with
//! 7N1 framing each byte occupies 9 bit times (start + 7 data + stop), i.e.
//! 7.5 ms.  Legacy mouse drivers are calibrated to that rhythm, and some
//! lose byte alignment when packets arrive back-to-back faster than a real
//! mouse could have produced them.
//!
//! The scheduler therefore keeps one *target* instant.  A regular update may
//! leave only once the clock has reached the target; after every transmission
//! the target moves to `now + interval`, where the interval is the wire time
//! of the bytes just sent.
//!
//! Button and wheel changes set `force_send` on the state and skip the gate:
//! a click delayed by a pacing window feels broken, and the host copes with
//! an occasional early packet.

use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::trace;

use crate::domain::mouse_state::{MouseState, PendingLevel};
use crate::protocol::packet::PacketSize;

/// Baud rate of the Microsoft serial mouse protocol.
pub const DEFAULT_BAUD_RATE: u32 = 1200;

/// Bit times per transmitted byte: 1 start, 7 data, no parity, 1 stop.
pub const BITS_PER_FRAME: u32 = 9;

const NANOS_PER_SECOND: u64 = 1_000_000_000;

/// Errors building a pacer.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PacingError {
    /// A zero baud rate has no finite byte time.
    #[error("baud rate must be greater than zero")]
    ZeroBaudRate,
}

/// Gates transmissions to the emulated line rate.
#[derive(Debug, Clone)]
pub struct BaudPacer {
    baud_rate: u32,
    target: Instant,
}

impl BaudPacer {
    /// Creates a pacer whose first window closes one 3-byte interval after
    /// `now`.
    ///
    /// # Errors
    ///
    /// Returns [`PacingError::ZeroBaudRate`] if `baud_rate` is zero.
    pub fn new(baud_rate: u32, now: Instant) -> Result<Self, PacingError> {
        if baud_rate == 0 {
            return Err(PacingError::ZeroBaudRate);
        }
        let mut pacer = Self {
            baud_rate,
            target: now,
        };
        pacer.target = now + pacer.interval(PacketSize::Short);
        Ok(pacer)
    }

    /// Wire time of one update of the given size at the configured baud.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use std::time::{Duration, Instant};
    /// use sermouse_core::{BaudPacer, PacketSize};
    ///
    /// let pacer = BaudPacer::new(1200, Instant::now()).unwrap();
    /// assert_eq!(pacer.interval(PacketSize::Short), Duration::from_micros(22_500));
    /// assert_eq!(pacer.interval(PacketSize::Full), Duration::from_millis(30));
    /// ```
    pub fn interval(&self, size: PacketSize) -> Duration {
        let bits = size.byte_len() as u64 * u64::from(BITS_PER_FRAME);
        Duration::from_nanos(bits * NANOS_PER_SECOND / u64::from(self.baud_rate))
    }

    /// Decides whether the pending update may be transmitted at `now`.
    ///
    /// True when `force_send` is set, or when something is pending and the
    /// current window has closed.  Never true for an empty window.
    pub fn should_transmit(&self, now: Instant, state: &MouseState) -> bool {
        if state.pending_level() == PendingLevel::None {
            return false;
        }
        state.force_send() || now >= self.target
    }

    /// Opens the next window after a packet of `size` left at `now`.
    pub fn record_transmission(&mut self, now: Instant, size: PacketSize) {
        self.target = now + self.interval(size);
        trace!(?size, "pacing window rearmed");
    }

    /// Instant at which the current window closes.
    pub fn target(&self) -> Instant {
        self.target
    }

    /// Time left in the current window, zero once it has closed.
    pub fn remaining(&self, now: Instant) -> Duration {
        self.target.saturating_duration_since(now)
    }

    pub fn baud_rate(&self) -> u32 {
        self.baud_rate
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
