//! Identification handshake state machine.
//!
//! # How a host finds a serial mouse (for beginners)
//!
//! A serial mouse is powered from the RS-232 control lines.  When a driver
//! (re)initialises the mouse it drops RTS and DTR, which cuts the power, and
//! then raises them again.  A real mouse boots, waits a few microseconds, and
//! sends its identification string: `M` for a Microsoft mouse, `MZ` for an
//! IntelliMouse with a wheel.  The driver reads that string to pick a packet
//! format.
//!
//! Our serial adapter is wired null-modem style, so the host's RTS/DTR are
//! seen here as CTS/DSR.
//!
//! # States
//!
//! ```text
//!            lines low               lines still low          CTS high
//!  Idle ───────────────► AwaitingReset ─────────► AwaitingRequest ─────► Identified
//!   ▲                                                                       │
//!   └───────────── (re-evaluated every loop iteration) ◄────────────────────┘
//! ```
//!
//! With *immediate* identification the machine jumps straight to
//! `Identified` at startup and never looks at the lines again.
//!
//! This type only decides; it does not poll or sleep.  The blocking driver
//! lives in the application layer and feeds observations in.

use tracing::trace;

/// Snapshot of the host's control lines as seen on our side of the cable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HostLines {
    /// Clear-to-send: the host's request-to-send.
    pub cts: bool,
    /// Data-set-ready: the host's data-terminal-ready.
    pub dsr: bool,
}

impl HostLines {
    /// `true` when the host has dropped both lines (driver reset).
    pub fn both_low(self) -> bool {
        !self.cts && !self.dsr
    }
}

/// Where the handshake currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeState {
    /// No reset seen yet.
    Idle,
    /// Lines seen low once; waiting for the low level to be confirmed.
    AwaitingReset,
    /// Reset confirmed; waiting for the host to raise its request line.
    AwaitingRequest,
    /// Identification sent.
    Identified,
}

/// What the caller should do after an observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeStep {
    /// No negotiation in progress; regular traffic may flow.
    Pass,
    /// Negotiation in progress; keep polling the lines, send nothing else.
    Wait,
    /// Send the identification string now.
    Announce,
}

/// The identification handshake.
#[derive(Debug, Clone)]
pub struct Handshake {
    state: HandshakeState,
    immediate: bool,
}

impl Handshake {
    /// Creates a handshake in [`HandshakeState::Idle`].
    pub fn new(immediate: bool) -> Self {
        Self {
            state: HandshakeState::Idle,
            immediate,
        }
    }

    /// Startup step.
    ///
    /// In immediate mode this is the only time the identification is
    /// requested; otherwise nothing happens until the lines say so.
    pub fn start(&mut self) -> HandshakeStep {
        if self.immediate {
            self.transition(HandshakeState::Identified);
            HandshakeStep::Announce
        } else {
            HandshakeStep::Pass
        }
    }

    /// Feeds one control-line reading into the machine.
    ///
    /// `None` means the read failed; it carries no information and never
    /// advances the machine.
    pub fn observe(&mut self, lines: Option<HostLines>) -> HandshakeStep {
        if self.immediate {
            return HandshakeStep::Pass;
        }

        match self.state {
            HandshakeState::Idle | HandshakeState::Identified => match lines {
                Some(lines) if lines.both_low() => {
                    self.transition(HandshakeState::AwaitingReset);
                    HandshakeStep::Wait
                }
                _ => HandshakeStep::Pass,
            },
            HandshakeState::AwaitingReset => {
                if lines.is_some_and(HostLines::both_low) {
                    self.transition(HandshakeState::AwaitingRequest);
                }
                HandshakeStep::Wait
            }
            HandshakeState::AwaitingRequest => {
                if lines.is_some_and(|l| l.cts) {
                    self.transition(HandshakeState::Identified);
                    HandshakeStep::Announce
                } else {
                    HandshakeStep::Wait
                }
            }
        }
    }

    pub fn state(&self) -> HandshakeState {
        self.state
    }

    pub fn is_immediate(&self) -> bool {
        self.immediate
    }

    /// `true` while regular traffic must be held back.
    pub fn in_progress(&self) -> bool {
        matches!(
            self.state,
            HandshakeState::AwaitingReset | HandshakeState::AwaitingRequest
        )
    }

    fn transition(&mut self, next: HandshakeState) {
        trace!(from = ?self.state, to = ?next, "handshake transition");
        self.state = next;
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    const LOW: HostLines = HostLines { cts: false, dsr: false };
    const HIGH: HostLines = HostLines { cts: true, dsr: true };
    const CTS_ONLY: HostLines = HostLines { cts: true, dsr: false };
    const DSR_ONLY: HostLines = HostLines { cts: false, dsr: true };

    #[test]
    fn test_immediate_mode_announces_once_at_start() {
        // Arrange
        let mut hs = Handshake::new(true);

        // Act
        let step = hs.start();

        // Assert
        assert_eq!(step, HandshakeStep::Announce);
        assert_eq!(hs.state(), HandshakeState::Identified);
    }

    #[test]
    fn test_immediate_mode_ignores_line_changes() {
        let mut hs = Handshake::new(true);
        hs.start();

        for lines in [LOW, LOW, HIGH, LOW] {
            assert_eq!(hs.observe(Some(lines)), HandshakeStep::Pass);
        }
        assert_eq!(hs.state(), HandshakeState::Identified);
    }

    #[test]
    fn test_normal_mode_start_does_not_announce() {
        let mut hs = Handshake::new(false);

        assert_eq!(hs.start(), HandshakeStep::Pass);
        assert_eq!(hs.state(), HandshakeState::Idle);
    }

    #[test]
    fn test_full_sequence_low_confirmed_high_announces() {
        // Arrange
        let mut hs = Handshake::new(false);

        // Act / Assert
        assert_eq!(hs.observe(Some(LOW)), HandshakeStep::Wait);
        assert_eq!(hs.state(), HandshakeState::AwaitingReset);
        assert_eq!(hs.observe(Some(LOW)), HandshakeStep::Wait);
        assert_eq!(hs.state(), HandshakeState::AwaitingRequest);
        assert_eq!(hs.observe(Some(LOW)), HandshakeStep::Wait);
        assert_eq!(hs.observe(Some(CTS_ONLY)), HandshakeStep::Announce);
        assert_eq!(hs.state(), HandshakeState::Identified);
    }

    #[test]
    fn test_lines_high_keeps_idle_and_passes_traffic() {
        let mut hs = Handshake::new(false);

        assert_eq!(hs.observe(Some(HIGH)), HandshakeStep::Pass);
        assert_eq!(hs.observe(Some(DSR_ONLY)), HandshakeStep::Pass);
        assert_eq!(hs.state(), HandshakeState::Idle);
        assert!(!hs.in_progress());
    }

    #[test]
    fn test_read_failure_never_advances() {
        // Arrange
        let mut hs = Handshake::new(false);

        // Act / Assert – from idle, a failed read is "no news"
        assert_eq!(hs.observe(None), HandshakeStep::Pass);
        hs.observe(Some(LOW));
        assert_eq!(hs.observe(None), HandshakeStep::Wait);
        assert_eq!(hs.state(), HandshakeState::AwaitingReset);
        hs.observe(Some(LOW));
        assert_eq!(hs.observe(None), HandshakeStep::Wait);
        assert_eq!(hs.state(), HandshakeState::AwaitingRequest);
    }

    #[test]
    fn test_reset_confirmation_waits_for_both_lines_low() {
        let mut hs = Handshake::new(false);
        hs.observe(Some(LOW));

        assert_eq!(hs.observe(Some(DSR_ONLY)), HandshakeStep::Wait);

        assert_eq!(hs.state(), HandshakeState::AwaitingReset);
    }

    #[test]
    fn test_request_waits_for_cts_not_dsr() {
        let mut hs = Handshake::new(false);
        hs.observe(Some(LOW));
        hs.observe(Some(LOW));

        assert_eq!(hs.observe(Some(DSR_ONLY)), HandshakeStep::Wait);
        assert_eq!(hs.state(), HandshakeState::AwaitingRequest);
    }

    #[test]
    fn test_identified_reenters_on_new_reset() {
        // Arrange – complete one handshake
        let mut hs = Handshake::new(false);
        for lines in [LOW, LOW, HIGH] {
            hs.observe(Some(lines));
        }
        assert_eq!(hs.state(), HandshakeState::Identified);

        // Act – host stays up for a while, then reloads its driver
        assert_eq!(hs.observe(Some(HIGH)), HandshakeStep::Pass);
        let step = hs.observe(Some(LOW));

        // Assert
        assert_eq!(step, HandshakeStep::Wait);
        assert!(hs.in_progress());
    }
}
