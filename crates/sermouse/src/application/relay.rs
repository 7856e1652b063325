//! MouseRelay: the single-threaded control loop of the adaptor.
//!
//! Each iteration:
//!
//! 1. Lets the [`Identifier`] check the host's control lines (this blocks
//!    while the host is re-initialising its mouse driver).
//! 2. Polls the HID source for at most one event and folds it into the
//!    [`MouseState`].
//! 3. Asks the [`BaudPacer`] whether the pending update may leave now, and if
//!    so encodes it and writes it to the serial link.
//!
//! There are no threads and no async runtime; the loop owns the serial link,
//! the input source and all protocol state exclusively.

use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use sermouse_core::{
    BaudPacer, Button, Identification, MouseEvent, MouseState, PacingError, WirePacket,
    DEFAULT_BAUD_RATE,
};
use thiserror::Error;
use tracing::{debug, info, trace, warn};

use super::identify::{IdentifyOutcome, Identifier, SerialLink};

/// Default sleep when the input source has nothing to offer.
pub const DEFAULT_IDLE_SLEEP: Duration = Duration::from_micros(50);

/// Error type for the HID input side.
#[derive(Debug, Error)]
pub enum InputError {
    #[error("failed to open input device {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{path} does not look like a mouse (missing {missing})")]
    NotAMouse { path: String, missing: String },
    #[error("exclusive grab of input device failed: {0}")]
    Grab(#[source] std::io::Error),
    #[error("input device read failed: {0}")]
    Read(#[source] std::io::Error),
}

/// Fatal errors of the control loop.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error(transparent)]
    Input(#[from] InputError),
    #[error("invalid pacing configuration: {0}")]
    Pacing(#[from] PacingError),
}

/// Source of discrete HID mouse events.
///
/// `Ok(None)` means "nothing right now"; it is not an error.
pub trait MouseEventSource {
    /// Returns the next pending event without blocking.
    fn next_event(&mut self) -> Result<Option<MouseEvent>, InputError>;

    /// Drops every event that is already buffered, without blocking.
    ///
    /// Returns the number of mouse events thrown away.
    fn discard_pending(&mut self) -> Result<usize, InputError>;

    /// Releases any exclusive grab held on the device.
    fn release(&mut self) -> Result<(), InputError>;
}

/// Runtime settings for the relay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayConfig {
    /// IntelliMouse mode: wheel, middle button, 4-byte packets, `"MZ"`.
    pub wheel_enabled: bool,
    /// Identify once at startup instead of following the control lines.
    pub immediate_ident: bool,
    /// Emulated line rate used for pacing.
    pub baud_rate: u32,
    /// Sleep between polls when no input event is ready.
    pub idle_sleep: Duration,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            wheel_enabled: true,
            immediate_ident: false,
            baud_rate: DEFAULT_BAUD_RATE,
            idle_sleep: DEFAULT_IDLE_SLEEP,
        }
    }
}

/// Counters for diagnostics and tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RelayStats {
    pub packets_sent: u64,
    pub bytes_sent: u64,
    pub write_failures: u64,
    pub identifications: u64,
}

/// The control loop.
pub struct MouseRelay<S, I> {
    serial: S,
    input: I,
    state: MouseState,
    pacer: BaudPacer,
    identifier: Identifier,
    config: RelayConfig,
    stats: RelayStats,
}

impl<S: SerialLink, I: MouseEventSource> MouseRelay<S, I> {
    /// Creates a relay over an already opened serial link and input source.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Pacing`] if the baud rate is zero.
    pub fn new(serial: S, input: I, config: RelayConfig) -> Result<Self, RelayError> {
        let pacer = BaudPacer::new(config.baud_rate, Instant::now())?;
        let identifier = Identifier::new(
            config.immediate_ident,
            Identification::for_wheel(config.wheel_enabled),
        );
        Ok(Self {
            serial,
            input,
            state: MouseState::new(config.wheel_enabled),
            pacer,
            identifier,
            config,
            stats: RelayStats::default(),
        })
    }

    /// Startup: performs the immediate identification if configured.
    pub fn start(&mut self) {
        info!("waiting for PC to initialize mouse driver");
        match self.identifier.start(&mut self.serial) {
            Ok(true) => self.stats.identifications += 1,
            Ok(false) => {}
            Err(e) => self.record_write_failure(&e),
        }
    }

    /// Runs iterations until `running` is cleared.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Input`] when the input device fails for good.
    pub fn run(&mut self, running: &AtomicBool) -> Result<(), RelayError> {
        while running.load(Ordering::Relaxed) {
            if !self.tick(running)? {
                thread::sleep(self.config.idle_sleep);
            }
        }
        info!(stats = ?self.stats, "relay stopped");
        Ok(())
    }

    /// One loop iteration.  Returns `true` if an input event was consumed.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Input`] if reading the input source fails.
    pub fn tick(&mut self, running: &AtomicBool) -> Result<bool, RelayError> {
        match self.identifier.service(&mut self.serial, running) {
            Ok(IdentifyOutcome::Announced) => {
                self.stats.identifications += 1;
                // Motion made while the host was probing is not replayed.
                let dropped = self.input.discard_pending()?;
                debug!(dropped, "input buffered during identification discarded");
            }
            Ok(IdentifyOutcome::Interrupted) => return Ok(false),
            Ok(IdentifyOutcome::NotRequested) => {}
            Err(e) => self.record_write_failure(&e),
        }

        let event = self.input.next_event()?;
        if let Some(event) = event {
            self.handle_event(event);
        }
        self.flush(Instant::now());
        Ok(event.is_some())
    }

    /// Folds one event into the accumulated state.
    ///
    /// Without wheel support the middle button is not reported at all: the
    /// basic protocol cannot express it.
    pub fn handle_event(&mut self, event: MouseEvent) {
        if !self.config.wheel_enabled
            && matches!(event, MouseEvent::Button { button: Button::Middle, .. })
        {
            trace!("middle button ignored, wheel support disabled");
            return;
        }
        self.state.apply(event);
    }

    /// Transmits the pending update if the pacer allows it at `now`.
    ///
    /// Returns the packet that was handed to the serial link, if any.
    pub fn flush(&mut self, now: Instant) -> Option<WirePacket> {
        if !self.pacer.should_transmit(now, &self.state) {
            return None;
        }
        let remaining = self.pacer.remaining(now);
        let packet = self.state.take_packet()?;

        for (index, byte) in packet.as_bytes().iter().enumerate() {
            debug!(
                index,
                byte = format_args!("{byte:#04x}"),
                bits = format_args!("{byte:08b}"),
                window_left_us = remaining.as_micros() as u64,
                "sent"
            );
        }

        match self.serial.write_bytes(packet.as_bytes()) {
            Ok(()) => {
                self.stats.packets_sent += 1;
                self.stats.bytes_sent += packet.as_bytes().len() as u64;
            }
            Err(e) => self.record_write_failure(&e),
        }
        self.pacer.record_transmission(now, packet.size());
        Some(packet)
    }

    /// Deasserts our control lines and releases the input grab.
    ///
    /// Failures are logged; there is nothing left to do about them.
    pub fn shutdown(&mut self) {
        if let Err(e) = self.serial.set_output_lines(false) {
            warn!("failed to deassert RTS/DTR: {e}");
        }
        if let Err(e) = self.input.release() {
            warn!("failed to release input device: {e}");
        }
    }

    pub fn stats(&self) -> RelayStats {
        self.stats
    }

    pub fn state(&self) -> &MouseState {
        &self.state
    }

    pub fn identifier(&self) -> &Identifier {
        &self.identifier
    }

    pub fn serial(&self) -> &S {
        &self.serial
    }

    pub fn input(&self) -> &I {
        &self.input
    }

    pub fn serial_mut(&mut self) -> &mut S {
        &mut self.serial
    }

    pub fn input_mut(&mut self) -> &mut I {
        &mut self.input
    }

    fn record_write_failure(&mut self, error: &super::identify::TransportError) {
        self.stats.write_failures += 1;
        warn!("serial write failed, continuing: {error}");
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::identify::TransportError;
    use sermouse_core::{Axis, HostLines};
    use std::collections::VecDeque;

    // ── Minimal in-file fakes ─────────────────────────────────────────────────

    const LOW: HostLines = HostLines { cts: false, dsr: false };
    const REQUEST: HostLines = HostLines { cts: true, dsr: false };

    #[derive(Default)]
    struct RecordingLink {
        lines: VecDeque<HostLines>,
        writes: Vec<Vec<u8>>,
        outputs: Option<bool>,
        fail_writes: bool,
    }

    impl SerialLink for RecordingLink {
        fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
            if self.fail_writes {
                return Err(TransportError::Write(std::io::Error::new(
                    std::io::ErrorKind::BrokenPipe,
                    "injected failure",
                )));
            }
            self.writes.push(bytes.to_vec());
            Ok(())
        }

        fn read_host_lines(&mut self) -> Result<HostLines, TransportError> {
            Ok(self.lines.pop_front().unwrap_or(HostLines { cts: true, dsr: true }))
        }

        fn set_output_lines(&mut self, asserted: bool) -> Result<(), TransportError> {
            self.outputs = Some(asserted);
            Ok(())
        }
    }

    #[derive(Default)]
    struct QueueSource {
        events: VecDeque<MouseEvent>,
        released: bool,
    }

    impl MouseEventSource for QueueSource {
        fn next_event(&mut self) -> Result<Option<MouseEvent>, InputError> {
            Ok(self.events.pop_front())
        }

        fn discard_pending(&mut self) -> Result<usize, InputError> {
            let dropped = self.events.len();
            self.events.clear();
            Ok(dropped)
        }

        fn release(&mut self) -> Result<(), InputError> {
            self.released = true;
            Ok(())
        }
    }

    fn make_relay(wheel_enabled: bool) -> MouseRelay<RecordingLink, QueueSource> {
        let config = RelayConfig {
            wheel_enabled,
            ..RelayConfig::default()
        };
        MouseRelay::new(RecordingLink::default(), QueueSource::default(), config)
            .expect("default config is valid")
    }

    // ── Tests ─────────────────────────────────────────────────────────────────

    #[test]
    fn test_not_a_mouse_reports_what_the_adapter_found_missing() {
        let error = InputError::NotAMouse {
            path: "/dev/input/event7".into(),
            missing: "BTN_MIDDLE, REL_Y".into(),
        };

        assert_eq!(
            error.to_string(),
            "/dev/input/event7 does not look like a mouse (missing BTN_MIDDLE, REL_Y)"
        );
    }

    #[test]
    fn test_announce_discards_input_buffered_during_the_handshake() {
        // Arrange
        let mut relay = make_relay(true);
        relay.input.events.extend([
            MouseEvent::Motion { axis: Axis::X, delta: 9 },
            MouseEvent::Button { button: Button::Left, pressed: true },
        ]);
        let running = AtomicBool::new(true);
        relay.serial.lines.extend([LOW, LOW, REQUEST]);

        // Act
        let consumed = relay.tick(&running).unwrap();

        // Assert
        assert!(!consumed);
        assert!(relay.input().events.is_empty());
        assert_eq!(relay.serial().writes, vec![b"MZ".to_vec()]);
    }

    #[test]
    fn test_zero_baud_is_rejected() {
        let config = RelayConfig {
            baud_rate: 0,
            ..RelayConfig::default()
        };

        let result = MouseRelay::new(RecordingLink::default(), QueueSource::default(), config);

        assert!(matches!(result, Err(RelayError::Pacing(PacingError::ZeroBaudRate))));
    }

    #[test]
    fn test_click_is_flushed_immediately() {
        // Arrange
        let mut relay = make_relay(false);
        relay.handle_event(MouseEvent::Motion { axis: Axis::X, delta: 5 });
        relay.handle_event(MouseEvent::Motion { axis: Axis::X, delta: 3 });
        relay.handle_event(MouseEvent::Button { button: Button::Left, pressed: true });

        // Act
        let packet = relay.flush(Instant::now());

        // Assert
        assert_eq!(packet, Some(WirePacket::Short([0x60, 0x08, 0x00])));
        assert_eq!(relay.serial().writes, vec![vec![0x60, 0x08, 0x00]]);
        assert_eq!(relay.stats().packets_sent, 1);
        assert_eq!(relay.stats().bytes_sent, 3);
    }

    #[test]
    fn test_motion_waits_for_pacing_window() {
        // Arrange – the first window closes 22.5 ms after construction
        let before_construction = Instant::now();
        let mut relay = make_relay(true);
        relay.handle_event(MouseEvent::Motion { axis: Axis::Y, delta: -4 });

        // Act
        let early = relay.flush(before_construction);
        let later = relay.flush(before_construction + Duration::from_secs(1));

        // Assert
        assert_eq!(early, None);
        assert!(later.is_some());
        assert_eq!(relay.serial().writes.len(), 1);
    }

    #[test]
    fn test_middle_button_dropped_without_wheel_support() {
        let mut relay = make_relay(false);

        relay.handle_event(MouseEvent::Button { button: Button::Middle, pressed: true });

        assert!(!relay.state().middle());
        assert_eq!(relay.flush(Instant::now()), None);
    }

    #[test]
    fn test_middle_button_sends_four_bytes_with_wheel_support() {
        let mut relay = make_relay(true);

        relay.handle_event(MouseEvent::Button { button: Button::Middle, pressed: true });
        let packet = relay.flush(Instant::now());

        assert_eq!(packet, Some(WirePacket::Full([0x40, 0x00, 0x00, 0x10])));
    }

    #[test]
    fn test_write_failure_is_counted_and_loop_continues() {
        // Arrange
        let mut relay = make_relay(true);
        relay.serial.fail_writes = true;
        relay.handle_event(MouseEvent::Button { button: Button::Right, pressed: true });

        // Act
        let packet = relay.flush(Instant::now());

        // Assert – the window is still consumed so we do not resend forever
        assert!(packet.is_some());
        assert_eq!(relay.stats().write_failures, 1);
        assert_eq!(relay.stats().packets_sent, 0);
        assert_eq!(relay.flush(Instant::now()), None);
    }

    #[test]
    fn test_tick_consumes_one_event() {
        let mut relay = make_relay(true);
        relay.input.events.extend([
            MouseEvent::Button { button: Button::Left, pressed: true },
            MouseEvent::Button { button: Button::Left, pressed: false },
        ]);
        let running = AtomicBool::new(true);

        assert!(relay.tick(&running).unwrap());
        assert!(relay.tick(&running).unwrap());
        assert!(!relay.tick(&running).unwrap());

        assert_eq!(relay.serial().writes.len(), 2);
        assert_eq!(relay.serial().writes[0][0], 0x60);
        assert_eq!(relay.serial().writes[1][0], 0x40);
    }

    #[test]
    fn test_shutdown_deasserts_lines_and_releases_input() {
        let mut relay = make_relay(true);

        relay.shutdown();

        assert_eq!(relay.serial().outputs, Some(false));
        assert!(relay.input().released);
    }

    #[test]
    fn test_immediate_start_counts_identification() {
        let config = RelayConfig {
            immediate_ident: true,
            ..RelayConfig::default()
        };
        let mut relay =
            MouseRelay::new(RecordingLink::default(), QueueSource::default(), config).unwrap();

        relay.start();

        assert_eq!(relay.serial().writes, vec![b"MZ".to_vec()]);
        assert_eq!(relay.stats().identifications, 1);
    }
}
