//! Motion/button accumulator.
//!
//! Folds a stream of relative-motion, wheel and button events into a single
//! pending update between transmissions.
//!
//! # Accumulation window (for beginners)
//!
//! A modern USB mouse reports at 125–1000 Hz; a 1200 baud serial mouse can
//! physically send at most ~44 packets per second.  Instead of dropping
//! events, the control loop *adds up* every delta that arrives between two
//! transmissions.  The period between two transmissions is the accumulation
//! window: it starts empty, grows with each event, and is cleared by
//! [`MouseState::reset`] once the packet has gone out.
//!
//! Buttons are different: they are *latched* levels, not deltas.  A reset
//! never touches them, so a held button stays held across windows.
//!
//! # Escalation
//!
//! [`PendingLevel`] records how big the next packet must be.  It only ever
//! goes up within a window (`None → Short → Full`): once something that needs
//! the 4-byte form has happened, a later plain motion event must not shrink
//! the packet back to 3 bytes.

use tracing::trace;

use crate::protocol::packet::{PacketSize, WirePacket};

/// Largest magnitude an axis delta may reach within one window.
pub const AXIS_LIMIT: i32 = 127;

/// Largest magnitude the wheel delta may reach within one window.
pub const WHEEL_LIMIT: i32 = 15;

/// Relative motion axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
}

/// Mouse button reported by the protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Button {
    Left,
    Right,
    Middle,
}

/// One discrete event from the HID input source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseEvent {
    /// Relative motion on one axis.
    Motion { axis: Axis, delta: i32 },
    /// Vertical wheel detents.
    Wheel { delta: i32 },
    /// A button transition (`pressed = false` is a release).
    Button { button: Button, pressed: bool },
}

/// How much of the packet the next transmission needs.
///
/// The derive order gives `None < Short < Full`, so escalation is `max`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub enum PendingLevel {
    /// Nothing to send.
    #[default]
    None,
    /// A 3-byte update is enough.
    Short,
    /// The 4-byte IntelliMouse form is required.
    Full,
}

impl PendingLevel {
    /// Packet size to transmit for this level, or `None` when idle.
    pub fn packet_size(self) -> Option<PacketSize> {
        match self {
            Self::None => None,
            Self::Short => Some(PacketSize::Short),
            Self::Full => Some(PacketSize::Full),
        }
    }
}

/// Accumulated mouse state for the current window.
///
/// Owned exclusively by the control loop and passed by `&mut`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MouseState {
    dx: i8,
    dy: i8,
    wheel: i8,
    left: bool,
    right: bool,
    middle: bool,
    pending: PendingLevel,
    force_send: bool,
    wheel_enabled: bool,
}

impl MouseState {
    /// Creates an empty state.
    ///
    /// `wheel_enabled` selects the IntelliMouse behaviour: wheel deltas then
    /// escalate to a 4-byte update and force an immediate send.
    pub fn new(wheel_enabled: bool) -> Self {
        Self {
            dx: 0,
            dy: 0,
            wheel: 0,
            left: false,
            right: false,
            middle: false,
            pending: PendingLevel::None,
            force_send: false,
            wheel_enabled,
        }
    }

    /// Adds `delta` to one axis and clamps the sum to ±[`AXIS_LIMIT`].
    pub fn apply_motion(&mut self, axis: Axis, delta: i32) {
        let slot = match axis {
            Axis::X => &mut self.dx,
            Axis::Y => &mut self.dy,
        };
        *slot = clamp_to_i8(i32::from(*slot).saturating_add(delta), AXIS_LIMIT);
        self.push_update(false);
    }

    /// Adds `delta` to the wheel and clamps the sum to ±[`WHEEL_LIMIT`].
    ///
    /// With wheel support disabled the value is accumulated but never
    /// requests a packet: the basic protocol has nowhere to put it.
    pub fn apply_wheel(&mut self, delta: i32) {
        self.wheel = clamp_to_i8(i32::from(self.wheel).saturating_add(delta), WHEEL_LIMIT);
        if self.wheel_enabled {
            self.force_send = true;
            self.push_update(true);
        }
    }

    /// Latches a button level and forces the next evaluation to transmit.
    ///
    /// A middle-button change can only be expressed in the 4-byte form.
    pub fn apply_button(&mut self, button: Button, pressed: bool) {
        match button {
            Button::Left => self.left = pressed,
            Button::Right => self.right = pressed,
            Button::Middle => self.middle = pressed,
        }
        self.force_send = true;
        self.push_update(button == Button::Middle);
    }

    /// Dispatches one input event to the matching `apply_*` operation.
    pub fn apply(&mut self, event: MouseEvent) {
        match event {
            MouseEvent::Motion { axis, delta } => self.apply_motion(axis, delta),
            MouseEvent::Wheel { delta } => self.apply_wheel(delta),
            MouseEvent::Button { button, pressed } => self.apply_button(button, pressed),
        }
    }

    /// Ends the accumulation window.
    ///
    /// Clears motion, wheel, the force flag and the pending level; latched
    /// button states survive.
    pub fn reset(&mut self) {
        self.dx = 0;
        self.dy = 0;
        self.wheel = 0;
        self.force_send = false;
        self.pending = PendingLevel::None;
    }

    /// Encodes the pending update and starts a fresh window.
    ///
    /// Returns `None` (and leaves the state untouched) when nothing is
    /// pending.
    pub fn take_packet(&mut self) -> Option<WirePacket> {
        let size = self.pending.packet_size()?;
        let packet = WirePacket::encode(self, size);
        self.reset();
        Some(packet)
    }

    /// Escalates the pending level, never lowering it.
    ///
    /// While the middle button is held every update has to be 4 bytes long:
    /// an IntelliMouse host reads a missing fourth byte as "middle released".
    fn push_update(&mut self, full_packet: bool) {
        let wanted = if full_packet || self.middle {
            PendingLevel::Full
        } else {
            PendingLevel::Short
        };
        let escalated = self.pending.max(wanted);
        if escalated != self.pending {
            trace!(from = ?self.pending, to = ?escalated, "pending level escalated");
        }
        self.pending = escalated;
    }

    pub fn dx(&self) -> i8 {
        self.dx
    }

    pub fn dy(&self) -> i8 {
        self.dy
    }

    pub fn wheel(&self) -> i8 {
        self.wheel
    }

    pub fn left(&self) -> bool {
        self.left
    }

    pub fn right(&self) -> bool {
        self.right
    }

    pub fn middle(&self) -> bool {
        self.middle
    }

    /// Size the next packet must have.
    pub fn pending_level(&self) -> PendingLevel {
        self.pending
    }

    /// `true` when a button or wheel change must bypass the pacing gate.
    pub fn force_send(&self) -> bool {
        self.force_send
    }

    pub fn wheel_enabled(&self) -> bool {
        self.wheel_enabled
    }
}

fn clamp_to_i8(value: i32, limit: i32) -> i8 {
    // `limit` is at most 127, so the clamped value always fits.
    value.clamp(-limit, limit) as i8
}

// ── Tests ─────────────────────────────────────────────────────────────────────
