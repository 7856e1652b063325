//! Wire-packet encoder for the Microsoft / IntelliMouse serial protocol.
//!
//! Wire format (7 data bits per byte, bit 6 is the sync marker):
//! ```text
//! byte 0: [ 1 | L | R | dy7 dy6 | dx7 dx6 ]
//! byte 1: [ 0 | dx5 .. dx0 ]
//! byte 2: [ 0 | dy5 .. dy0 ]
//! byte 3: [ 0 | 0 | M | wheel3 .. wheel0 ]   (IntelliMouse extension only)
//! ```
//!
//! # Why bit-exact matters (for beginners)
//!
//! The host's mouse driver re-synchronises on the sync bit of byte 0 and then
//! blindly reassembles the following bytes.  There is no checksum and no
//! retransmission: a bit in the wrong place shows up as a phantom click or a
//! cursor jump on the legacy machine.  Everything here is therefore a pure
//! function of the accumulated state.
//!
//! # Axis split
//!
//! Each 8-bit two's-complement delta is split into its two most significant
//! bits (carried in byte 0) and its six least significant bits (bytes 1/2).
//! The receiver recombines them as `(hi << 6) | lo`.
//!
//! # Wheel polarity
//!
//! The nibble carries the *negated* wheel delta, so a positive input delta
//! and a negative one land in opposite halves of the 4-bit range.

use crate::domain::mouse_state::MouseState;

/// Sync marker present in byte 0 of every packet (and only there).
pub const SYNC_BIT: u8 = 0x40;

/// Bit position of the left button in byte 0.
pub const LEFT_BUTTON_BIT: u8 = 5;

/// Bit position of the right button in byte 0.
pub const RIGHT_BUTTON_BIT: u8 = 4;

/// Bit position of the middle button in byte 3.
pub const MIDDLE_BUTTON_BIT: u8 = 4;

/// Mask for the low six bits of an axis delta.
const LOW_BITS_MASK: u8 = 0x3F;

/// Mask for the high two bits of an axis delta.
const HIGH_BITS_MASK: u8 = 0xC0;

/// Mask for the wheel nibble in byte 3.
const WHEEL_MASK: u8 = 0x0F;

/// Number of bytes transmitted for one update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PacketSize {
    /// Classic 3-byte Microsoft packet: motion plus left/right buttons.
    Short,
    /// 4-byte IntelliMouse packet: adds the middle button and wheel nibble.
    Full,
}

impl PacketSize {
    /// Number of bytes that go on the wire for this size.
    pub const fn byte_len(self) -> usize {
        match self {
            Self::Short => 3,
            Self::Full => 4,
        }
    }
}

/// An encoded, ready-to-send update.
///
/// The variant fixes the length, so a 3-byte update can never accidentally
/// leak a stale fourth byte onto the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WirePacket {
    /// 3-byte Microsoft update.
    Short([u8; 3]),
    /// 4-byte IntelliMouse update.
    Full([u8; 4]),
}

impl WirePacket {
    /// Renders `state` into the wire layout for the given size.
    ///
    /// Inputs are always in range because the accumulator clamps on every
    /// update, so this cannot fail.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use sermouse_core::{Axis, Button, MouseState, PacketSize, WirePacket};
    ///
    /// let mut state = MouseState::new(false);
    /// state.apply_motion(Axis::X, 8);
    /// state.apply_button(Button::Left, true);
    ///
    /// let packet = WirePacket::encode(&state, PacketSize::Short);
    /// assert_eq!(packet.as_bytes(), &[0x60, 0x08, 0x00]);
    /// ```
    pub fn encode(state: &MouseState, size: PacketSize) -> Self {
        let dx = state.dx() as u8;
        let dy = state.dy() as u8;

        let mut head = SYNC_BIT;
        head |= u8::from(state.left()) << LEFT_BUTTON_BIT;
        head |= u8::from(state.right()) << RIGHT_BUTTON_BIT;
        head |= (dy & HIGH_BITS_MASK) >> 4;
        head |= (dx & HIGH_BITS_MASK) >> 6;

        let short = [head, dx & LOW_BITS_MASK, dy & LOW_BITS_MASK];

        match size {
            PacketSize::Short => Self::Short(short),
            PacketSize::Full => {
                let wheel = state.wheel().wrapping_neg() as u8 & WHEEL_MASK;
                let tail = (u8::from(state.middle()) << MIDDLE_BUTTON_BIT) | wheel;
                Self::Full([short[0], short[1], short[2], tail])
            }
        }
    }

    /// The bytes to put on the wire, in transmission order.
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Short(bytes) => bytes,
            Self::Full(bytes) => bytes,
        }
    }

    /// Size variant of this packet.
    pub fn size(&self) -> PacketSize {
        match self {
            Self::Short(_) => PacketSize::Short,
            Self::Full(_) => PacketSize::Full,
        }
    }
}

/// Reassembles an axis delta from its wire halves, as the host driver does.
///
/// Used by diagnostics and tests to check that the split is lossless.
pub fn recombine_axis(high_bits: u8, low_bits: u8) -> i8 {
    (((high_bits & 0x03) << 6) | (low_bits & LOW_BITS_MASK)) as i8
}

// ── Tests ─────────────────────────────────────────────────────────────────────
