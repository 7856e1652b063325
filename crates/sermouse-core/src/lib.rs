//! # sermouse-core
//!
//! Protocol core for emulating a legacy RS-232 serial mouse (Microsoft /
//! IntelliMouse family) from a modern relative pointing device.
//!
//! This crate has zero dependencies on OS APIs, device nodes, or serial ports.
//! Everything in here can be driven with plain values and `Instant`s, which
//! is what makes the bit layout and the timing rules unit-testable.
//!
//! # Architecture overview (for beginners)
//!
//! A serial mouse is a tiny device: every time something changes it sends a
//! 3-byte (or 4-byte, with a wheel) packet down a 1200 baud line.  Before the
//! host driver accepts any packet it toggles the RS-232 control lines and the
//! mouse answers with an identification string.
//!
//! The crate is split the same way the problem is:
//!
//! - **`domain`** – The stateful pieces of the control loop:
//!   - `mouse_state` folds raw motion/button/wheel events into one pending
//!     update (the *accumulator*).
//!   - `pacing` decides when the pending update may leave, so the emulated
//!     device never outruns the wire's real byte rate.
//!   - `handshake` tracks the host's control lines and says when to announce
//!     ourselves.
//!
//! - **`protocol`** – What the bytes look like:
//!   - `packet` renders a `MouseState` into the exact 3/4-byte layout.
//!   - `ident` holds the identification strings (`"M"` / `"MZ"`).

pub mod domain;
pub mod protocol;

// Re-export the most-used types at the crate root so callers can write
// `sermouse_core::MouseState` instead of the full module path.
pub use domain::handshake::{Handshake, HandshakeState, HandshakeStep, HostLines};
pub use domain::mouse_state::{Axis, Button, MouseEvent, MouseState, PendingLevel};
pub use domain::pacing::{BaudPacer, PacingError, DEFAULT_BAUD_RATE};
pub use protocol::ident::Identification;
pub use protocol::packet::{PacketSize, WirePacket};
