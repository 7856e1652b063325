//! Stateful pieces of the serial mouse control loop.
//!
//! Nothing in this module touches a device.  All three structures are created
//! once at startup and mutated only by the single control loop, so none of
//! them need interior mutability or locking.

/// Motion/button accumulator.
pub mod mouse_state;

/// Baud-paced transmission scheduler.
pub mod pacing;

/// Identification handshake state machine.
pub mod handshake;
