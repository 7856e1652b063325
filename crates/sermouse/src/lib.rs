//! sermouse library entry point.
//!
//! Re-exports all public modules so that integration tests in `tests/`
//! and the binary entry point in `main.rs` share the same module tree.
//!
//! # What does sermouse do? (for beginners)
//!
//! Vintage PCs often have no USB and no PS/2 mouse port, only an RS-232
//! serial port.  sermouse runs on a small Linux box (a Raspberry Pi with a
//! USB-to-serial adaptor, for example) that sits between a modern USB mouse
//! and the old machine:
//!
//! 1. Opens the USB mouse's `/dev/input/event*` node, optionally grabbing it
//!    so the Linux desktop does not also react to it.
//! 2. Opens the serial port at 1200 baud, 7N1, and raises RTS/DTR.
//! 3. Watches the old PC's control lines and answers its driver's reset with
//!    the identification string `M` or `MZ`.
//! 4. Turns the mouse's motion, buttons and wheel into 3/4-byte Microsoft /
//!    IntelliMouse packets, never faster than a real 1200 baud mouse could
//!    have sent them.

/// Application layer: control loop and handshake driver.
pub mod application;

/// Infrastructure layer: serial port, input device and configuration.
pub mod infrastructure;
