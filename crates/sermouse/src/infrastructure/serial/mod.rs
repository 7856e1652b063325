//! Serial transport implementations.
//!
//! [`port::SerialPortLink`] drives a real tty; [`mock::ScriptedSerialLink`]
//! replays scripted control-line readings and records writes for tests.

pub mod mock;
pub mod port;

pub use port::SerialPortLink;
