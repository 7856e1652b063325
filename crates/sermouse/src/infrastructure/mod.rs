//! Infrastructure layer for the adaptor.
//!
//! **Dependency rule**: this layer may depend on `application` and
//! `sermouse_core`, but MUST NOT be imported by the `application` layer.
//!
//! # Sub-modules
//!
//! - **`serial`** – `SerialLink` over a real tty (via `serialport`), plus a
//!   scripted mock for tests.
//! - **`input`** – `MouseEventSource` over a Linux evdev node, plus a
//!   scripted mock for tests.  The evdev implementation is only compiled on
//!   Linux.
//! - **`config`** – Optional TOML configuration file and its resolution into
//!   runtime settings.

pub mod config;
pub mod input;
pub mod serial;
