//! HID mouse input sources.
//!
//! On Linux the mouse is read from an evdev node (`/dev/input/eventN`) by
//! [`linux::EvdevMouse`].  [`mock::ScriptedMouseSource`] replays a fixed list
//! of polls for tests and works on every platform.

#[cfg(target_os = "linux")]
pub mod linux;
pub mod mock;

#[cfg(target_os = "linux")]
pub use linux::EvdevMouse;
