//! Linux evdev mouse source.
//!
//! # What is evdev? (for beginners)
//!
//! The Linux input subsystem exposes every input device as a character device
//! under `/dev/input/`.  Reading it yields fixed-size `input_event` records:
//! a type (`EV_REL` for relative motion, `EV_KEY` for buttons), a code
//! (`REL_X`, `BTN_LEFT`, ...) and a value (the delta, or 1/0 for press and
//! release).  The `evdev` crate wraps the ioctls and the record parsing.
//!
//! # Exclusive grab
//!
//! `EVIOCGRAB` stops the kernel from also delivering our mouse's events to
//! the local console or X server, so moving the mouse does not move the
//! pointer on the machine running the adaptor.  The grab is released on
//! [`MouseEventSource::release`] and again, if still held, on drop.

use std::collections::VecDeque;
use std::io;
use std::os::unix::io::{AsRawFd, RawFd};

use evdev::{Device, InputEvent, InputEventKind, Key, RelativeAxisType};
use nix::fcntl::{fcntl, FcntlArg, OFlag};
use sermouse_core::{Axis, Button, MouseEvent};
use tracing::{debug, info, warn};

use crate::application::relay::{InputError, MouseEventSource};

/// Key event value the kernel sends while a key is held down.
const KEY_AUTOREPEAT: i32 = 2;

/// A mouse read from a Linux event device.
pub struct EvdevMouse {
    device: Device,
    path: String,
    queue: VecDeque<MouseEvent>,
    grabbed: bool,
}

impl EvdevMouse {
    /// Opens `path`, checks that it is a mouse, switches it to non-blocking
    /// reads and, when `exclusive` is set, grabs it.
    ///
    /// # Errors
    ///
    /// - [`InputError::Open`] if the node cannot be opened or configured.
    /// - [`InputError::NotAMouse`] if it lacks relative X/Y or the three
    ///   standard buttons.
    /// - [`InputError::Grab`] if the exclusive grab is refused.
    pub fn open(path: &str, exclusive: bool) -> Result<Self, InputError> {
        let open_error = |source| InputError::Open {
            path: path.to_string(),
            source,
        };

        let mut device = Device::open(path).map_err(open_error)?;
        let missing = missing_capabilities(&device);
        if !missing.is_empty() {
            return Err(InputError::NotAMouse {
                path: path.to_string(),
                missing: missing.join(", "),
            });
        }
        set_nonblocking(device.as_raw_fd()).map_err(open_error)?;

        if exclusive {
            device.grab().map_err(InputError::Grab)?;
        }

        info!(
            path,
            name = device.name().unwrap_or("unknown"),
            exclusive,
            "input device opened"
        );
        Ok(Self {
            device,
            path: path.to_string(),
            queue: VecDeque::new(),
            grabbed: exclusive,
        })
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

impl MouseEventSource for EvdevMouse {
    fn next_event(&mut self) -> Result<Option<MouseEvent>, InputError> {
        if let Some(event) = self.queue.pop_front() {
            return Ok(Some(event));
        }

        match self.device.fetch_events() {
            Ok(events) => self.queue.extend(events.filter_map(|e| translate(&e))),
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => return Ok(None),
            Err(e) => return Err(InputError::Read(e)),
        }
        Ok(self.queue.pop_front())
    }

    fn discard_pending(&mut self) -> Result<usize, InputError> {
        let mut dropped = self.queue.len();
        self.queue.clear();
        loop {
            match self.device.fetch_events() {
                Ok(events) => dropped += events.filter_map(|e| translate(&e)).count(),
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => return Ok(dropped),
                Err(e) => return Err(InputError::Read(e)),
            }
        }
    }

    fn release(&mut self) -> Result<(), InputError> {
        if self.grabbed {
            self.device.ungrab().map_err(InputError::Grab)?;
            self.grabbed = false;
            debug!(path = %self.path, "input grab released");
        }
        Ok(())
    }
}

impl Drop for EvdevMouse {
    fn drop(&mut self) {
        if let Err(e) = self.release() {
            warn!("failed to release input device on drop: {e}");
        }
    }
}

/// Maps one raw evdev record to a mouse event.
///
/// Synchronisation reports, unrelated axes and key autorepeat are dropped.
pub fn translate(event: &InputEvent) -> Option<MouseEvent> {
    match event.kind() {
        InputEventKind::RelAxis(axis) => {
            let delta = event.value();
            if axis == RelativeAxisType::REL_X {
                Some(MouseEvent::Motion { axis: Axis::X, delta })
            } else if axis == RelativeAxisType::REL_Y {
                Some(MouseEvent::Motion { axis: Axis::Y, delta })
            } else if axis == RelativeAxisType::REL_WHEEL {
                Some(MouseEvent::Wheel { delta })
            } else {
                None
            }
        }
        InputEventKind::Key(key) => {
            if event.value() == KEY_AUTOREPEAT {
                return None;
            }
            let button = if key == Key::BTN_LEFT {
                Button::Left
            } else if key == Key::BTN_RIGHT {
                Button::Right
            } else if key == Key::BTN_MIDDLE {
                Button::Middle
            } else {
                return None;
            };
            Some(MouseEvent::Button {
                button,
                pressed: event.value() != 0,
            })
        }
        _ => None,
    }
}

/// Capabilities a device must report to be driven as a serial mouse.
const REQUIRED_AXES: [(RelativeAxisType, &str); 2] = [
    (RelativeAxisType::REL_X, "REL_X"),
    (RelativeAxisType::REL_Y, "REL_Y"),
];
const REQUIRED_BUTTONS: [(Key, &str); 3] = [
    (Key::BTN_LEFT, "BTN_LEFT"),
    (Key::BTN_MIDDLE, "BTN_MIDDLE"),
    (Key::BTN_RIGHT, "BTN_RIGHT"),
];

/// Names of the required capabilities the device lacks.
fn missing_capabilities(device: &Device) -> Vec<&'static str> {
    let axes = device.supported_relative_axes();
    let keys = device.supported_keys();
    let missing_axes = REQUIRED_AXES
        .iter()
        .filter(|(axis, _)| !axes.is_some_and(|set| set.contains(*axis)))
        .map(|(_, name)| *name);
    let missing_buttons = REQUIRED_BUTTONS
        .iter()
        .filter(|(key, _)| !keys.is_some_and(|set| set.contains(*key)))
        .map(|(_, name)| *name);
    missing_axes.chain(missing_buttons).collect()
}

fn set_nonblocking(fd: RawFd) -> io::Result<()> {
    let flags = OFlag::from_bits_truncate(fcntl(fd, FcntlArg::F_GETFL)?);
    fcntl(fd, FcntlArg::F_SETFL(flags | OFlag::O_NONBLOCK))?;
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
