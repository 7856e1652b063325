//! Scripted serial link for tests.
//!
//! # Why a scripted link?
//!
//! The real link needs a tty and a host on the other end toggling RTS/DTR.
//! `ScriptedSerialLink` replays a fixed list of control-line readings (a
//! `None` entry simulates a failed read) and records every write, so tests
//! can play the host's side of the handshake and then inspect exactly which
//! bytes went out.
//!
//! Once the script runs out, reads return [`ScriptedSerialLink::idle_lines`]
//! (both lines high by default: a host that is up and not resetting).

use std::collections::VecDeque;

use sermouse_core::HostLines;

use crate::application::identify::{SerialLink, TransportError};

/// A serial link that replays control-line readings and records writes.
pub struct ScriptedSerialLink {
    script: VecDeque<Option<HostLines>>,
    /// Lines reported after the script is exhausted.
    pub idle_lines: HostLines,
    /// Every `write_bytes` call, in order.
    pub writes: Vec<Vec<u8>>,
    /// Number of control-line reads performed.
    pub line_reads: usize,
    /// Last value passed to `set_output_lines`.
    pub outputs_asserted: Option<bool>,
    /// When `true`, every write fails with a broken-pipe error.
    pub fail_writes: bool,
}

impl ScriptedSerialLink {
    /// Creates a link with an empty script and the host lines high.
    pub fn new() -> Self {
        Self {
            script: VecDeque::new(),
            idle_lines: HostLines { cts: true, dsr: true },
            writes: Vec::new(),
            line_reads: 0,
            outputs_asserted: None,
            fail_writes: false,
        }
    }

    /// Creates a link that replays `readings` before going idle.
    pub fn with_lines<T>(readings: T) -> Self
    where
        T: IntoIterator<Item = Option<HostLines>>,
    {
        let mut link = Self::new();
        link.script.extend(readings);
        link
    }

    /// Appends more readings to the script.
    pub fn push_lines<T>(&mut self, readings: T)
    where
        T: IntoIterator<Item = Option<HostLines>>,
    {
        self.script.extend(readings);
    }

    /// All written bytes concatenated, as the host would receive them.
    pub fn wire(&self) -> Vec<u8> {
        self.writes.concat()
    }
}

impl Default for ScriptedSerialLink {
    fn default() -> Self {
        Self::new()
    }
}

impl SerialLink for ScriptedSerialLink {
    fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        if self.fail_writes {
            return Err(TransportError::Write(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "mock failure",
            )));
        }
        self.writes.push(bytes.to_vec());
        Ok(())
    }

    fn read_host_lines(&mut self) -> Result<HostLines, TransportError> {
        self.line_reads += 1;
        match self.script.pop_front() {
            Some(Some(lines)) => Ok(lines),
            Some(None) => Err(TransportError::ControlLines("mock failure".into())),
            None => Ok(self.idle_lines),
        }
    }

    fn set_output_lines(&mut self, asserted: bool) -> Result<(), TransportError> {
        self.outputs_asserted = Some(asserted);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LOW: HostLines = HostLines { cts: false, dsr: false };

    #[test]
    fn test_script_is_replayed_then_idle_lines() {
        // Arrange
        let mut link = ScriptedSerialLink::with_lines([Some(LOW), None]);

        // Act
        let first = link.read_host_lines();
        let second = link.read_host_lines();
        let third = link.read_host_lines();

        // Assert
        assert_eq!(first.unwrap(), LOW);
        assert!(matches!(second, Err(TransportError::ControlLines(_))));
        assert_eq!(third.unwrap(), HostLines { cts: true, dsr: true });
        assert_eq!(link.line_reads, 3);
    }

    #[test]
    fn test_writes_are_recorded_in_order() {
        let mut link = ScriptedSerialLink::new();

        link.write_bytes(b"MZ").unwrap();
        link.write_bytes(&[0x40, 0x01, 0x02]).unwrap();

        assert_eq!(link.writes.len(), 2);
        assert_eq!(link.wire(), vec![b'M', b'Z', 0x40, 0x01, 0x02]);
    }

    #[test]
    fn test_fail_writes_returns_error_and_records_nothing() {
        let mut link = ScriptedSerialLink::new();
        link.fail_writes = true;

        let result = link.write_bytes(&[0x40]);

        assert!(matches!(result, Err(TransportError::Write(_))));
        assert!(link.writes.is_empty());
    }
}
