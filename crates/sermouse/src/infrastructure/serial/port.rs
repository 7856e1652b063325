//! `SerialLink` over a real RS-232 port, using the `serialport` crate.
//!
//! # Line settings
//!
//! The Microsoft serial mouse talks 1200 baud, 7 data bits, no parity, one
//! stop bit, with no flow control: the control lines are not used for flow
//! control but for powering and resetting the mouse.  RTS and DTR are raised
//! as soon as the port is open, the same as a real mouse drawing power from
//! them.
//!
//! # Byte ordering
//!
//! Each byte is handed to the driver with its own `write` call.  The port is
//! unbuffered on our side, so the kernel sees the bytes strictly in packet
//! order and a short write can never split a byte pair.

use std::io::Write;
use std::time::Duration;

use serialport::{DataBits, FlowControl, Parity, SerialPort, StopBits};
use sermouse_core::HostLines;
use tracing::info;

use crate::application::identify::{SerialLink, TransportError};

/// Read timeout applied to the port; we never read payload data.
const PORT_TIMEOUT: Duration = Duration::from_millis(500);

/// A serial mouse line on a real tty.
pub struct SerialPortLink {
    port: Box<dyn SerialPort>,
    path: String,
}

impl SerialPortLink {
    /// Opens `path` as a 7N1 port at `baud_rate` and raises RTS/DTR.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Open`] if the device cannot be opened or
    /// configured, and [`TransportError::ControlLines`] if RTS/DTR cannot be
    /// raised.
    pub fn open(path: &str, baud_rate: u32) -> Result<Self, TransportError> {
        let port = serialport::new(path, baud_rate)
            .data_bits(DataBits::Seven)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .timeout(PORT_TIMEOUT)
            .open()
            .map_err(|e| TransportError::Open {
                path: path.to_string(),
                reason: e.to_string(),
            })?;

        let mut link = Self {
            port,
            path: path.to_string(),
        };
        link.set_output_lines(true)?;
        info!(path, baud_rate, "serial port opened (7N1, RTS/DTR raised)");
        Ok(link)
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

impl SerialLink for SerialPortLink {
    fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        for byte in bytes {
            self.port
                .write_all(std::slice::from_ref(byte))
                .map_err(TransportError::Write)?;
        }
        Ok(())
    }

    fn read_host_lines(&mut self) -> Result<HostLines, TransportError> {
        let cts = self
            .port
            .read_clear_to_send()
            .map_err(|e| TransportError::ControlLines(format!("CTS: {e}")))?;
        let dsr = self
            .port
            .read_data_set_ready()
            .map_err(|e| TransportError::ControlLines(format!("DSR: {e}")))?;
        Ok(HostLines { cts, dsr })
    }

    fn set_output_lines(&mut self, asserted: bool) -> Result<(), TransportError> {
        self.port
            .write_request_to_send(asserted)
            .map_err(|e| TransportError::ControlLines(format!("RTS: {e}")))?;
        self.port
            .write_data_terminal_ready(asserted)
            .map_err(|e| TransportError::ControlLines(format!("DTR: {e}")))?;
        Ok(())
    }
}
