//! Identification strings sent after the host resets the mouse driver.
//!
//! The first byte is always `M`.  A second byte selects the protocol
//! extension: none for the plain Microsoft 2-button protocol, `Z` for the
//! IntelliMouse wheel extension.

/// Which serial mouse variant we announce to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Identification {
    /// Plain Microsoft protocol, 3-byte packets only.
    Microsoft,
    /// Microsoft IntelliMouse: optional 4th byte with middle button and wheel.
    IntelliMouse,
}

impl Identification {
    /// Picks the variant matching the wheel-support setting.
    pub fn for_wheel(wheel_enabled: bool) -> Self {
        if wheel_enabled {
            Self::IntelliMouse
        } else {
            Self::Microsoft
        }
    }

    /// Bytes written to the serial line, in order.
    pub fn as_bytes(self) -> &'static [u8] {
        match self {
            Self::Microsoft => b"M",
            Self::IntelliMouse => b"MZ",
        }
    }
}
