//! Application layer of the adaptor.
//!
//! - **`identify`** – Runs the identification handshake against a
//!   [`identify::SerialLink`]: watches the host's control lines and writes
//!   `M` / `MZ` when the host resets its mouse driver.
//!
//! - **`relay`** – The control loop: polls a [`relay::MouseEventSource`],
//!   accumulates, paces and transmits packets.
//!
//! Both ports (`SerialLink`, `MouseEventSource`) are traits so the loop can
//! be exercised without a tty or an input device.

pub mod identify;
pub mod relay;
