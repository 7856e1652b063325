//! Wire format of the Microsoft / IntelliMouse serial protocol.

pub mod ident;
pub mod packet;

pub use ident::Identification;
pub use packet::{PacketSize, WirePacket};
