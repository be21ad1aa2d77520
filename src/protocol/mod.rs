//! Combat packets: opcodes, little-endian buffers and the structured
//! messages exchanged with the network layer.

pub mod inbound;
pub mod opcodes;
pub mod outbound;
pub mod packet;

pub use inbound::{parse_inbound, InboundEvent};
pub use outbound::Outbound;
pub use packet::{PacketBuilder, PacketError, PacketReader};
