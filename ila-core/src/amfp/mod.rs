//! Address Mapping Forwarder Protocol: wire codec, connection framing,
//! router listener, and forwarder dialer.

mod connections;
mod forwarder;
mod framer;
mod handlers;
mod router;
mod wire;

pub use connections::{ConnectionHandle, ConnectionSlots};
pub use forwarder::{run_forwarder, MAX_ROUTERS};
pub use framer::Framer;
pub use handlers::{handle_map_info, handle_map_request};
pub use router::{redirect_message, run_router};
pub use wire::{AmfpMessage, IDLOC_TYPE_IPV6_ADDR, SUB_TYPE_MAP_REPLY, SUB_TYPE_REDIRECT};
