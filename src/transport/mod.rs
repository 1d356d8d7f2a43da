//! WebSocket transport
//!
//! Delivers `start`/`advance` triggers to the orchestrator and forwards each
//! resulting chat event to the viewer as a `message-produced` frame.

mod protocol;
mod server;

pub use protocol::{ClientMessage, ServerMessage};
pub use server::RelayServer;
