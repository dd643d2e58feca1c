//! Multiplexed binary RPC over a single WebSocket connection.
//!
//! wsrpc lets a browser-style client invoke named server-side operations
//! over one persistent binary connection in three interaction shapes:
//! one-shot request/response, server-to-client streaming, and full
//! bidirectional streaming, all multiplexed by correlation id.
//!
//! # Crate Structure
//!
//! - [`wire`] — Packet model, MessagePack codec, shared reply type
//! - [`server`] — Endpoint registry, protocol dispatcher, broadcast
//! - [`client`] — Request multiplexer, lifecycle state machine, event bus

/// Re-export wire types.
pub mod wire {
    pub use wsrpc_wire::*;
}

/// Re-export server types.
pub mod server {
    pub use wsrpc_server::*;
}

/// Re-export client types.
pub mod client {
    pub use wsrpc_client::*;
}
