//! Packet model and binary codec for the wsrpc protocol.
//!
//! Every message crossing a connection is one [`Packet`], MessagePack-encoded
//! as a field-name map so browser peers can decode it with any msgpack
//! library. Structured payloads ride inside [`Packet::bytes`] encoded with the
//! same codec, which means nested binary needs no escaping or re-framing.

pub mod close_code;
pub mod codec;
pub mod error;
pub mod packet;
pub mod reply;

pub use codec::{decode, decode_value, encode, encode_value};
pub use error::{Result, WireError};
pub use packet::{random_id, Code, Packet, EVENT_ID, MAX_ID};
pub use reply::Reply;
