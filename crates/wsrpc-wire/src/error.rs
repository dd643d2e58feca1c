/// Errors that can occur while encoding or decoding packets.
#[derive(Debug, thiserror::Error)]
pub enum WireError {
    /// Value could not be serialized to MessagePack.
    #[error("encode error: {0}")]
    Encode(#[from] rmp_serde::encode::Error),

    /// Bytes could not be deserialized.
    ///
    /// This is a per-message failure. Dispatchers report it and keep the
    /// connection alive.
    #[error("decode error: {0}")]
    Decode(#[from] rmp_serde::decode::Error),

    /// Correlation id exceeds the 31-bit range shared with browser peers.
    #[error("correlation id {0} out of 31-bit range")]
    IdOutOfRange(u32),
}

pub type Result<T> = std::result::Result<T, WireError>;
