use serde::{Deserialize, Serialize};

use crate::codec;
use crate::error::Result;

/// Typed outcome of a one-shot exchange.
///
/// Failures cross the wire as data, not exceptions: a handler that rejects
/// still answers with a `Reply` whose `is_ok` is false. Field names stay
/// camelCase for browser peers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reply {
    #[serde(rename = "isOk")]
    pub is_ok: bool,
    pub result: String,
    #[serde(default)]
    pub stack: Vec<String>,
}

impl Reply {
    /// Successful reply.
    pub fn ok(result: impl Into<String>) -> Self {
        Self {
            is_ok: true,
            result: result.into(),
            stack: Vec::new(),
        }
    }

    /// Failed reply with an origin trail.
    pub fn nok(result: impl Into<String>, stack: Vec<String>) -> Self {
        Self {
            is_ok: false,
            result: result.into(),
            stack,
        }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        codec::encode_value(self)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        codec::decode_value(bytes)
    }

    /// Lenient decode for error payloads arriving from arbitrary peers.
    /// Anything unreadable becomes a failed reply rather than a decode error.
    pub fn from_optional(bytes: Option<&[u8]>) -> Self {
        match bytes {
            Some(raw) => Self::from_bytes(raw)
                .unwrap_or_else(|_| Self::nok("N/A", vec!["undecodable error payload".into()])),
            None => Self::nok("N/A", Vec::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reply_roundtrip() {
        let reply = Reply::nok("boom", vec!["handler".into(), "/auth".into()]);
        let back = Reply::from_bytes(&reply.to_bytes().unwrap()).unwrap();
        assert_eq!(back, reply);
    }

    #[test]
    fn wire_field_names_are_camel_case() {
        let wire = Reply::ok("fine").to_bytes().unwrap();
        let text = String::from_utf8_lossy(&wire);
        assert!(text.contains("isOk"));
        assert!(!text.contains("is_ok"));
    }

    #[test]
    fn from_optional_tolerates_garbage() {
        let reply = Reply::from_optional(Some(b"not msgpack at all"));
        assert!(!reply.is_ok);
        assert_eq!(reply.result, "N/A");

        let reply = Reply::from_optional(None);
        assert!(!reply.is_ok);
    }

    #[test]
    fn interop_shape_is_a_map() {
        // fixmap marker for three entries
        let wire = Reply::ok("x").to_bytes().unwrap();
        assert_eq!(wire[0] & 0xF0, 0x80);
    }
}
