use rand::Rng;
use serde::de::Visitor;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Correlation id reserved for unsolicited server-pushed events.
pub const EVENT_ID: u32 = 0;

/// Highest valid correlation id. Ids are 31-bit so JavaScript peers stay
/// inside safe integer arithmetic.
pub const MAX_ID: u32 = (1 << 31) - 1;

/// Packet type tag, written on the wire as its string name so any msgpack
/// peer can match on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Code {
    Accept,
    Complete,

    ExecReq,
    ExecResp,

    Exec2Req,
    Exec2Resp,

    Exec3Req,
    Exec3Push,
    Exec3Resp,
    Exec3Close,

    Event,
    Error,

    /// Any tag this build does not know. Dispatchers answer it with an
    /// error packet instead of dropping the connection.
    Unknown,
}

impl Code {
    /// Wire tag for this code.
    pub fn tag(self) -> &'static str {
        match self {
            Code::Accept => "ACCEPT",
            Code::Complete => "COMPLETE",
            Code::ExecReq => "EXEC_REQ",
            Code::ExecResp => "EXEC_RESP",
            Code::Exec2Req => "EXEC2_REQ",
            Code::Exec2Resp => "EXEC2_RESP",
            Code::Exec3Req => "EXEC3_REQ",
            Code::Exec3Push => "EXEC3_PUSH",
            Code::Exec3Resp => "EXEC3_RESP",
            Code::Exec3Close => "EXEC3_CLOSE",
            Code::Event => "EVENT",
            Code::Error => "ERROR",
            Code::Unknown => "UNKNOWN",
        }
    }

    /// Parse a wire tag. Unrecognized tags map to [`Code::Unknown`] so a
    /// newer peer's packets stay a per-message matter.
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "ACCEPT" => Code::Accept,
            "COMPLETE" => Code::Complete,
            "EXEC_REQ" => Code::ExecReq,
            "EXEC_RESP" => Code::ExecResp,
            "EXEC2_REQ" => Code::Exec2Req,
            "EXEC2_RESP" => Code::Exec2Resp,
            "EXEC3_REQ" => Code::Exec3Req,
            "EXEC3_PUSH" => Code::Exec3Push,
            "EXEC3_RESP" => Code::Exec3Resp,
            "EXEC3_CLOSE" => Code::Exec3Close,
            "EVENT" => Code::Event,
            "ERROR" => Code::Error,
            _ => Code::Unknown,
        }
    }
}

impl Serialize for Code {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.tag())
    }
}

impl<'de> Deserialize<'de> for Code {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct TagVisitor;

        impl Visitor<'_> for TagVisitor {
            type Value = Code;

            fn expecting(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str("a packet code tag")
            }

            fn visit_str<E: serde::de::Error>(self, value: &str) -> Result<Code, E> {
                Ok(Code::from_tag(value))
            }
        }

        deserializer.deserialize_str(TagVisitor)
    }
}

/// The atomic message unit exchanged over a connection.
///
/// `id` correlates every packet of one logical exchange; `0` is reserved for
/// unsolicited events. `bytes` carries an optional payload, itself encoded
/// with [`crate::codec`] when it holds a structured value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Packet {
    pub id: u32,
    pub code: Code,
    pub endpoint: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default, with = "serde_bytes")]
    pub bytes: Option<Vec<u8>>,
}

impl Packet {
    pub fn new(
        id: u32,
        code: Code,
        endpoint: impl Into<String>,
        args: Vec<String>,
        bytes: Option<Vec<u8>>,
    ) -> Self {
        Self {
            id,
            code,
            endpoint: endpoint.into(),
            args,
            bytes,
        }
    }

    /// ACCEPT for a request that reached a handler.
    pub fn accept(id: u32, endpoint: &str) -> Self {
        Self::new(id, Code::Accept, endpoint, Vec::new(), None)
    }

    /// Terminal COMPLETE for an exchange.
    pub fn complete(id: u32, endpoint: &str) -> Self {
        Self::new(id, Code::Complete, endpoint, Vec::new(), None)
    }

    /// Response carrying a payload, for any of the `*_RESP` codes.
    pub fn response(id: u32, code: Code, endpoint: &str, bytes: Vec<u8>) -> Self {
        Self::new(id, code, endpoint, Vec::new(), Some(bytes))
    }

    /// ERROR carrying an encoded [`crate::Reply`].
    pub fn error(id: u32, endpoint: &str, bytes: Option<Vec<u8>>) -> Self {
        Self::new(id, Code::Error, endpoint, Vec::new(), bytes)
    }

    /// Unsolicited EVENT, fanned out to every connected client.
    pub fn event(endpoint: &str, bytes: Option<Vec<u8>>) -> Self {
        Self::new(EVENT_ID, Code::Event, endpoint, Vec::new(), bytes)
    }

    /// One-shot request with a fresh correlation id.
    pub fn exec_request(endpoint: &str, args: Vec<String>) -> Self {
        Self::new(random_id(), Code::ExecReq, endpoint, args, None)
    }

    /// Server-streaming request with a fresh correlation id.
    pub fn exec2_request(endpoint: &str, args: Vec<String>, bytes: Option<Vec<u8>>) -> Self {
        Self::new(random_id(), Code::Exec2Req, endpoint, args, bytes)
    }

    /// Bidirectional-stream open. Callers that need to address the stream
    /// later may pin the id themselves.
    pub fn exec3_request(endpoint: &str, args: Vec<String>, id: Option<u32>) -> Self {
        Self::new(
            id.unwrap_or_else(random_id),
            Code::Exec3Req,
            endpoint,
            args,
            None,
        )
    }

    /// Push into an open bidirectional stream.
    pub fn exec3_push(id: u32, bytes: Vec<u8>) -> Self {
        Self::new(id, Code::Exec3Push, "/sys", Vec::new(), Some(bytes))
    }

    /// Cooperative close of an open bidirectional stream.
    pub fn exec3_close(id: u32) -> Self {
        Self::new(id, Code::Exec3Close, "/sys", Vec::new(), None)
    }

    /// True for unsolicited event packets.
    pub fn is_event(&self) -> bool {
        self.id == EVENT_ID && self.code == Code::Event
    }
}

/// Generate a non-zero 31-bit correlation id.
pub fn random_id() -> u32 {
    rand::thread_rng().gen_range(1..=MAX_ID)
}
