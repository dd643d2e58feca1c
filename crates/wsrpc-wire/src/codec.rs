//! MessagePack encode/decode for packets and payloads.
//!
//! Uses `rmp_serde::to_vec_named` so structs serialize as maps with field
//! names. Browser-side msgpack libraries (`@msgpack/msgpack` and friends)
//! expect the map form; the positional array form would not round-trip.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::Result;
use crate::packet::Packet;

/// Encode a packet into wire bytes.
pub fn encode(packet: &Packet) -> Result<Vec<u8>> {
    Ok(rmp_serde::to_vec_named(packet)?)
}

/// Decode wire bytes into a packet.
///
/// Failure is a per-message condition; callers report it and keep the
/// connection alive.
pub fn decode(bytes: &[u8]) -> Result<Packet> {
    Ok(rmp_serde::from_slice(bytes)?)
}

/// Encode a structured payload destined for [`Packet::bytes`].
pub fn encode_value<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>> {
    Ok(rmp_serde::to_vec_named(value)?)
}

/// Decode a structured payload out of [`Packet::bytes`].
pub fn decode_value<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    Ok(rmp_serde::from_slice(bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::{Code, EVENT_ID};
    use crate::WireError;

    #[test]
    fn packet_roundtrip() {
        let pkt = Packet::new(
            7,
            Code::ExecReq,
            "/auth",
            vec!["login".to_string(), "admin".to_string()],
            None,
        );
        let wire = encode(&pkt).unwrap();
        let back = decode(&wire).unwrap();
        assert_eq!(back, pkt);
    }

    #[test]
    fn packet_roundtrip_with_nested_payload() {
        let payload = encode_value(&vec!["a", "b", "c"]).unwrap();
        let pkt = Packet::response(9, Code::Exec2Resp, "/sys/list", payload.clone());
        let back = decode(&encode(&pkt).unwrap()).unwrap();
        assert_eq!(back.bytes.as_deref(), Some(payload.as_slice()));
        let items: Vec<String> = decode_value(back.bytes.as_deref().unwrap()).unwrap();
        assert_eq!(items, vec!["a", "b", "c"]);
    }

    #[test]
    fn code_tags_match_wire_names() {
        let wire = encode(&Packet::exec_request("/x", vec![])).unwrap();
        let as_text = String::from_utf8_lossy(&wire);
        assert!(as_text.contains("EXEC_REQ"));
    }

    #[test]
    fn event_packet_roundtrip() {
        let pkt = Packet::event("/alert", Some(encode_value("boom").unwrap()));
        let back = decode(&encode(&pkt).unwrap()).unwrap();
        assert_eq!(back.id, EVENT_ID);
        assert_eq!(back.code, Code::Event);
    }

    #[test]
    fn unknown_code_decodes_to_unknown() {
        // Hand-build a packet with a future tag by swapping the code string.
        let wire = encode(&Packet::exec_request("/x", vec![])).unwrap();
        let patched: Vec<u8> = {
            let text = wire.clone();
            let needle = b"EXEC_REQ";
            let pos = text
                .windows(needle.len())
                .position(|w| w == needle)
                .expect("tag present");
            let mut out = text;
            out[pos..pos + needle.len()].copy_from_slice(b"EXEC_NEW");
            out
        };
        let back = decode(&patched).unwrap();
        assert_eq!(back.code, Code::Unknown);
    }

    #[test]
    fn garbage_is_a_decode_error() {
        let err = decode(b"definitely not msgpack").unwrap_err();
        assert!(matches!(err, WireError::Decode(_)));
    }

    #[test]
    fn missing_optional_fields_default() {
        // A map with only id/code/endpoint, as a minimal peer might send.
        #[derive(serde::Serialize)]
        struct Minimal<'a> {
            id: u32,
            code: &'a str,
            endpoint: &'a str,
        }
        let wire = rmp_serde::to_vec_named(&Minimal {
            id: 3,
            code: "COMPLETE",
            endpoint: "/x",
        })
        .unwrap();
        let pkt = decode(&wire).unwrap();
        assert_eq!(pkt.code, Code::Complete);
        assert!(pkt.args.is_empty());
        assert!(pkt.bytes.is_none());
    }
}
