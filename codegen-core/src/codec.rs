// codegen-core/src/codec.rs

//! Length-prefixed binary envelope codec.
//!
//! The envelope layout is:
//! ```text
//! +----------------------+
//! | Magic (u32, BE)      |  <- protocol identifier
//! +----------------------+
//! | Length (u16, BE)     |  <- total envelope length, header included
//! +----------------------+
//! | Payload (bincode)    |  <- serialized Message, length - 6 bytes
//! +----------------------+
//! ```
//!
//! The codec works on byte buffers only. Callers currently move
//! envelopes through queue files, but the same encode/decode pair must
//! hold over a stream socket without modification.

use bytes::{Bytes, BytesMut, Buf, BufMut};

use crate::error::{CoordinatorError, Result};
use crate::message::Message;

/// Magic bytes identifying a coordinator envelope ("CGN1").
pub const MAGIC: u32 = 0x4347_4E31;

/// Envelope header size: 4-byte magic plus 2-byte length.
pub const HEADER_LEN: usize = 6;

/// Encodes a message into a complete envelope.
pub fn encode(message: &Message) -> Result<Bytes> {
    let payload = bincode::serialize(message)
        .map_err(|e| CoordinatorError::serialization(e.to_string()))?;

    let total = HEADER_LEN + payload.len();
    if total > u16::MAX as usize {
        return Err(CoordinatorError::protocol(format!(
            "message too large for envelope: {total} bytes"
        )));
    }

    let mut buf = BytesMut::with_capacity(total);
    buf.put_u32(MAGIC);
    buf.put_u16(total as u16);
    buf.put_slice(&payload);
    Ok(buf.freeze())
}

/// Decodes a message from an envelope.
///
/// # Errors
///
/// Returns `Protocol` if the magic does not match or fewer bytes than
/// the declared length are available, and `Serialization` if the
/// payload does not deserialize.
pub fn decode(mut buf: &[u8]) -> Result<Message> {
    if buf.len() < HEADER_LEN {
        return Err(CoordinatorError::protocol(format!(
            "truncated envelope header: {} bytes",
            buf.len()
        )));
    }

    let magic = buf.get_u32();
    if magic != MAGIC {
        return Err(CoordinatorError::protocol(format!(
            "bad envelope magic: {magic:#010x}"
        )));
    }

    let total = buf.get_u16() as usize;
    if total < HEADER_LEN {
        return Err(CoordinatorError::protocol(format!(
            "envelope length {total} below header size"
        )));
    }

    let payload_len = total - HEADER_LEN;
    if buf.len() < payload_len {
        return Err(CoordinatorError::protocol(format!(
            "truncated envelope: declared {payload_len} payload bytes, {} available",
            buf.len()
        )));
    }

    bincode::deserialize(&buf[..payload_len])
        .map_err(|e| CoordinatorError::serialization(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{MessageBody, PointMessage, PointValue, SessionInit};

    fn mixed_point() -> Message {
        Message::request(MessageBody::Point(PointMessage::new(vec![
            PointValue::Int(-7),
            PointValue::Int(1024),
            PointValue::Real(3.25),
            PointValue::Str("tile_8x8".to_string()),
        ])))
    }

    #[test]
    fn test_round_trip_point() {
        let message = mixed_point();
        let bytes = encode(&message).unwrap();
        let decoded = decode(&bytes).unwrap();
        assert_eq!(decoded, message);
    }

    #[test]
    fn test_round_trip_session() {
        let message = Message::reply_ok(MessageBody::Session(
            SessionInit::new("gemm").with_cfg("codegen_slave_list", "alpha 2, beta 1"),
        ));
        let decoded = decode(&encode(&message).unwrap()).unwrap();
        assert_eq!(decoded, message);
    }

    #[test]
    fn test_length_covers_header() {
        let bytes = encode(&mixed_point()).unwrap();
        let declared = u16::from_be_bytes([bytes[4], bytes[5]]) as usize;
        assert_eq!(declared, bytes.len());
    }

    #[test]
    fn test_bad_magic() {
        let mut bytes = BytesMut::from(&encode(&mixed_point()).unwrap()[..]);
        bytes[0] ^= 0xFF;
        let err = decode(&bytes).unwrap_err();
        assert!(matches!(err, CoordinatorError::Protocol { .. }));
    }

    #[test]
    fn test_truncated_header() {
        let bytes = encode(&mixed_point()).unwrap();
        let err = decode(&bytes[..HEADER_LEN - 1]).unwrap_err();
        assert!(matches!(err, CoordinatorError::Protocol { .. }));
    }

    #[test]
    fn test_truncated_payload() {
        let bytes = encode(&mixed_point()).unwrap();
        let err = decode(&bytes[..bytes.len() - 1]).unwrap_err();
        assert!(matches!(err, CoordinatorError::Protocol { .. }));
    }

    #[test]
    fn test_declared_length_below_header() {
        let mut bytes = BytesMut::from(&encode(&mixed_point()).unwrap()[..]);
        bytes[4] = 0;
        bytes[5] = (HEADER_LEN - 1) as u8;
        let err = decode(&bytes).unwrap_err();
        assert!(matches!(err, CoordinatorError::Protocol { .. }));
    }

    #[test]
    fn test_garbage_payload() {
        let mut bytes = BytesMut::new();
        bytes.put_u32(MAGIC);
        bytes.put_u16((HEADER_LEN + 4) as u16);
        bytes.put_slice(&[0xFF; 4]);
        let err = decode(&bytes).unwrap_err();
        assert!(matches!(err, CoordinatorError::Serialization { .. }));
    }
}
