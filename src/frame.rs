//! Wire format: length-prefixed frames carrying a PC tag and a payload
//! (SPEC_FULL.md §4.5, §6 "Wire format (bit-exact)").
//!
//! Grounded on the teacher's `net::channel` framing (`send`/`recv` on
//! `StreamOwned`, which writes a `bincode`-encoded size prefix then the raw
//! payload); the prefix/body split is the same shape, but this spec pins an
//! exact binary layout (u16/u32 big-endian fields, hex-text payload) instead
//! of leaving it to `bincode`'s own representation.

use num_bigint::BigUint;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

use crate::error::RuntimeError;
use crate::field::{Field, FieldElement};
use crate::pc::Tag;
use crate::player::PlayerId;

/// Upper bound on `data_size` imposed by its `u16` wire field (SPEC_FULL.md
/// §4.5, §9). The outer frame body (header + pc words + payload) has the
/// same `u16` budget to share, so a payload anywhere near this bound with a
/// nonempty pc stack will still be rejected by [`encode_data_frame`].
pub const MAX_PAYLOAD_BYTES: usize = u16::MAX as usize;

/// A decoded application frame: a PC tag plus its opaque payload bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataFrame {
    pub tag: Tag,
    pub payload: Vec<u8>,
}

/// Encodes the frame body: `u16 pc_size | u16 data_size | pc_size x u32 pc | payload`.
/// Does not include the outer record length prefix (see [`write_framed`]),
/// whose own `u16` length covers this *entire* body -- header and pc words
/// included, not just the payload -- so the size check has to account for
/// that overhead too, not just `payload.len()` in isolation.
pub fn encode_data_frame(frame: &DataFrame) -> Result<Vec<u8>, RuntimeError> {
    let pc = frame.tag.as_slice();
    if pc.len() > u16::MAX as usize {
        return Err(RuntimeError::TransportDecode {
            peer: 0,
            reason: "pc depth exceeds u16 range".into(),
        });
    }

    let body_len = 4 + pc.len() * 4 + frame.payload.len();
    if body_len > u16::MAX as usize {
        return Err(RuntimeError::PayloadTooLarge {
            size: body_len,
            max: u16::MAX as usize,
        });
    }

    let mut out = Vec::with_capacity(body_len);
    out.extend_from_slice(&(pc.len() as u16).to_be_bytes());
    out.extend_from_slice(&(frame.payload.len() as u16).to_be_bytes());
    for word in pc {
        out.extend_from_slice(&word.to_be_bytes());
    }
    out.extend_from_slice(&frame.payload);
    Ok(out)
}

/// Decodes a frame body produced by [`encode_data_frame`]. `peer` is used
/// only to attribute a `TransportDecode` error to the right connection.
pub fn decode_data_frame(body: &[u8], peer: PlayerId) -> Result<DataFrame, RuntimeError> {
    let bad = |reason: &str| RuntimeError::TransportDecode {
        peer,
        reason: reason.to_string(),
    };
    if body.len() < 4 {
        return Err(bad("frame shorter than the pc_size/data_size header"));
    }
    let pc_size = u16::from_be_bytes([body[0], body[1]]) as usize;
    let data_size = u16::from_be_bytes([body[2], body[3]]) as usize;
    let pc_bytes_len = pc_size * 4;
    let expected_len = 4 + pc_bytes_len + data_size;
    if body.len() != expected_len {
        return Err(bad(&format!(
            "pc_size/data_size header ({pc_size}, {data_size}) claims a body of {expected_len} bytes, got {}",
            body.len()
        )));
    }

    let mut pc = Vec::with_capacity(pc_size);
    let pc_region = &body[4..4 + pc_bytes_len];
    for chunk in pc_region.chunks_exact(4) {
        pc.push(u32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]));
    }
    if pc.is_empty() {
        return Err(bad("data frame carries an empty pc"));
    }
    let payload = body[4 + pc_bytes_len..].to_vec();
    Ok(DataFrame {
        tag: Tag::from_parts(pc),
        payload,
    })
}

/// The handshake frame body is just the sender's id in ASCII decimal, with
/// no pc at all (SPEC_FULL.md §4.5, §6).
pub fn encode_handshake(id: PlayerId) -> Vec<u8> {
    id.to_string().into_bytes()
}

pub fn decode_handshake(body: &[u8]) -> Result<PlayerId, RuntimeError> {
    let text = std::str::from_utf8(body).map_err(|_| RuntimeError::TransportDecode {
        peer: 0,
        reason: "handshake frame is not valid UTF-8".into(),
    })?;
    text.trim().parse::<PlayerId>().map_err(|_| RuntimeError::TransportDecode {
        peer: 0,
        reason: format!("handshake frame {text:?} is not a decimal player id"),
    })
}

/// Encodes a field element payload as ASCII `0x...` hex of its canonical
/// residue (SPEC_FULL.md §6).
pub fn encode_field_element(value: &FieldElement) -> Vec<u8> {
    format!("0x{}", value.value().to_str_radix(16)).into_bytes()
}

pub fn decode_field_element(payload: &[u8], field: &Field, peer: PlayerId) -> Result<FieldElement, RuntimeError> {
    let text = std::str::from_utf8(payload).map_err(|_| RuntimeError::TransportDecode {
        peer,
        reason: "field element payload is not valid UTF-8".into(),
    })?;
    let hex = text.strip_prefix("0x").ok_or_else(|| RuntimeError::TransportDecode {
        peer,
        reason: format!("field element payload {text:?} missing 0x prefix"),
    })?;
    let value = BigUint::parse_bytes(hex.as_bytes(), 16).ok_or_else(|| RuntimeError::TransportDecode {
        peer,
        reason: format!("field element payload {text:?} is not valid hex"),
    })?;
    Ok(field.from_bigint(&num_bigint::BigInt::from(value)))
}

/// Writes `body` prefixed with its big-endian u16 length (the outer record
/// boundary, SPEC_FULL.md §6).
pub async fn write_framed<W: tokio::io::AsyncWrite + Unpin>(stream: &mut W, body: &[u8]) -> std::io::Result<()> {
    debug_assert!(body.len() <= u16::MAX as usize, "body would silently truncate the u16 length prefix");
    let len = body.len() as u16;
    stream.write_all(&len.to_be_bytes()).await?;
    stream.write_all(body).await?;
    stream.flush().await
}

/// Reads one length-prefixed record from the stream.
pub async fn read_framed<R: tokio::io::AsyncRead + Unpin>(stream: &mut R) -> std::io::Result<Vec<u8>> {
    let mut len_buf = [0u8; 2];
    stream.read_exact(&mut len_buf).await?;
    let len = u16::from_be_bytes(len_buf) as usize;
    let mut body = vec![0u8; len];
    stream.read_exact(&mut body).await?;
    Ok(body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::make_field;

    #[test]
    fn data_frame_round_trips() {
        let frame = DataFrame {
            tag: Tag::from_parts(vec![1, 2, 3]),
            payload: b"hello".to_vec(),
        };
        let bytes = encode_data_frame(&frame).unwrap();
        let decoded = decode_data_frame(&bytes, 1).unwrap();
        assert_eq!(frame, decoded);
    }

    #[test]
    fn rejects_truncated_frame() {
        let frame = DataFrame {
            tag: Tag::from_parts(vec![1]),
            payload: b"hello".to_vec(),
        };
        let mut bytes = encode_data_frame(&frame).unwrap();
        bytes.truncate(bytes.len() - 2);
        assert!(decode_data_frame(&bytes, 1).is_err());
    }

    #[test]
    fn handshake_round_trips() {
        let bytes = encode_handshake(7);
        assert_eq!(decode_handshake(&bytes).unwrap(), 7);
    }

    #[test]
    fn field_element_payload_is_ascii_hex() {
        let field = make_field(BigUint::from(1031u32)).unwrap();
        let v = field.from_u64(255);
        let bytes = encode_field_element(&v);
        assert_eq!(bytes, b"0xff");
        let back = decode_field_element(&bytes, &field, 1).unwrap();
        assert_eq!(back, v);
    }

    #[test]
    fn payload_over_cap_is_rejected() {
        let frame = DataFrame {
            tag: Tag::from_parts(vec![1]),
            payload: vec![0u8; MAX_PAYLOAD_BYTES + 1],
        };
        assert!(matches!(
            encode_data_frame(&frame),
            Err(RuntimeError::PayloadTooLarge { .. })
        ));
    }

    #[test]
    fn payload_just_under_the_cap_overflows_once_pc_overhead_is_counted() {
        // A payload at exactly MAX_PAYLOAD_BYTES fits `data_size` alone, but
        // the outer u16 length prefix covers the whole body: header + pc
        // words + payload. With a 3-word pc that pushes the body 20 bytes
        // past u16::MAX, which must be rejected rather than silently
        // truncated/wrapped by `write_framed`'s `body.len() as u16` cast.
        let frame = DataFrame {
            tag: Tag::from_parts(vec![1, 2, 3]),
            payload: vec![0u8; MAX_PAYLOAD_BYTES],
        };
        assert!(matches!(
            encode_data_frame(&frame),
            Err(RuntimeError::PayloadTooLarge { .. })
        ));
    }

    #[tokio::test]
    async fn framed_io_round_trips() {
        let (mut a, mut b) = tokio::io::duplex(4096);
        write_framed(&mut a, b"payload").await.unwrap();
        let got = read_framed(&mut b).await.unwrap();
        assert_eq!(got, b"payload");
    }
}
