//! Length-prefixed framing over the bridge's TCP stream.
//!
//! Each wire message is two consecutive segments, envelope then payload,
//! every segment preceded by its own big-endian 32-bit length:
//!
//! ```text
//! u32 BE   envelope length
//! bytes    envelope protobuf
//! u32 BE   payload length
//! bytes    inner payload protobuf
//! ```
//!
//! Writes emit a whole message as one buffered `write_all`, so senders
//! serialize against each other through the writer lock alone.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::ComfoError;
use crate::types::{C_MAX_SEGMENT, C_MIN_ENVELOPE};

/// A wire message, still in raw segment form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawMessage {
    pub envelope: Vec<u8>,
    pub payload: Vec<u8>,
}

/// Reads the next complete message from the stream.
///
/// A clean EOF before the first length byte is `PeerClosed`; an EOF
/// anywhere after that is `ShortRead`. Segments above [`C_MAX_SEGMENT`]
/// are rejected before any allocation.
pub async fn read_message<R>(reader: &mut R) -> Result<RawMessage, ComfoError>
where
    R: AsyncRead + Unpin,
{
    let envelope = read_segment(reader, true).await?;
    if envelope.len() < C_MIN_ENVELOPE {
        return Err(ComfoError::ProtocolViolation("envelope below minimum size"));
    }
    let payload = read_segment(reader, false).await?;
    Ok(RawMessage { envelope, payload })
}

async fn read_segment<R>(reader: &mut R, at_boundary: bool) -> Result<Vec<u8>, ComfoError>
where
    R: AsyncRead + Unpin,
{
    let mut len_buf = [0u8; 4];
    if let Err(err) = reader.read_exact(&mut len_buf).await {
        return Err(eof_error(err, at_boundary));
    }
    let len = u32::from_be_bytes(len_buf) as usize;
    if len > C_MAX_SEGMENT {
        return Err(ComfoError::FrameTooLarge(len));
    }

    let mut buf = vec![0u8; len];
    if let Err(err) = reader.read_exact(&mut buf).await {
        return Err(eof_error(err, false));
    }
    Ok(buf)
}

fn eof_error(err: std::io::Error, at_boundary: bool) -> ComfoError {
    match (err.kind(), at_boundary) {
        (std::io::ErrorKind::UnexpectedEof, true) => ComfoError::PeerClosed,
        (std::io::ErrorKind::UnexpectedEof, false) => ComfoError::ShortRead,
        _ => ComfoError::from(err),
    }
}

/// Serializes one message into a single buffer.
pub fn encode_message(envelope: &[u8], payload: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(8 + envelope.len() + payload.len());
    buf.extend_from_slice(&(envelope.len() as u32).to_be_bytes());
    buf.extend_from_slice(envelope);
    buf.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    buf.extend_from_slice(payload);
    buf
}

/// Writes one message to the stream and flushes it.
pub async fn write_message<W>(
    writer: &mut W,
    envelope: &[u8],
    payload: &[u8],
) -> Result<(), ComfoError>
where
    W: AsyncWrite + Unpin,
{
    if envelope.len() > C_MAX_SEGMENT || payload.len() > C_MAX_SEGMENT {
        return Err(ComfoError::FrameTooLarge(envelope.len().max(payload.len())));
    }
    let buf = encode_message(envelope, payload);
    writer.write_all(&buf).await?;
    writer.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_message() -> (Vec<u8>, Vec<u8>) {
        (vec![0xAA; C_MIN_ENVELOPE], vec![0xBB; 10])
    }

    #[tokio::test]
    async fn test_message_roundtrip() {
        let (envelope, payload) = sample_message();
        let wire = encode_message(&envelope, &payload);

        let mut cursor = std::io::Cursor::new(wire);
        let msg = read_message(&mut cursor).await.unwrap();
        assert_eq!(msg.envelope, envelope);
        assert_eq!(msg.payload, payload);
    }

    #[tokio::test]
    async fn test_empty_stream_is_peer_closed() {
        let mut cursor = std::io::Cursor::new(Vec::new());
        assert_eq!(
            read_message(&mut cursor).await.unwrap_err(),
            ComfoError::PeerClosed
        );
    }

    #[tokio::test]
    async fn test_truncated_message_is_short_read() {
        let (envelope, payload) = sample_message();
        let mut wire = encode_message(&envelope, &payload);
        wire.truncate(wire.len() - 4);

        let mut cursor = std::io::Cursor::new(wire);
        assert_eq!(
            read_message(&mut cursor).await.unwrap_err(),
            ComfoError::ShortRead
        );
    }

    #[tokio::test]
    async fn test_eof_between_segments_is_short_read() {
        let (envelope, _) = sample_message();
        let mut wire = Vec::new();
        wire.extend_from_slice(&(envelope.len() as u32).to_be_bytes());
        wire.extend_from_slice(&envelope);

        let mut cursor = std::io::Cursor::new(wire);
        assert_eq!(
            read_message(&mut cursor).await.unwrap_err(),
            ComfoError::ShortRead
        );
    }

    #[tokio::test]
    async fn test_oversized_segment_is_rejected() {
        let mut wire = Vec::new();
        wire.extend_from_slice(&((C_MAX_SEGMENT as u32) + 1).to_be_bytes());

        let mut cursor = std::io::Cursor::new(wire);
        assert_eq!(
            read_message(&mut cursor).await.unwrap_err(),
            ComfoError::FrameTooLarge(C_MAX_SEGMENT + 1)
        );
    }

    #[tokio::test]
    async fn test_undersized_envelope_is_a_protocol_error() {
        let wire = encode_message(&[0u8; 4], &[]);
        let mut cursor = std::io::Cursor::new(wire);
        assert!(matches!(
            read_message(&mut cursor).await.unwrap_err(),
            ComfoError::ProtocolViolation(_)
        ));
    }
}
