//! Length-prefixed framing of wire messages.
//!
//! Every frame is `[u32 big-endian length][MessagePack payload]`. A frame
//! larger than [`MAX_MSGSIZE`] or a payload that fails to decode is fatal
//! for the peer that sent it.

use hexradius_core::Message;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Largest frame either side will accept: 1 MiB.
pub const MAX_MSGSIZE: u32 = 1024 * 1024;

/// Errors from framing and payload coding.
#[derive(Debug)]
pub enum CodecError {
    /// The peer announced a frame larger than [`MAX_MSGSIZE`].
    Oversized(u32),
    /// The payload was not a valid message.
    Decode(String),
    /// The message could not be serialized.
    Encode(String),
    /// The underlying transport failed.
    Io(std::io::Error),
}

impl std::fmt::Display for CodecError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CodecError::Oversized(size) => {
                write!(f, "Oversized message: {} bytes (limit {})", size, MAX_MSGSIZE)
            }
            CodecError::Decode(err) => write!(f, "Undecodable payload: {}", err),
            CodecError::Encode(err) => write!(f, "Could not encode message: {}", err),
            CodecError::Io(err) => write!(f, "Transport error: {}", err),
        }
    }
}

impl std::error::Error for CodecError {}

impl From<std::io::Error> for CodecError {
    fn from(err: std::io::Error) -> Self {
        CodecError::Io(err)
    }
}

/// Encode a message into a complete frame.
pub fn encode_frame(msg: &Message) -> Result<Vec<u8>, CodecError> {
    // Named serialization keeps the payload self-describing, which the
    // tagged message union requires
    let payload = rmp_serde::to_vec_named(msg).map_err(|e| CodecError::Encode(e.to_string()))?;
    if payload.len() as u64 > MAX_MSGSIZE as u64 {
        return Err(CodecError::Oversized(payload.len() as u32));
    }
    let mut frame = Vec::with_capacity(4 + payload.len());
    frame.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    frame.extend_from_slice(&payload);
    Ok(frame)
}

/// Decode a frame's payload bytes.
pub fn decode_payload(bytes: &[u8]) -> Result<Message, CodecError> {
    rmp_serde::from_slice(bytes).map_err(|e| CodecError::Decode(e.to_string()))
}

/// Read one message from an async byte stream.
pub async fn read_frame<R>(reader: &mut R) -> Result<Message, CodecError>
where
    R: AsyncRead + Unpin,
{
    let mut len_buf = [0u8; 4];
    reader.read_exact(&mut len_buf).await?;
    let len = u32::from_be_bytes(len_buf);
    if len > MAX_MSGSIZE {
        return Err(CodecError::Oversized(len));
    }
    let mut payload = vec![0u8; len as usize];
    reader.read_exact(&mut payload).await?;
    decode_payload(&payload)
}

/// Write one message to an async byte stream.
pub async fn write_frame<W>(writer: &mut W, msg: &Message) -> Result<(), CodecError>
where
    W: AsyncWrite + Unpin,
{
    let frame = encode_frame(msg)?;
    writer.write_all(&frame).await?;
    Ok(())
}
