//! Exact-length framing over an async byte stream.
//!
//! A transfer either moves every requested byte or fails; a short transfer is
//! terminal for the connection and is never retried. Frames are written as a
//! single buffer (header then payload) so two writers sharing a stream can
//! never interleave inside a frame.
//!
//! Byte order is little-endian throughout (see [`crate::protocol`]).

use crate::protocol::{FrameHeader, Message, MessageType, HEADER_LEN};
use std::io;
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::time::timeout;

#[derive(Error, Debug)]
pub enum CodecError {
    /// The peer closed the stream on a frame boundary.
    #[error("connection closed by peer")]
    Closed,
    /// The stream ended inside a header or payload.
    #[error("short read: expected {expected} bytes, got {got}")]
    ShortRead { expected: usize, got: usize },
    /// A known type arrived with a payload width other than its fixed one.
    #[error("{kind:?} payload must be {expected} bytes, header says {size}")]
    SizeMismatch {
        kind: MessageType,
        expected: usize,
        size: u16,
    },
    #[error("payload of {0} bytes does not fit in a frame")]
    Oversized(usize),
    #[error("malformed payload: {0}")]
    Decode(#[from] bincode::Error),
    /// A message could not be serialized for sending.
    #[error("failed to encode payload: {0}")]
    Encode(#[source] bincode::Error),
    #[error("frame transfer timed out")]
    Timeout,
    #[error("transport error: {0}")]
    Io(#[from] io::Error),
}

impl CodecError {
    /// True when the bytes on the wire did not form a valid frame.
    pub fn is_framing(&self) -> bool {
        matches!(
            self,
            CodecError::ShortRead { .. } | CodecError::SizeMismatch { .. } | CodecError::Decode(_)
        )
    }

    /// True when the other end went away.
    pub fn is_closed(&self) -> bool {
        match self {
            CodecError::Closed => true,
            CodecError::Io(e) => matches!(
                e.kind(),
                io::ErrorKind::ConnectionReset
                    | io::ErrorKind::ConnectionAborted
                    | io::ErrorKind::BrokenPipe
                    | io::ErrorKind::UnexpectedEof
            ),
            _ => false,
        }
    }
}

/// Result of reading one frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Incoming {
    Known(Message),
    /// A frame with an unrecognized tag whose payload was consumed and dropped.
    Unknown { kind: u8, size: u16 },
}

/// Writes all of `bytes` or fails with [`CodecError::Closed`] if the
/// transport stops accepting data.
pub async fn write_exact<W>(writer: &mut W, bytes: &[u8]) -> Result<(), CodecError>
where
    W: AsyncWrite + Unpin,
{
    let mut written = 0;
    while written < bytes.len() {
        let n = writer.write(&bytes[written..]).await?;
        if n == 0 {
            return Err(CodecError::Closed);
        }
        written += n;
    }
    Ok(())
}

/// Fills `buf` completely. End of stream before the first byte is
/// [`CodecError::Closed`]; anywhere later it is [`CodecError::ShortRead`].
pub async fn read_exact<R>(reader: &mut R, buf: &mut [u8]) -> Result<(), CodecError>
where
    R: AsyncRead + Unpin,
{
    let mut filled = 0;
    while filled < buf.len() {
        let n = reader.read(&mut buf[filled..]).await?;
        if n == 0 {
            return Err(if filled == 0 {
                CodecError::Closed
            } else {
                CodecError::ShortRead {
                    expected: buf.len(),
                    got: filled,
                }
            });
        }
        filled += n;
    }
    Ok(())
}

/// Reads and throws away exactly `len` bytes.
pub async fn drain<R>(reader: &mut R, len: usize) -> Result<(), CodecError>
where
    R: AsyncRead + Unpin,
{
    let mut scratch = [0u8; 256];
    let mut left = len;
    while left > 0 {
        let chunk = left.min(scratch.len());
        read_exact(reader, &mut scratch[..chunk])
            .await
            .map_err(|e| match e {
                CodecError::Closed => CodecError::ShortRead {
                    expected: len,
                    got: len - left,
                },
                CodecError::ShortRead { got, .. } => CodecError::ShortRead {
                    expected: len,
                    got: len - left + got,
                },
                other => other,
            })?;
        left -= chunk;
    }
    Ok(())
}

/// Sends one frame: header with the payload's exact width, then the payload.
pub async fn send_message<W>(writer: &mut W, message: &Message) -> Result<(), CodecError>
where
    W: AsyncWrite + Unpin,
{
    let payload = message.encode_payload().map_err(CodecError::Encode)?;
    let size = u16::try_from(payload.len()).map_err(|_| CodecError::Oversized(payload.len()))?;
    let header = FrameHeader {
        kind: message.kind().tag(),
        size,
    };

    let mut frame = Vec::with_capacity(HEADER_LEN + payload.len());
    frame.extend_from_slice(&bincode::serialize(&header).map_err(CodecError::Encode)?);
    frame.extend_from_slice(&payload);

    write_exact(writer, &frame).await?;
    writer.flush().await?;
    Ok(())
}

pub async fn recv_header<R>(reader: &mut R) -> Result<FrameHeader, CodecError>
where
    R: AsyncRead + Unpin,
{
    let mut buf = [0u8; HEADER_LEN];
    read_exact(reader, &mut buf).await?;
    Ok(bincode::deserialize(&buf)?)
}

/// Reads the payload announced by `header`.
///
/// Unknown tags are drained so the stream stays aligned. For known tags the
/// declared size is checked against the type's fixed width before any byte
/// is interpreted.
pub async fn recv_payload<R>(reader: &mut R, header: FrameHeader) -> Result<Incoming, CodecError>
where
    R: AsyncRead + Unpin,
{
    let Some(kind) = header.message_type() else {
        drain(reader, header.size as usize).await?;
        return Ok(Incoming::Unknown {
            kind: header.kind,
            size: header.size,
        });
    };

    let expected = kind.payload_len();
    if header.size as usize != expected {
        return Err(CodecError::SizeMismatch {
            kind,
            expected,
            size: header.size,
        });
    }

    let mut payload = vec![0u8; expected];
    read_exact(reader, &mut payload).await.map_err(|e| match e {
        CodecError::Closed => CodecError::ShortRead { expected, got: 0 },
        other => other,
    })?;
    Ok(Incoming::Known(Message::decode(kind, &payload)?))
}

/// Reads one whole frame.
pub async fn recv_message<R>(reader: &mut R) -> Result<Incoming, CodecError>
where
    R: AsyncRead + Unpin,
{
    let header = recv_header(reader).await?;
    recv_payload(reader, header).await
}

/// [`send_message`] bounded by `limit`; a stalled writer fails with [`CodecError::Timeout`].
pub async fn send_message_within<W>(
    writer: &mut W,
    message: &Message,
    limit: Duration,
) -> Result<(), CodecError>
where
    W: AsyncWrite + Unpin,
{
    timeout(limit, send_message(writer, message))
        .await
        .map_err(|_| CodecError::Timeout)?
}

/// [`recv_message`] bounded by `limit`, so a peer that starts a frame and
/// never finishes it cannot hold the reader forever.
pub async fn recv_message_within<R>(reader: &mut R, limit: Duration) -> Result<Incoming, CodecError>
where
    R: AsyncRead + Unpin,
{
    timeout(limit, recv_message(reader))
        .await
        .map_err(|_| CodecError::Timeout)?
}
