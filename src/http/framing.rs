use std::fmt;

use bytes::{Bytes, BytesMut};
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt};

/// Header prefix announcing a fixed-length body. Matched byte for byte.
pub const CONTENT_LENGTH_PREFIX: &[u8] = b"Content-Length: ";

/// Header prefix carrying the dial target of a request. Matched byte for byte.
pub const HOST_PREFIX: &[u8] = b"Host: ";

/// Largest body accepted from either side (64 MiB).
pub const MAX_CONTENT_LENGTH: u64 = 1 << 26;

/// The line that closes a header block.
const HEADER_END: &[u8] = b"\r\n";

const REQUEST_CAPACITY: usize = 560;
const RESPONSE_CAPACITY: usize = 1600;

#[derive(Debug, Error)]
pub enum FramingError {
    #[error("stream ended before the message was complete")]
    UnexpectedEof,

    #[error("more than one Content-Length header")]
    DuplicateContentLength,

    #[error("Content-Length is not a valid length")]
    InvalidContentLength,

    #[error("Content-Length {0} exceeds the 64 MiB limit")]
    ContentLengthTooLarge(u64),

    #[error("more than one Host header")]
    DuplicateHost,

    #[error("request has no Host header")]
    MissingHost,

    #[error("body truncated: expected {expected} bytes, received {received}")]
    TruncatedBody { expected: u64, received: u64 },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Raw value of a request's `Host` header, without the line terminator.
///
/// Never interpreted: an embedded `:port` stays part of the name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Host(Bytes);

impl Host {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// The host as text, if it is valid UTF-8.
    pub fn as_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.0).ok()
    }
}

impl From<&str> for Host {
    fn from(value: &str) -> Self {
        Host(Bytes::copy_from_slice(value.as_bytes()))
    }
}

impl fmt::Display for Host {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(&self.0))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Request,
    Response,
}

/// Reads one request from a client stream.
///
/// Returns `Ok(None)` when the stream ends cleanly before the first byte of a
/// new request. Every other way of not producing a request is an error.
pub async fn read_request<R>(reader: &mut R) -> Result<Option<(Bytes, Host)>, FramingError>
where
    R: AsyncBufRead + Unpin,
{
    match read_message(reader, Side::Request).await? {
        Some((message, Some(host))) => Ok(Some((message, host))),
        Some((_, None)) => Err(FramingError::MissingHost),
        None => Ok(None),
    }
}

/// Reads one response from an upstream stream.
pub async fn read_response<R>(reader: &mut R) -> Result<Bytes, FramingError>
where
    R: AsyncBufRead + Unpin,
{
    match read_message(reader, Side::Response).await? {
        Some((message, _)) => Ok(message),
        None => Err(FramingError::UnexpectedEof),
    }
}

async fn read_message<R>(
    reader: &mut R,
    side: Side,
) -> Result<Option<(Bytes, Option<Host>)>, FramingError>
where
    R: AsyncBufRead + Unpin,
{
    let mut message = BytesMut::with_capacity(match side {
        Side::Request => REQUEST_CAPACITY,
        Side::Response => RESPONSE_CAPACITY,
    });
    let mut line = Vec::new();
    let mut content_length: Option<u64> = None;
    let mut host: Option<Host> = None;

    // Header block, copied verbatim.
    loop {
        line.clear();
        let n = reader.read_until(b'\n', &mut line).await?;

        if n == 0 && message.is_empty() {
            return Ok(None);
        }
        if n == 0 || line.last() != Some(&b'\n') {
            return Err(FramingError::UnexpectedEof);
        }

        message.extend_from_slice(&line);
        if line == HEADER_END {
            break;
        }

        if let Some(value) = line.strip_prefix(CONTENT_LENGTH_PREFIX) {
            if content_length.is_some() {
                return Err(FramingError::DuplicateContentLength);
            }
            content_length = Some(parse_content_length(strip_line_end(value))?);
        } else if side == Side::Request {
            if let Some(value) = line.strip_prefix(HOST_PREFIX) {
                if host.is_some() {
                    return Err(FramingError::DuplicateHost);
                }
                host = Some(Host(Bytes::copy_from_slice(strip_line_end(value))));
            }
        }
    }

    if side == Side::Request && host.is_none() {
        return Err(FramingError::MissingHost);
    }

    let Some(expected) = content_length else {
        return Ok(Some((message.freeze(), host)));
    };

    let start = message.len();
    // Bounded by MAX_CONTENT_LENGTH, so the cast cannot truncate.
    message.resize(start + expected as usize, 0);

    let mut received = 0usize;
    while (received as u64) < expected {
        let n = reader.read(&mut message[start + received..]).await?;
        if n == 0 {
            return Err(FramingError::TruncatedBody {
                expected,
                received: received as u64,
            });
        }
        received += n;
    }

    Ok(Some((message.freeze(), host)))
}

fn parse_content_length(value: &[u8]) -> Result<u64, FramingError> {
    let length = std::str::from_utf8(value)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .ok_or(FramingError::InvalidContentLength)?;

    if length > MAX_CONTENT_LENGTH {
        return Err(FramingError::ContentLengthTooLarge(length));
    }

    Ok(length)
}

fn strip_line_end(value: &[u8]) -> &[u8] {
    value
        .strip_suffix(b"\r\n")
        .or_else(|| value.strip_suffix(b"\n"))
        .unwrap_or(value)
}
