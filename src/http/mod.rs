//! HTTP/1.1 message framing.
//!
//! Only the message boundaries are recovered: header lines are kept verbatim
//! and the body is delimited by a single `Content-Length` header. There is no
//! chunked encoding, no header folding and no case-insensitive header matching.
//!
//! # Framing
//!
//! ```text
//!   header line\r\n        ← copied as-is, scanned for Host / Content-Length
//!   header line\r\n
//!   \r\n                   ← end of header block
//!   <Content-Length bytes> ← optional body, read exactly
//! ```
//!
//! The same reader frames client requests and upstream responses. Requests
//! must carry exactly one `Host` header; both sides reject duplicate or
//! oversized `Content-Length` values.

pub mod framing;

pub use framing::{FramingError, Host, MAX_CONTENT_LENGTH, read_request, read_response};
