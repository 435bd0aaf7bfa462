//! The decoy request sent ahead of every relayed request.

use bytes::{BufMut, Bytes, BytesMut};

/// Inert request written first on every upstream connection, so that a
/// middlebox inspecting only the first segment sees this instead of the
/// client's request.
pub const DUMMY_PACKET: &[u8] = b"GET / HTTP/1.1\r\n\
Host: dummy.host\r\n\
Connection: keep-alive\r\n\r\n";

/// Dummy packet immediately followed by `request`, as one buffer.
pub fn dodge_payload(request: &[u8]) -> Bytes {
    let mut payload = BytesMut::with_capacity(DUMMY_PACKET.len() + request.len());
    payload.put_slice(DUMMY_PACKET);
    payload.put_slice(request);
    payload.freeze()
}
