//! Dodge relay engine
//!
//! Each client connection is driven by a [`RelaySession`]. For every request
//! the session dials the request's host, writes the dummy packet and the real
//! request in a single write, throws away the first response and hands the
//! second one back to the client.

pub mod dummy;
pub mod session;
pub mod upstream;

pub use dummy::DUMMY_PACKET;
pub use session::{RelaySession, SessionSummary};
pub use upstream::{Dialer, TcpDialer};
