//! Dodge Proxy - HTTP forward proxy that slips a dummy request ahead of each
//! real one.
//!
//! Core library for message framing and the relay engine.

pub mod config;
pub mod http;
pub mod logging;
pub mod proxy;
pub mod sequence;
pub mod server;
