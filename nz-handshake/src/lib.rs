//! The client-side connection handshake for the Netezza Performance Server
//! wire protocol: negotiates a connection-protocol version, streams client
//! identity for audit, optionally upgrades the transport to TLS in place,
//! authenticates the user, and drains the post-authentication preamble
//! until the server is ready for query.
//!
//! The entry point is [`HandshakeDriver`]; build one with
//! [`HandshakeDriver::new`] over any `AsyncRead + AsyncWrite + Unpin + Send`
//! transport and drive it with [`HandshakeDriver::startup`].

mod config;
mod driver;
mod error;
mod identity;
mod reader;
mod tls;
mod transport;

pub use config::{HandshakeOptions, SecurityLevel, TlsConfig, TlsVerify};
pub use driver::{CancelKey, HandshakeDriver, HandshakeResult};
pub use error::HandshakeError;
pub use transport::MaybeTlsStream;

pub use nz_auth::AuthMethod;
pub use nz_protocol::DEFAULT_PORT;
