//! The handshake error taxonomy.
//!
//! Every failure during `startup` is fatal to the connection attempt; there
//! is no retry or partial success inside this crate (see the crate-level
//! docs). One flat enum covers every documented failure mode plus a
//! reserved `InvalidState` variant for transitions that should never be
//! reachable through any valid sequence of server bytes.

use derive_more::{Display, Error};

#[derive(Debug, Display, Error)]
pub enum HandshakeError {
    /// Should not be reachable; indicates a logic error in this crate rather
    /// than a server or transport failure. Use the `invalid_state!` macro
    /// instead of constructing this directly.
    #[display("invalid handshake state: {_0}")]
    InvalidState(#[error(not(source))] &'static str),

    /// Unexpected byte where the protocol admits only a small set.
    #[display("unexpected byte {_0:#04x} from server")]
    BadProtocol(#[error(not(source))] u8),

    /// Server rejected a specific attribute (`'E'` in phase 1).
    #[display("server rejected an attribute value")]
    BadAttributeValue,

    /// Server counter-offered a version outside `{2,3,4,5}`.
    #[display("server counter-offered an unsupported protocol version: {_0:?}")]
    UnsupportedVersion(#[error(not(source))] u8),

    /// Sub-protocol fallback walk ran past 3 without acceptance.
    #[display("sub-protocol fallback walk exhausted without acceptance")]
    ProtocolExhausted,

    /// `'E'` reply to the `DB` frame.
    #[display("server rejected the requested database")]
    DatabaseRejected,

    /// Server offered TLS but the client's security level forbids it.
    #[display("server offered TLS but the client requires cleartext")]
    TlsRefused,

    /// Client's security level requires TLS but the server refused it.
    #[display("client requires TLS but the server refused it")]
    TlsRequired,

    /// `'E'` reply to `SSL_NEGOTIATE`.
    #[display("server rejected the TLS negotiation")]
    TlsRejected,

    /// The in-band TLS handshake itself failed.
    #[display("TLS handshake failed: {_0}")]
    TlsHandshakeFailed(std::io::Error),

    /// Server demanded an auth code outside `{0,3,5,6}`.
    #[display("server demanded an unsupported authentication method (code {_0})")]
    UnsupportedAuthMethod(#[error(not(source))] i32),

    /// `'E'` in the completion drain, carrying the server-provided message.
    #[display("server error: {_0}")]
    ServerError(#[error(not(source))] String),

    /// Missing or mislabeled `'R'` before authentication.
    #[display("expected an authentication request from the server, got something else")]
    UnexpectedMessage,

    /// No byte arrived within the read deadline.
    #[display("timed out waiting for the server")]
    Timeout,

    /// End-of-stream before the expected bytes arrived.
    #[display("transport closed before the expected bytes arrived")]
    TransportClosed,

    /// Any other I/O failure on the transport.
    #[display("I/O error: {_0}")]
    Io(std::io::Error),

    /// A server-supplied string was not valid UTF-8.
    #[display("invalid UTF-8 in a server-supplied string")]
    Utf8(std::str::Utf8Error),
}

impl From<std::io::Error> for HandshakeError {
    fn from(err: std::io::Error) -> Self {
        HandshakeError::Io(err)
    }
}

impl From<std::str::Utf8Error> for HandshakeError {
    fn from(err: std::str::Utf8Error) -> Self {
        HandshakeError::Utf8(err)
    }
}

macro_rules! invalid_state {
    ($msg:literal) => {{
        tracing::error!(
            "invalid handshake state: {}\n{}",
            $msg,
            ::std::backtrace::Backtrace::capture()
        );
        $crate::error::HandshakeError::InvalidState($msg)
    }};
}
pub(crate) use invalid_state;
