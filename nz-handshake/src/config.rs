use std::time::Duration;

use rustls_pki_types::{CertificateDer, PrivateKeyDer};

/// The client's TLS preference, announced in the `SSL_NEGOTIATE` body.
///
/// | level | meaning |
/// |---|---|
/// | 0 | preferred unsecured |
/// | 1 | only unsecured |
/// | 2 | preferred secured |
/// | 3 | only secured |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SecurityLevel {
    #[default]
    PreferredUnsecured = 0,
    OnlyUnsecured = 1,
    PreferredSecured = 2,
    OnlySecured = 3,
}

impl SecurityLevel {
    pub const fn as_i32(self) -> i32 {
        self as i32
    }

    /// True if the server replying `'S'` (offering TLS) is itself a policy
    /// violation at this level.
    pub const fn forbids_tls(self) -> bool {
        matches!(self, SecurityLevel::OnlyUnsecured)
    }

    /// True if the server replying `'N'` (rejecting TLS) is itself a policy
    /// violation at this level.
    pub const fn requires_tls(self) -> bool {
        matches!(self, SecurityLevel::OnlySecured)
    }
}

/// Server-certificate verification policy for an in-band TLS upgrade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TlsVerify {
    /// Verify the server's certificate against `root_certs` (or the
    /// platform's trust store if empty) and its hostname.
    #[default]
    VerifyFull,
    /// Accept any certificate the server presents, without checking its
    /// chain or hostname. Only intended for testing.
    Insecure,
}

/// CA / client-certificate material and verification policy for the
/// in-band TLS upgrade (§4.3c).
#[derive(Debug, Default)]
pub struct TlsConfig {
    pub(crate) root_certs: Vec<CertificateDer<'static>>,
    pub(crate) client_identity: Option<(CertificateDer<'static>, PrivateKeyDer<'static>)>,
    pub(crate) verify: TlsVerify,
}

impl TlsConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Trust this CA certificate in addition to the platform trust store.
    pub fn with_root_cert(mut self, cert: CertificateDer<'static>) -> Self {
        self.root_certs.push(cert);
        self
    }

    /// Present this certificate and key to the server (mutual TLS).
    pub fn with_client_identity(
        mut self,
        cert: CertificateDer<'static>,
        key: PrivateKeyDer<'static>,
    ) -> Self {
        self.client_identity = Some((cert, key));
        self
    }

    /// Disable peer verification entirely. Only confirms the server is
    /// speaking TLS at all.
    pub fn insecure(mut self) -> Self {
        self.verify = TlsVerify::Insecure;
        self
    }
}

/// Construction-time options for a [`crate::HandshakeDriver`].
#[derive(Debug, Clone)]
pub struct HandshakeOptions {
    /// Application name announced under `APPNAME`. Defaults to the basename
    /// of the current executable.
    pub app_name: Option<String>,
    /// Enables verbose `tracing::trace!` output of every frame sent and
    /// received during the handshake.
    pub debug: bool,
    /// How long `readExact` waits for progress before failing with
    /// [`crate::error::HandshakeError::Timeout`].
    pub read_timeout: Duration,
}

impl Default for HandshakeOptions {
    fn default() -> Self {
        Self {
            app_name: None,
            debug: false,
            read_timeout: Duration::from_secs(30),
        }
    }
}
