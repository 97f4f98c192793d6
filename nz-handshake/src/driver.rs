//! The handshake driver: the four-phase client state machine described in
//! the crate's top-level docs. `HandshakeDriver` is the sole reader and sole
//! writer of its transport for the duration of `startup`; once that returns
//! ownership of the (possibly TLS-upgraded) transport passes back to the
//! caller along with any read-ahead bytes.

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};

use crate::config::{HandshakeOptions, SecurityLevel, TlsConfig};
use crate::error::{invalid_state, HandshakeError};
use crate::identity::ClientIdentity;
use crate::reader::ByteReader;
use crate::tls;
use crate::transport::MaybeTlsStream;

/// Backend PID and secret key retained from the `'K'` completion-drain
/// message, for a future cancel-request feature. Not consumed inside this
/// crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CancelKey {
    pub pid: i32,
    pub secret: i32,
}

/// The outcome of a successful [`HandshakeDriver::startup`].
pub struct HandshakeResult<S> {
    /// The transport, upgraded to TLS in place if the server offered it and
    /// the caller's security level accepted.
    pub transport: MaybeTlsStream<S>,
    /// Bytes read ahead of the `'Z'` marker; the caller's message parser
    /// must see these before reading anything further from `transport`.
    pub remaining_buffer: Vec<u8>,
    /// `(protocol1, protocol2)` as settled during session setup.
    pub negotiated_protocol: (i16, i16),
    /// Present whenever the server sent backend key data during the drain.
    pub cancel_key: Option<CancelKey>,
}

/// Drives one connection attempt from a raw transport to a ready-for-query
/// session. One instance per attempt; not reusable after `startup` returns
/// or fails.
pub struct HandshakeDriver<S> {
    transport: Option<MaybeTlsStream<S>>,
    reader: ByteReader,
    identity: ClientIdentity,
    tls_config: TlsConfig,
    host: String,
    hs_version: Option<i16>,
    protocol1: i16,
    protocol2: i16,
    /// Gates the per-frame `trace!` calls below; `warn!`/`error!` fire
    /// regardless, matching §9A's "trace per frame, warn/error unconditional".
    debug: bool,
}

impl<S> HandshakeDriver<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    /// `host` is used only for TLS server-name verification on an in-band
    /// upgrade; it plays no role in cleartext sessions.
    pub fn new(
        transport: S,
        host: impl Into<String>,
        tls_config: TlsConfig,
        options: HandshakeOptions,
    ) -> Self {
        Self {
            transport: Some(MaybeTlsStream::Plain(transport)),
            reader: ByteReader::new(options.read_timeout),
            identity: ClientIdentity::snapshot(options.app_name),
            tls_config,
            host: host.into(),
            hs_version: None,
            protocol1: 0,
            protocol2: 0,
            debug: options.debug,
        }
    }

    /// Per-frame tracing is opt-in; `warn!`/`error!` elsewhere in this
    /// module fire unconditionally.
    fn trace_enabled(&self) -> bool {
        self.debug
    }

    pub async fn startup(
        mut self,
        database: Option<&str>,
        security_level: SecurityLevel,
        user: &str,
        password: &str,
        pg_options: Option<&str>,
    ) -> Result<HandshakeResult<S>, HandshakeError> {
        self.negotiate_version().await?;
        self.select_database(database).await?;
        self.advance_protocol()?;
        self.negotiate_tls(security_level).await?;
        self.stream_metadata(user, pg_options).await?;
        self.authenticate(password).await?;
        let cancel_key = self.drain_completion().await?;

        Ok(HandshakeResult {
            transport: self.transport.take().expect("transport present on success"),
            remaining_buffer: self.reader.drain_remaining(),
            negotiated_protocol: (self.protocol1, self.protocol2),
            cancel_key,
        })
    }

    async fn read_u8(&mut self) -> Result<u8, HandshakeError> {
        let transport = self.transport.as_mut().expect("transport present");
        self.reader.read_u8(transport).await
    }

    async fn read_i32(&mut self) -> Result<i32, HandshakeError> {
        let transport = self.transport.as_mut().expect("transport present");
        self.reader.read_i32(transport).await
    }

    async fn read_exact(&mut self, n: usize) -> Result<Vec<u8>, HandshakeError> {
        let transport = self.transport.as_mut().expect("transport present");
        self.reader.read_exact(transport, n).await
    }

    async fn write_all(&mut self, bytes: &[u8]) -> Result<(), HandshakeError> {
        let transport = self.transport.as_mut().expect("transport present");
        transport.write_all(bytes).await?;
        Ok(())
    }

    /// §4.2. Each `'M'` counter-offer strictly lowers `version`, and 2 is
    /// the floor, so the loop terminates; bounded defensively anyway.
    async fn negotiate_version(&mut self) -> Result<i16, HandshakeError> {
        let mut version: i16 = 6;
        for _ in 0..6 {
            if self.trace_enabled() {
                tracing::trace!(version, "sending CLIENT_BEGIN");
            }
            self.write_all(&nz_protocol::client_begin(version)).await?;
            match self.read_u8().await? {
                b'N' => {
                    if self.trace_enabled() {
                        tracing::trace!(version, "server accepted connection-protocol version");
                    }
                    self.hs_version = Some(version);
                    self.protocol2 = 0;
                    return Ok(version);
                }
                b'M' => {
                    let digit = self.read_u8().await?;
                    if !(b'2'..=b'5').contains(&digit) {
                        return Err(HandshakeError::UnsupportedVersion(digit));
                    }
                    version = (digit - b'0') as i16;
                }
                b'E' => return Err(HandshakeError::BadAttributeValue),
                other => return Err(HandshakeError::BadProtocol(other)),
            }
        }
        Err(invalid_state!(
            "version negotiation did not converge within 6 iterations"
        ))
    }

    /// §4.3a.
    async fn select_database(&mut self, database: Option<&str>) -> Result<(), HandshakeError> {
        let Some(name) = database.filter(|s| !s.is_empty()) else {
            return Ok(());
        };
        if self.trace_enabled() {
            tracing::trace!(database = name, "sending DB");
        }
        self.write_all(&nz_protocol::db(name)).await?;
        match self.read_u8().await? {
            b'N' => Ok(()),
            b'E' => Err(HandshakeError::DatabaseRejected),
            other => Err(HandshakeError::BadProtocol(other)),
        }
    }

    /// §4.3b. `protocol2` walks 0 (sentinel) → 5 → 4 → 3; anything past 3
    /// is exhausted.
    fn advance_protocol(&mut self) -> Result<(), HandshakeError> {
        self.protocol2 = match self.protocol2 {
            0 => 5,
            5 => 4,
            4 => 3,
            _ => return Err(HandshakeError::ProtocolExhausted),
        };
        self.protocol1 = 3;
        Ok(())
    }

    /// §4.3c.
    async fn negotiate_tls(&mut self, level: SecurityLevel) -> Result<(), HandshakeError> {
        if self.trace_enabled() {
            tracing::trace!(level = level.as_i32(), "sending SSL_NEGOTIATE");
        }
        self.write_all(&nz_protocol::ssl_negotiate(level.as_i32()))
            .await?;
        match self.read_u8().await? {
            b'N' => {
                if level.requires_tls() {
                    return Err(HandshakeError::TlsRequired);
                }
                Ok(())
            }
            b'S' => {
                if level.forbids_tls() {
                    return Err(HandshakeError::TlsRefused);
                }
                self.write_all(&nz_protocol::ssl_connect(level.as_i32()))
                    .await?;
                self.upgrade_to_tls().await
            }
            b'E' => Err(HandshakeError::TlsRejected),
            other => Err(HandshakeError::BadProtocol(other)),
        }
    }

    async fn upgrade_to_tls(&mut self) -> Result<(), HandshakeError> {
        if self.reader.buffered_len() != 0 {
            return Err(invalid_state!(
                "receive buffer not empty at TLS upgrade point"
            ));
        }
        let current = self.transport.take().expect("transport present");
        let stream = match current {
            MaybeTlsStream::Plain(s) => s,
            other => {
                self.transport = Some(other);
                return Err(invalid_state!(
                    "TLS upgrade requested on an already-secure transport"
                ));
            }
        };
        if self.trace_enabled() {
            tracing::trace!(host = %self.host, "starting in-band TLS upgrade");
        }
        let upgraded = tls::upgrade(stream, &self.host, &self.tls_config).await?;
        self.transport = Some(upgraded);
        Ok(())
    }

    /// §4.3d. The two version families differ only in whether
    /// APPNAME/CLIENT_OS/CLIENT_HOST_NAME/CLIENT_OS_USER are sent.
    async fn stream_metadata(
        &mut self,
        user: &str,
        pg_options: Option<&str>,
    ) -> Result<(), HandshakeError> {
        let hs_version = self.hs_version.expect("set by negotiate_version");
        let full = matches!(hs_version, 4 | 6);
        let varlena = matches!(hs_version, 5 | 6);

        self.send_ack(&nz_protocol::user(user)).await?;
        if full {
            self.send_ack(&nz_protocol::appname(&self.identity.app_name))
                .await?;
            self.send_ack(&nz_protocol::client_os(&self.identity.os))
                .await?;
            self.send_ack(&nz_protocol::client_host_name(&self.identity.host))
                .await?;
            self.send_ack(&nz_protocol::client_os_user(&self.identity.os_user))
                .await?;
        }
        self.send_ack(&nz_protocol::protocol(self.protocol1, self.protocol2))
            .await?;
        self.send_ack(&nz_protocol::remote_pid(self.identity.pid))
            .await?;
        if let Some(opts) = pg_options.filter(|s| !s.is_empty()) {
            self.send_ack(&nz_protocol::options(opts)).await?;
        }
        self.send_ack(&nz_protocol::client_type()).await?;
        if varlena {
            self.send_ack(&nz_protocol::varlena64_enabled()).await?;
        }

        self.write_all(&nz_protocol::client_done()).await?;
        Ok(())
    }

    async fn send_ack(&mut self, frame: &[u8]) -> Result<(), HandshakeError> {
        self.write_all(frame).await?;
        match self.read_u8().await? {
            b'N' => Ok(()),
            b'E' => Err(HandshakeError::BadAttributeValue),
            other => Err(HandshakeError::BadProtocol(other)),
        }
    }

    /// §4.4.
    async fn authenticate(&mut self, password: &str) -> Result<(), HandshakeError> {
        let mut msg_type = self.read_u8().await?;
        if msg_type == b'N' {
            msg_type = self.read_u8().await?;
        }
        if msg_type != b'R' {
            return Err(HandshakeError::UnexpectedMessage);
        }

        let code = self.read_i32().await?;
        let method =
            nz_auth::AuthMethod::from_code(code).ok_or(HandshakeError::UnsupportedAuthMethod(code))?;
        if self.trace_enabled() {
            tracing::trace!(?method, "server selected authentication method");
        }

        match method {
            nz_auth::AuthMethod::None => Ok(()),
            nz_auth::AuthMethod::Plain => {
                let mut body = password.as_bytes().to_vec();
                body.push(0);
                self.write_all(&nz_protocol::credential_frame(&body)).await
            }
            nz_auth::AuthMethod::Md5 => {
                self.send_salted_credential(password, nz_auth::md5_digest).await
            }
            nz_auth::AuthMethod::Sha256 => {
                self.send_salted_credential(password, nz_auth::sha256_digest)
                    .await
            }
        }
    }

    async fn send_salted_credential(
        &mut self,
        password: &str,
        digest: fn(&nz_auth::Salt, &str) -> String,
    ) -> Result<(), HandshakeError> {
        let salt_bytes = self.read_exact(2).await?;
        let salt: nz_auth::Salt = [salt_bytes[0], salt_bytes[1]];
        let mut body = digest(&salt, password).into_bytes();
        body.push(0);
        self.write_all(&nz_protocol::credential_frame(&body)).await
    }

    /// §4.5. Non-`'R'`/`'N'`/`'E'` messages carry 8 leading filler bytes not
    /// present in standard PostgreSQL framing; preserved verbatim.
    async fn drain_completion(&mut self) -> Result<Option<CancelKey>, HandshakeError> {
        let mut cancel_key = None;
        loop {
            match self.read_u8().await? {
                b'R' => {
                    let code = self.read_i32().await?;
                    if code != 0 {
                        tracing::warn!(code, "non-zero authentication status during drain");
                    }
                }
                b'K' => {
                    self.read_exact(8).await?;
                    let pid = self.read_i32().await?;
                    let secret = self.read_i32().await?;
                    cancel_key = Some(CancelKey { pid, secret });
                }
                b'N' => {
                    self.read_exact(8).await?;
                    let len = self.read_i32().await?;
                    if self.trace_enabled() {
                        tracing::trace!(len, "discarding notice during completion drain");
                    }
                }
                b'Z' => {
                    if self.trace_enabled() {
                        tracing::trace!("ready for query");
                    }
                    break;
                }
                b'E' => {
                    let text = self.read_error_text().await?;
                    return Err(HandshakeError::ServerError(text));
                }
                other => {
                    if self.trace_enabled() {
                        tracing::trace!(msg_type = other, "discarding unrecognized drain message");
                    }
                    self.read_exact(8).await?;
                }
            }
        }
        Ok(cancel_key)
    }

    /// Reads a null-terminated error string, one byte at a time, up to a
    /// 2000-byte cap.
    async fn read_error_text(&mut self) -> Result<String, HandshakeError> {
        let mut buf = Vec::new();
        for _ in 0..2000 {
            let byte = self.read_u8().await?;
            if byte == 0 {
                break;
            }
            buf.push(byte);
        }
        Ok(std::str::from_utf8(&buf)?.to_string())
    }
}
