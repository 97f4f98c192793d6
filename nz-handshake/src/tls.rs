//! Builds the `rustls::ClientConfig` used for the in-band TLS upgrade in
//! §4.3c, and the upgrade itself.

use std::sync::Arc;

use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::client::WebPkiServerVerifier;
use rustls::{ClientConfig, DigitallySignedStruct, RootCertStore, SignatureScheme};
use rustls_pki_types::{CertificateDer, ServerName, UnixTime};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_rustls::TlsConnector;

use crate::config::{TlsConfig, TlsVerify};
use crate::error::HandshakeError;
use crate::transport::MaybeTlsStream;

/// A verifier that accepts any certificate the server presents. Only ever
/// installed when the caller explicitly asked for [`TlsVerify::Insecure`].
#[derive(Debug)]
struct NullVerifier;

impl ServerCertVerifier for NullVerifier {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        Ok(HandshakeSignatureValid::assertion())
    }

    fn verify_tls13_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        Ok(HandshakeSignatureValid::assertion())
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        use SignatureScheme::*;
        vec![
            RSA_PKCS1_SHA1,
            ECDSA_SHA1_Legacy,
            RSA_PKCS1_SHA256,
            ECDSA_NISTP256_SHA256,
            RSA_PKCS1_SHA384,
            ECDSA_NISTP384_SHA384,
            RSA_PKCS1_SHA512,
            ECDSA_NISTP521_SHA512,
            RSA_PSS_SHA256,
            RSA_PSS_SHA384,
            RSA_PSS_SHA512,
            ED25519,
            ED448,
        ]
    }
}

fn build_verifier(config: &TlsConfig) -> Result<Arc<dyn ServerCertVerifier>, HandshakeError> {
    if config.verify == TlsVerify::Insecure {
        return Ok(Arc::new(NullVerifier));
    }

    if config.root_certs.is_empty() {
        return Ok(Arc::new(rustls_platform_verifier::Verifier::new()));
    }

    let mut roots = RootCertStore::empty();
    let (loaded, ignored) = roots.add_parsable_certificates(config.root_certs.iter().cloned());
    if loaded == 0 || ignored > 0 {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "invalid TLS root certificate",
        )
        .into());
    }
    Ok(WebPkiServerVerifier::builder(Arc::new(roots))
        .build()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?)
}

fn build_client_config(config: &TlsConfig) -> Result<Arc<ClientConfig>, HandshakeError> {
    let _ = rustls::crypto::ring::default_provider().install_default();

    let verifier = build_verifier(config)?;
    let builder = ClientConfig::builder()
        .dangerous()
        .with_custom_certificate_verifier(verifier);

    let client_config = if let Some((cert, key)) = config.client_identity.clone() {
        builder
            .with_client_auth_cert(vec![cert], key)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?
    } else {
        builder.with_no_client_auth()
    };

    Ok(Arc::new(client_config))
}

/// Perform the in-band TLS handshake over `stream`, replacing the cleartext
/// connection with a secure one. Per §4.3c / §9, the receive buffer must be
/// empty at this point: the server is not expected to send cleartext bytes
/// after accepting `'S'`.
pub(crate) async fn upgrade<S>(
    stream: S,
    host: &str,
    config: &TlsConfig,
) -> Result<MaybeTlsStream<S>, HandshakeError>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    let client_config = build_client_config(config)?;
    let connector = TlsConnector::from(client_config);
    let server_name = ServerName::try_from(host.to_string())
        .map_err(|_| std::io::Error::new(std::io::ErrorKind::InvalidInput, "invalid host name"))?;

    let tls_stream = connector
        .connect(server_name, stream)
        .await
        .map_err(HandshakeError::TlsHandshakeFailed)?;

    Ok(MaybeTlsStream::Tls(Box::new(tls_stream)))
}
