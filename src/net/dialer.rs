//! Parameterized TLS dialers.
//!
//! Two client configurations back the comprehensive TLS probe:
//!
//! - the **default dialer** offers ALPN `[h2, http/1.1]` with default curve
//!   preferences and observes what the server picks;
//! - the **X25519 dialer** pins TLS 1.3 and offers X25519 as the only key
//!   exchange group, so a completed handshake proves the server supports
//!   X25519 key agreement.
//!
//! Both use a verifier that accepts any certificate: the probe must capture
//! certificate data even from servers that would fail verification, and it
//! records validity as its own finding. Chain trust is established after the
//! handshake via [`TlsDialer::verify_chain`].

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Result};
use rustls::client::danger::{
    HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier,
};
use rustls::client::WebPkiServerVerifier;
use rustls::crypto::ring;
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::{CertificateError, ClientConfig, ProtocolVersion, RootCertStore};
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;

use crate::config::{TLS_PORT, X25519_HANDSHAKE_TIMEOUT};
use crate::error_handling::InitializationError;

/// A certificate verifier that always accepts certificates.
///
/// Certificate validity is a probe finding, not a connection precondition,
/// so the handshake must succeed even against expired or mismatched
/// certificates.
#[derive(Debug)]
struct AcceptAllVerifier;

impl ServerCertVerifier for AcceptAllVerifier {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp: &[u8],
        _now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &rustls::DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        Ok(HandshakeSignatureValid::assertion())
    }

    fn verify_tls13_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &rustls::DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        Ok(HandshakeSignatureValid::assertion())
    }

    fn supported_verify_schemes(&self) -> Vec<rustls::SignatureScheme> {
        vec![
            rustls::SignatureScheme::RSA_PKCS1_SHA256,
            rustls::SignatureScheme::RSA_PKCS1_SHA384,
            rustls::SignatureScheme::RSA_PKCS1_SHA512,
            rustls::SignatureScheme::ECDSA_NISTP256_SHA256,
            rustls::SignatureScheme::ECDSA_NISTP384_SHA384,
            rustls::SignatureScheme::ECDSA_NISTP521_SHA512,
            rustls::SignatureScheme::ED25519,
            rustls::SignatureScheme::ED448,
            rustls::SignatureScheme::RSA_PSS_SHA256,
            rustls::SignatureScheme::RSA_PSS_SHA384,
            rustls::SignatureScheme::RSA_PSS_SHA512,
        ]
    }
}

/// Observations from one completed handshake.
#[derive(Debug)]
pub struct HandshakeReport {
    /// Negotiated protocol version.
    pub protocol_version: Option<ProtocolVersion>,
    /// Negotiated cipher suite, debug-formatted name.
    pub cipher_suite: String,
    /// ALPN settled on `h2`.
    pub alpn_h2: bool,
    /// Peer certificate chain, leaf first.
    pub peer_certs: Vec<CertificateDer<'static>>,
    /// TCP connect + TLS handshake duration.
    pub handshake_time: Duration,
}

impl HandshakeReport {
    /// True when the negotiated version is TLS 1.3.
    pub fn is_tls13(&self) -> bool {
        self.protocol_version == Some(ProtocolVersion::TLSv1_3)
    }

    /// Human-readable protocol version, e.g. `TLSv1_3`.
    pub fn protocol_version_name(&self) -> String {
        self.protocol_version
            .map(|v| format!("{v:?}"))
            .unwrap_or_default()
    }
}

/// Post-handshake chain verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainTrust {
    /// Chain verifies to a trusted root for the probed name.
    Trusted,
    /// Chain verifies, but the certificate does not cover the probed name.
    TrustedNameMismatch,
    /// Chain does not verify.
    Untrusted,
}

impl ChainTrust {
    /// True when the chain itself verifies, regardless of the name check.
    pub fn is_chain_trusted(&self) -> bool {
        !matches!(self, ChainTrust::Untrusted)
    }
}

/// Holds the two client configurations and the trust verifier.
pub struct TlsDialer {
    default_config: Arc<ClientConfig>,
    x25519_config: Arc<ClientConfig>,
    chain_verifier: Arc<WebPkiServerVerifier>,
}

impl TlsDialer {
    /// Builds both dialer configurations and the webpki chain verifier.
    pub fn new() -> Result<Self, InitializationError> {
        let alpn = vec![b"h2".to_vec(), b"http/1.1".to_vec()];

        let mut default_config = ClientConfig::builder()
            .dangerous()
            .with_custom_certificate_verifier(Arc::new(AcceptAllVerifier))
            .with_no_client_auth();
        default_config.alpn_protocols = alpn.clone();

        // Offering X25519 as the sole group makes handshake success
        // equivalent to server-side X25519 support.
        let mut provider = ring::default_provider();
        provider.kx_groups = vec![ring::kx_group::X25519];
        let mut x25519_config = ClientConfig::builder_with_provider(Arc::new(provider))
            .with_protocol_versions(&[&rustls::version::TLS13])?
            .dangerous()
            .with_custom_certificate_verifier(Arc::new(AcceptAllVerifier))
            .with_no_client_auth();
        x25519_config.alpn_protocols = alpn;

        let mut roots = RootCertStore::empty();
        roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
        let chain_verifier = WebPkiServerVerifier::builder(Arc::new(roots))
            .build()
            .map_err(|e| InitializationError::TlsConfigError(rustls::Error::General(e.to_string())))?;

        Ok(Self {
            default_config: Arc::new(default_config),
            x25519_config: Arc::new(x25519_config),
            chain_verifier,
        })
    }

    /// Handshake A: dial `domain:443` with the default configuration and
    /// report what the server negotiated. The whole dial (TCP + TLS) is
    /// bounded by `timeout`.
    pub async fn handshake(&self, domain: &str, timeout: Duration) -> Result<HandshakeReport> {
        self.dial(domain, timeout, Arc::clone(&self.default_config))
            .await
    }

    /// Handshake B: the forced-X25519 probe.
    ///
    /// Returns true iff the pinned handshake completed and negotiated
    /// TLS 1.3; any failure means the server rejected an X25519-only
    /// ClientHello.
    pub async fn handshake_x25519(&self, domain: &str) -> bool {
        match self
            .dial(domain, X25519_HANDSHAKE_TIMEOUT, Arc::clone(&self.x25519_config))
            .await
        {
            Ok(report) => report.is_tls13(),
            Err(_) => false,
        }
    }

    async fn dial(
        &self,
        domain: &str,
        timeout: Duration,
        config: Arc<ClientConfig>,
    ) -> Result<HandshakeReport> {
        let server_name = ServerName::try_from(domain.to_string())
            .map_err(|e| anyhow!("invalid server name {domain}: {e}"))?;
        let connector = TlsConnector::from(config);
        let started = Instant::now();

        let stream = tokio::time::timeout(timeout, async {
            let tcp = TcpStream::connect((domain, TLS_PORT)).await?;
            let tls = connector.connect(server_name, tcp).await?;
            Ok::<_, std::io::Error>(tls)
        })
        .await
        .map_err(|_| anyhow!("TLS handshake timeout for {domain} ({}s)", timeout.as_secs()))?
        .map_err(|e| anyhow!("TLS connection failed for {domain}: {e}"))?;

        let handshake_time = started.elapsed();
        let (_, conn) = stream.get_ref();

        let report = HandshakeReport {
            protocol_version: conn.protocol_version(),
            cipher_suite: conn
                .negotiated_cipher_suite()
                .map(|cs| format!("{:?}", cs.suite()))
                .unwrap_or_default(),
            alpn_h2: conn.alpn_protocol() == Some(b"h2"),
            peer_certs: conn
                .peer_certificates()
                .map(|certs| certs.iter().map(|c| c.clone().into_owned()).collect())
                .unwrap_or_default(),
            handshake_time,
        };
        // Dropping the stream closes the connection; each probe handshake
        // must be fresh.
        drop(stream);
        Ok(report)
    }

    /// Verifies a captured chain against the webpki roots for `domain`.
    ///
    /// A name-only failure still counts as a trusted chain; the SNI match
    /// is judged separately.
    pub fn verify_chain(&self, domain: &str, chain: &[CertificateDer<'static>]) -> ChainTrust {
        let Some((end_entity, intermediates)) = chain.split_first() else {
            return ChainTrust::Untrusted;
        };
        let Ok(server_name) = ServerName::try_from(domain.to_string()) else {
            return ChainTrust::Untrusted;
        };
        let verified = self.chain_verifier.verify_server_cert(
            end_entity,
            intermediates,
            &server_name,
            &[],
            UnixTime::now(),
        );
        match verified {
            Ok(_) => ChainTrust::Trusted,
            Err(rustls::Error::InvalidCertificate(
                CertificateError::NotValidForName
                | CertificateError::NotValidForNameContext { .. },
            )) => ChainTrust::TrustedNameMismatch,
            Err(_) => ChainTrust::Untrusted,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::initialization::init_crypto_provider;

    #[test]
    fn test_dialer_builds() {
        init_crypto_provider();
        let dialer = TlsDialer::new();
        assert!(dialer.is_ok());
    }

    #[test]
    fn test_verify_chain_empty_is_untrusted() {
        init_crypto_provider();
        let dialer = TlsDialer::new().expect("dialer");
        assert_eq!(dialer.verify_chain("example.com", &[]), ChainTrust::Untrusted);
    }

    #[test]
    fn test_verify_chain_garbage_is_untrusted() {
        init_crypto_provider();
        let dialer = TlsDialer::new().expect("dialer");
        let garbage = vec![CertificateDer::from(vec![0u8; 16])];
        assert_eq!(
            dialer.verify_chain("example.com", &garbage),
            ChainTrust::Untrusted
        );
    }

    #[tokio::test]
    async fn test_handshake_connection_refused() {
        init_crypto_provider();
        let dialer = TlsDialer::new().expect("dialer");
        let result = dialer
            .handshake("127.0.0.1", Duration::from_secs(1))
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_x25519_probe_fails_closed() {
        init_crypto_provider();
        let dialer = TlsDialer::new().expect("dialer");
        // No listener: the probe must report "no X25519", never hang.
        assert!(!dialer.handshake_x25519("127.0.0.1").await);
    }

    #[tokio::test]
    #[ignore] // Requires network access - run with `cargo test -- --ignored`
    async fn test_handshake_real_domain() {
        init_crypto_provider();
        let dialer = TlsDialer::new().expect("dialer");
        if let Ok(report) = dialer
            .handshake("cloudflare.com", Duration::from_secs(5))
            .await
        {
            assert!(!report.peer_certs.is_empty());
        }
    }
}
