//! Comprehensive TLS probe stage.
//!
//! Reality needs a target that speaks TLS 1.3 with X25519 key agreement,
//! negotiates HTTP/2, and serves a valid certificate for the probed name.
//! A single handshake cannot observe the server's key-share preferences, so
//! the probe performs two:
//!
//! - **Handshake A** (observation): default dialer, ALPN `[h2, http/1.1]`.
//!   Yields the negotiated version, cipher suite, ALPN outcome, the
//!   certificate chain, and the handshake latency.
//! - **Handshake B** (X25519 probe): TLS 1.3 pinned, X25519 as the only
//!   offered group. A server that refuses this ClientHello does not support
//!   X25519 key agreement.
//!
//! Handshake B is skipped when handshake A already disqualifies the domain.
//! Afterwards, if no CDN verdict exists yet, a post-pass derives one from
//! the captured response headers and certificate issuer.

use async_trait::async_trait;
use chrono::Utc;
use log::debug;

use crate::detect::{DetectionStage, ProbeRun};
use crate::error_handling::ProbeError;
use crate::models::{CdnInfo, CertificateInfo, SniInfo, TlsInfo};
use crate::net::parse_leaf_certificate;

/// The two-handshake TLS probe.
pub struct ComprehensiveTlsStage;

#[async_trait]
impl DetectionStage for ComprehensiveTlsStage {
    fn name(&self) -> &'static str {
        "comprehensive_tls"
    }

    fn priority(&self) -> u8 {
        8
    }

    fn blocking(&self) -> bool {
        false
    }

    async fn execute(&self, run: &mut ProbeRun) -> Result<(), ProbeError> {
        let final_domain = run.result.effective_domain().to_string();
        let cancel = run.env.cancel.clone();

        let handshake = tokio::select! {
            _ = cancel.cancelled() => return Err(ProbeError::Cancelled),
            handshake = run
                .env
                .dialer
                .handshake(&final_domain, run.env.config.network_timeout) => handshake,
        };

        match handshake {
            Ok(report) => {
                let supports_tls13 = report.is_tls13();
                let supports_http2 = report.alpn_h2;
                let mut sni_match = false;
                let mut certificate = None;

                if let Some(leaf_der) = report.peer_certs.first() {
                    match parse_leaf_certificate(leaf_der) {
                        Ok(leaf) => {
                            sni_match = leaf.covers(&final_domain);
                            let now = Utc::now();
                            let in_validity = now >= leaf.not_before && now <= leaf.not_after;
                            let chain_trusted = run
                                .env
                                .dialer
                                .verify_chain(&final_domain, &report.peer_certs)
                                .is_chain_trusted();
                            let valid = in_validity && chain_trusted && sni_match;
                            let days_until_expiry = if valid {
                                (leaf.not_after - now).num_days()
                            } else {
                                0
                            };
                            certificate = Some(CertificateInfo {
                                valid,
                                issuer: leaf.issuer,
                                subject: leaf.subject,
                                not_before: leaf.not_before,
                                not_after: leaf.not_after,
                                days_until_expiry,
                                certificate_sans: leaf.sans,
                            });
                        }
                        Err(e) => debug!("certificate parse failed for {final_domain}: {e}"),
                    }
                }

                run.result.tls = Some(TlsInfo {
                    protocol_version: report.protocol_version_name(),
                    supports_tls13,
                    supports_x25519: false,
                    supports_http2,
                    cipher_suite: report.cipher_suite.clone(),
                    handshake_time: report.handshake_time,
                });
                run.result.sni = Some(SniInfo {
                    // A completed handshake against a named endpoint proves
                    // the server honored the SNI extension.
                    supports_sni: true,
                    sni_match,
                    server_name: final_domain.clone(),
                });
                run.result.certificate = certificate;

                let cert_valid = run
                    .result
                    .certificate
                    .as_ref()
                    .is_some_and(|c| c.valid);
                if supports_tls13 && supports_http2 && sni_match && cert_valid {
                    let supports_x25519 = tokio::select! {
                        _ = cancel.cancelled() => return Err(ProbeError::Cancelled),
                        supported = run.env.dialer.handshake_x25519(&final_domain) => supported,
                    };
                    if let Some(tls) = run.result.tls.as_mut() {
                        tls.supports_x25519 = supports_x25519;
                    }
                }
            }
            Err(e) => {
                debug!("TLS handshake failed for {final_domain}: {e}");
                run.result.tls = Some(TlsInfo::default());
                run.result.sni = Some(SniInfo {
                    supports_sni: false,
                    sni_match: false,
                    server_name: final_domain.clone(),
                });
            }
        }

        self.cdn_post_pass(run);
        Ok(())
    }
}

impl ComprehensiveTlsStage {
    /// Derives a CDN verdict from already-captured signals when no stage has
    /// produced one: response headers (high/medium tiers) and the
    /// certificate issuer (low tier).
    fn cdn_post_pass(&self, run: &mut ProbeRun) {
        if run.result.cdn.is_some() {
            return;
        }
        let headers = run.result.network.as_ref().map(|n| &n.headers);
        let issuer = run.result.certificate.as_ref().map(|c| c.issuer.as_str());
        if let Some(m) = run.env.assets.cdn_keywords.classify(headers, issuer) {
            run.result.cdn = Some(CdnInfo {
                is_cdn: true,
                cdn_provider: m.provider,
                confidence: Some(m.confidence),
                evidence: m.evidence,
                is_hot_website: false,
            });
        }
    }
}
