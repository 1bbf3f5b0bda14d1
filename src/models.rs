//! Detection result data model.
//!
//! One [`DetectionResult`] is created per pipeline invocation, populated by
//! the stages of that invocation only, and consumed by the report renderer.
//! Every sub-record is optional: a `None` sub-record means the owning stage
//! did not run (early exit) or could not produce data.
//!
//! Stage writes are monotone: a later stage may fill an empty sub-record but
//! never overwrites populated fields. The single exception is
//! [`CdnInfo::is_hot_website`], which the hot-website stage sets after the
//! TLS stage has filled the rest of the CDN record.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::error_handling::ProbeError;

/// HTTP status classification for the final response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusCodeCategory {
    /// 200, 401 or 403 — statuses a genuine origin naturally serves.
    Safe,
    /// Any other status on an accessible host.
    Excluded,
    /// The host was not reachable at all.
    #[default]
    Network,
}

/// Classifies a final HTTP status code.
///
/// The safe set {200, 401, 403} is part of the wire contract: Reality
/// clients expect the masquerade target to answer like a normal origin.
pub fn classify_status_code(status_code: u16, accessible: bool) -> StatusCodeCategory {
    if !accessible {
        return StatusCodeCategory::Network;
    }
    match status_code {
        200 | 401 | 403 => StatusCodeCategory::Safe,
        _ => StatusCodeCategory::Excluded,
    }
}

/// Network reachability and redirect-tracing outcome.
#[derive(Debug, Clone, Default)]
pub struct NetworkInfo {
    /// At least one HTTP response was received.
    pub accessible: bool,
    /// Status code of the last response received.
    pub status_code: u16,
    /// URL of the last request issued.
    pub url: String,
    /// Hostname reached after all redirects; the canonical target for every
    /// downstream TLS and fingerprinting check.
    pub final_domain: String,
    /// Whether any cross-host redirect occurred.
    pub is_redirected: bool,
    /// Number of cross-host redirects followed.
    pub redirect_count: usize,
    /// Hostnames visited, starting with the input domain.
    pub redirect_chain: Vec<String>,
    /// First value of each response header on the last hop.
    pub headers: HashMap<String, String>,
    /// Wall-clock time spent tracing redirects.
    pub response_time: Duration,
}

/// TLS capabilities observed across the two handshakes.
#[derive(Debug, Clone, Default)]
pub struct TlsInfo {
    /// Negotiated protocol version, e.g. `TLSv1_3`.
    pub protocol_version: String,
    /// Handshake A negotiated TLS 1.3.
    pub supports_tls13: bool,
    /// The forced-X25519 handshake (handshake B) succeeded at TLS 1.3.
    pub supports_x25519: bool,
    /// ALPN settled on `h2`.
    pub supports_http2: bool,
    /// Negotiated cipher suite name.
    pub cipher_suite: String,
    /// Duration of handshake A (TCP connect + TLS handshake).
    pub handshake_time: Duration,
}

/// SNI behavior observed during handshake A.
#[derive(Debug, Clone, Default)]
pub struct SniInfo {
    /// A connection was established with SNI set (proof of SNI support).
    pub supports_sni: bool,
    /// The served certificate covers the probed server name.
    pub sni_match: bool,
    /// The server name sent in the ClientHello.
    pub server_name: String,
}

/// Leaf certificate details from handshake A.
#[derive(Debug, Clone)]
pub struct CertificateInfo {
    /// In validity period, chain trusted, and hostname covered.
    pub valid: bool,
    /// Issuer distinguished name.
    pub issuer: String,
    /// Subject distinguished name.
    pub subject: String,
    /// Validity period start.
    pub not_before: DateTime<Utc>,
    /// Validity period end.
    pub not_after: DateTime<Utc>,
    /// Whole days until `not_after`; only meaningful when `valid`.
    pub days_until_expiry: i64,
    /// DNS names from the Subject Alternative Name extension.
    pub certificate_sans: Vec<String>,
}

/// GeoIP lookup outcome for the resolved address.
#[derive(Debug, Clone, Default)]
pub struct LocationInfo {
    /// Country name (Simplified Chinese preferred, then English, then ISO).
    pub country: String,
    /// The address geolocates to mainland China.
    pub is_domestic: bool,
    /// The address the probe connected to.
    pub ip_address: String,
}

/// GFW blocklist match outcome.
#[derive(Debug, Clone, Default)]
pub struct BlockedInfo {
    /// Domain matched the blocklist.
    pub is_blocked: bool,
    /// The matching rules, when blocked.
    pub blocked_reasons: Vec<String>,
    /// Matching mechanism, currently always `gfwlist`.
    pub match_type: String,
}

/// Confidence tier of a CDN verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum CdnConfidence {
    /// Certificate-issuer hint only.
    Low,
    /// Generic CDN response header.
    Medium,
    /// Strong CDN-only header or header value naming a CDN domain.
    High,
}

impl CdnConfidence {
    /// User-facing label.
    pub fn label(&self) -> &'static str {
        match self {
            CdnConfidence::High => "高",
            CdnConfidence::Medium => "中",
            CdnConfidence::Low => "低",
        }
    }
}

/// CDN fingerprint and hot-website flag.
#[derive(Debug, Clone)]
pub struct CdnInfo {
    /// A CDN signal matched.
    pub is_cdn: bool,
    /// Provider label; informational only, usually the literal `CDN`.
    pub cdn_provider: String,
    /// Confidence tier of the strongest matching signal.
    pub confidence: Option<CdnConfidence>,
    /// Human-readable evidence for the match.
    pub evidence: String,
    /// The final domain appears on the hot-website list.
    pub is_hot_website: bool,
}

impl CdnInfo {
    /// A record carrying only the hot-website flag.
    pub fn hot_only(is_hot_website: bool) -> Self {
        Self {
            is_cdn: false,
            cdn_provider: String::new(),
            confidence: None,
            evidence: String::new(),
            is_hot_website,
        }
    }
}

/// The single record a pipeline invocation populates.
#[derive(Debug, Clone)]
pub struct DetectionResult {
    /// Input domain, lowercased and trimmed.
    pub domain: String,
    /// Pipeline start time.
    pub start_time: DateTime<Utc>,
    /// Wall-clock span of the pipeline execution.
    pub duration: Duration,
    /// Final verdict, set exactly once by the suitability evaluator.
    pub suitable: bool,
    /// Reason accompanying `suitable == false`, or a technical error.
    pub error: Option<ProbeError>,
    /// A blocking stage short-circuited the pipeline.
    pub early_exit: bool,
    /// Classification of the final HTTP status.
    pub status_code_category: StatusCodeCategory,
    /// True iff `suitable`.
    pub hard_requirements_met: bool,

    /// Redirect-tracing outcome.
    pub network: Option<NetworkInfo>,
    /// TLS probe outcome.
    pub tls: Option<TlsInfo>,
    /// SNI outcome.
    pub sni: Option<SniInfo>,
    /// Certificate outcome.
    pub certificate: Option<CertificateInfo>,
    /// GeoIP outcome.
    pub location: Option<LocationInfo>,
    /// Blocklist outcome.
    pub blocked: Option<BlockedInfo>,
    /// CDN and hot-website outcome.
    pub cdn: Option<CdnInfo>,
}

impl DetectionResult {
    /// Creates an empty result for `domain` stamped with the current time.
    pub fn new(domain: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            start_time: Utc::now(),
            duration: Duration::ZERO,
            suitable: false,
            error: None,
            early_exit: false,
            status_code_category: StatusCodeCategory::Network,
            hard_requirements_met: false,
            network: None,
            tls: None,
            sni: None,
            certificate: None,
            location: None,
            blocked: None,
            cdn: None,
        }
    }

    /// Hostname downstream stages must target: the redirect-resolved final
    /// domain when available, the input domain otherwise.
    pub fn effective_domain(&self) -> &str {
        match &self.network {
            Some(network) if !network.final_domain.is_empty() => &network.final_domain,
            _ => &self.domain,
        }
    }

    /// Merges sub-records produced by a concurrent stage snapshot.
    ///
    /// Writes are monotone: only empty sub-records are filled. The
    /// hot-website flag is the documented exception and is OR-ed into an
    /// already-populated CDN record.
    pub fn merge_stage_output(&mut self, other: DetectionResult) {
        if self.tls.is_none() {
            self.tls = other.tls;
        }
        if self.sni.is_none() {
            self.sni = other.sni;
        }
        if self.certificate.is_none() {
            self.certificate = other.certificate;
        }
        if self.location.is_none() {
            self.location = other.location;
        }
        if self.blocked.is_none() {
            self.blocked = other.blocked;
        }
        if self.network.is_none() {
            self.network = other.network;
        }
        match (&mut self.cdn, other.cdn) {
            (Some(existing), Some(incoming)) => {
                existing.is_hot_website |= incoming.is_hot_website;
                // The hot-website stage contributes a flag-only record; a
                // real verdict arriving second must still land.
                if !existing.is_cdn && incoming.is_cdn {
                    existing.is_cdn = true;
                    existing.cdn_provider = incoming.cdn_provider;
                    existing.confidence = incoming.confidence;
                    existing.evidence = incoming.evidence;
                }
            }
            (slot @ None, Some(incoming)) => *slot = Some(incoming),
            _ => {}
        }
    }
}
