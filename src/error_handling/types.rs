//! Error type definitions.

use log::SetLoggerError;
use thiserror::Error;

/// Error types for initialization failures.
#[derive(Error, Debug)]
pub enum InitializationError {
    /// Error initializing the logger.
    #[error("Logger initialization error: {0}")]
    LoggerError(#[from] SetLoggerError),

    /// Error initializing the HTTP client.
    #[error("HTTP client initialization error: {0}")]
    HttpClientError(#[from] reqwest::Error),

    /// Error building a TLS client configuration.
    #[error("TLS configuration error: {0}")]
    TlsConfigError(#[from] rustls::Error),
}

/// Coarse classification of a [`ProbeError`].
///
/// The batch aggregator counts `ExpectedNegative` results as successful
/// probes: the network work completed and produced a definitive verdict.
/// Only `Technical` results count as failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The probe succeeded and the domain is definitively unsuitable.
    ExpectedNegative,
    /// The probe could not decide (DNS/TCP failure, timeout, stage fault).
    Technical,
}

/// Every negative outcome a domain probe can produce.
///
/// Display strings are the user-facing vocabulary of the progress log and
/// report tables; [`ProbeError::kind_name`] provides stable mnemonic names
/// for matching in code and tests.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProbeError {
    /// Domain matches the GFW blocklist (exact or wildcard rule).
    #[error("域名被墙（{rule}）")]
    Blocked {
        /// The list entry that matched.
        rule: String,
    },

    /// The resolved IP geolocates to China.
    #[error("国内网站（仅参考GeoIP）")]
    Domestic,

    /// DNS resolution or the TCP connectivity probe failed.
    #[error("网络不可达")]
    Unreachable,

    /// DNS resolution failed with a specific resolver error.
    #[error("IP解析失败: {message}")]
    ResolveFailed {
        /// Resolver error detail.
        message: String,
    },

    /// The final response status is outside the safe set {200, 401, 403}.
    #[error("状态码不自然: {code}")]
    UnnaturalStatus {
        /// The offending HTTP status code.
        code: u16,
    },

    /// The server did not negotiate TLS 1.3.
    #[error("不支持TLS 1.3")]
    NoTls13,

    /// The forced-X25519 handshake failed.
    #[error("不支持X25519密钥交换")]
    NoX25519,

    /// ALPN did not settle on h2.
    #[error("不支持HTTP/2")]
    NoHttp2,

    /// Certificate failed validity, chain or hostname checks.
    #[error("证书无效")]
    CertInvalid,

    /// Certificate is past (or at) its expiry date.
    #[error("证书已过期（{days}天）")]
    CertExpired {
        /// Days until expiry at probe time (zero or negative).
        days: i64,
    },

    /// The certificate does not cover the probed server name.
    #[error("SNI不匹配")]
    SniMismatch,

    /// A stage or pipeline deadline elapsed.
    #[error("检测超时")]
    Timeout,

    /// A concurrent stage panicked; contained by the panic barrier.
    #[error("检测阶段 {stage} panic: {message}")]
    StagePanic {
        /// Name of the faulting stage.
        stage: &'static str,
        /// Stringified panic payload.
        message: String,
    },

    /// The surrounding batch was cancelled.
    #[error("检测已取消")]
    Cancelled,
}

impl ProbeError {
    /// Stable mnemonic for the error variant.
    pub fn kind_name(&self) -> &'static str {
        match self {
            ProbeError::Blocked { .. } => "blocked",
            ProbeError::Domestic => "domestic",
            ProbeError::Unreachable | ProbeError::ResolveFailed { .. } => "unreachable",
            ProbeError::UnnaturalStatus { .. } => "unnatural-status",
            ProbeError::NoTls13 => "no-tls13",
            ProbeError::NoX25519 => "no-x25519",
            ProbeError::NoHttp2 => "no-http2",
            ProbeError::CertInvalid => "cert-invalid",
            ProbeError::CertExpired { .. } => "cert-expired",
            ProbeError::SniMismatch => "sni-mismatch",
            ProbeError::Timeout => "timeout",
            ProbeError::StagePanic { .. } => "panic",
            ProbeError::Cancelled => "cancelled",
        }
    }

    /// Classifies the error for batch aggregation.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ProbeError::Blocked { .. }
            | ProbeError::Domestic
            | ProbeError::UnnaturalStatus { .. }
            | ProbeError::NoTls13
            | ProbeError::NoX25519
            | ProbeError::NoHttp2
            | ProbeError::CertInvalid
            | ProbeError::CertExpired { .. }
            | ProbeError::SniMismatch => ErrorKind::ExpectedNegative,
            ProbeError::Unreachable
            | ProbeError::ResolveFailed { .. }
            | ProbeError::Timeout
            | ProbeError::StagePanic { .. }
            | ProbeError::Cancelled => ErrorKind::Technical,
        }
    }

    /// True when the probe produced a definitive negative verdict.
    pub fn is_expected_negative(&self) -> bool {
        self.kind() == ErrorKind::ExpectedNegative
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expected_negative_classification() {
        for err in [
            ProbeError::Blocked {
                rule: "x.example".into(),
            },
            ProbeError::Domestic,
            ProbeError::UnnaturalStatus { code: 404 },
            ProbeError::NoTls13,
            ProbeError::NoX25519,
            ProbeError::NoHttp2,
            ProbeError::CertInvalid,
            ProbeError::CertExpired { days: -3 },
            ProbeError::SniMismatch,
        ] {
            assert!(err.is_expected_negative(), "{err} should be a verdict");
        }
    }

    #[test]
    fn test_technical_classification() {
        for err in [
            ProbeError::Unreachable,
            ProbeError::ResolveFailed {
                message: "NXDOMAIN".into(),
            },
            ProbeError::Timeout,
            ProbeError::StagePanic {
                stage: "comprehensive_tls",
                message: "boom".into(),
            },
            ProbeError::Cancelled,
        ] {
            assert_eq!(err.kind(), ErrorKind::Technical, "{err} should be technical");
        }
    }

    #[test]
    fn test_kind_names_match_wire_vocabulary() {
        assert_eq!(
            ProbeError::Blocked { rule: String::new() }.kind_name(),
            "blocked"
        );
        assert_eq!(ProbeError::Domestic.kind_name(), "domestic");
        assert_eq!(ProbeError::NoX25519.kind_name(), "no-x25519");
        assert_eq!(ProbeError::CertExpired { days: 0 }.kind_name(), "cert-expired");
        assert_eq!(ProbeError::SniMismatch.kind_name(), "sni-mismatch");
        assert_eq!(
            ProbeError::ResolveFailed {
                message: String::new()
            }
            .kind_name(),
            "unreachable"
        );
    }

    #[test]
    fn test_display_strings() {
        let err = ProbeError::Blocked {
            rule: "*.blocked.example".into(),
        };
        assert_eq!(err.to_string(), "域名被墙（*.blocked.example）");
        assert_eq!(
            ProbeError::UnnaturalStatus { code: 503 }.to_string(),
            "状态码不自然: 503"
        );
        assert_eq!(
            ProbeError::CertExpired { days: -2 }.to_string(),
            "证书已过期（-2天）"
        );
    }
}
