//! Leaf certificate parsing and hostname matching.

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use rustls::pki_types::CertificateDer;
use x509_parser::extensions::{GeneralName, ParsedExtension};
use x509_parser::prelude::FromDer;

/// Fields extracted from the leaf certificate.
#[derive(Debug, Clone)]
pub struct LeafCertificate {
    /// Issuer distinguished name.
    pub issuer: String,
    /// Subject distinguished name.
    pub subject: String,
    /// Subject common name, when present.
    pub common_name: Option<String>,
    /// Validity period start.
    pub not_before: DateTime<Utc>,
    /// Validity period end.
    pub not_after: DateTime<Utc>,
    /// DNS names from the Subject Alternative Name extension.
    pub sans: Vec<String>,
}

/// Parses the leaf certificate of a captured chain.
pub fn parse_leaf_certificate(der: &CertificateDer<'_>) -> Result<LeafCertificate> {
    let (_, cert) = x509_parser::certificate::X509Certificate::from_der(der.as_ref())
        .map_err(|e| anyhow!("certificate parse error: {e}"))?;

    let subject = cert.subject().to_string();
    let issuer = cert.issuer().to_string();
    let common_name = cert
        .subject()
        .iter_common_name()
        .next()
        .and_then(|cn| cn.as_str().ok())
        .map(str::to_string);

    let not_before = DateTime::<Utc>::from_timestamp(cert.validity().not_before.timestamp(), 0)
        .ok_or_else(|| anyhow!("not_before out of range"))?;
    let not_after = DateTime::<Utc>::from_timestamp(cert.validity().not_after.timestamp(), 0)
        .ok_or_else(|| anyhow!("not_after out of range"))?;

    let mut sans = Vec::new();
    for ext in cert.extensions() {
        if let ParsedExtension::SubjectAlternativeName(san) = ext.parsed_extension() {
            for general_name in &san.general_names {
                if let GeneralName::DNSName(dns_name) = general_name {
                    sans.push((*dns_name).to_string());
                }
            }
        }
    }

    Ok(LeafCertificate {
        issuer,
        subject,
        common_name,
        not_before,
        not_after,
        sans,
    })
}

impl LeafCertificate {
    /// Whether this certificate covers `domain`.
    ///
    /// SANs are authoritative; the subject common name is only consulted
    /// when the certificate carries no DNS SANs (legacy issuance).
    pub fn covers(&self, domain: &str) -> bool {
        if !self.sans.is_empty() {
            return hostname_matches(domain, &self.sans);
        }
        match &self.common_name {
            Some(cn) => hostname_matches(domain, std::slice::from_ref(cn)),
            None => false,
        }
    }
}

/// Matches `domain` against certificate name patterns.
///
/// Wildcards cover exactly one leftmost label, per RFC 6125.
pub fn hostname_matches<S: AsRef<str>>(domain: &str, patterns: &[S]) -> bool {
    let domain = domain.to_lowercase();
    patterns.iter().any(|pattern| {
        let pattern = pattern.as_ref().to_lowercase();
        match pattern.strip_prefix("*.") {
            Some(suffix) => match domain.split_once('.') {
                Some((label, rest)) => !label.is_empty() && rest == suffix,
                None => false,
            },
            None => pattern == domain,
        }
    })
}
