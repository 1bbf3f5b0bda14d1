//! CDN keyword tables.
//!
//! The keyword file is partitioned into labelled sections (`<section>:`), one
//! flat keyword per line, with optional trailing `# comment` stripped before
//! matching. Matching runs in confidence tiers, high → medium → low, first
//! match wins within a tier:
//!
//! - High: a strong CDN-only response header is present, or a response
//!   header value contains a known CDN domain.
//! - Medium: a generic CDN header is present.
//! - Low: the certificate issuer carries a CDN hint.
//!
//! The CNAME/NS/ASN sections are parsed and retained for completeness but
//! the probe derives its verdict from data it has already captured; the
//! provider label is informational and stays the literal `CDN`.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;

use log::{debug, warn};

use crate::models::CdnConfidence;

/// Built-in issuer hints used when the keyword file lacks a
/// `cert_issuer_hint` section.
const FALLBACK_ISSUER_HINTS: [&str; 4] = ["cloudflare", "amazon", "google", "akamai"];

/// A tiered CDN match.
#[derive(Debug, Clone)]
pub struct CdnMatch {
    /// Provider label (informational).
    pub provider: String,
    /// Confidence tier of the signal.
    pub confidence: CdnConfidence,
    /// Human-readable evidence.
    pub evidence: String,
}

/// Parsed keyword sections.
#[derive(Debug, Default)]
pub struct CdnKeywords {
    cname_strong_suffix: HashSet<String>,
    http_strong_header: HashSet<String>,
    http_medium_header: HashSet<String>,
    http_value_cdn_domains: HashSet<String>,
    asn_strong_exact: HashSet<String>,
    ns_hint_suffix: HashSet<String>,
    cert_issuer_hint: HashSet<String>,
    exclude_server_tokens: HashSet<String>,
    exclude_keywords_generic: HashSet<String>,
}

impl CdnKeywords {
    /// Loads the keyword file at `path`; a missing file yields empty tables.
    pub fn load(path: &Path) -> Self {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) => {
                warn!("failed to read CDN keyword file {}: {e}", path.display());
                return Self::default();
            }
        };
        let keywords = Self::parse(&content);
        debug!(
            "loaded CDN keywords: {} strong headers, {} medium headers, {} value domains, {} issuer hints",
            keywords.http_strong_header.len(),
            keywords.http_medium_header.len(),
            keywords.http_value_cdn_domains.len(),
            keywords.cert_issuer_hint.len(),
        );
        keywords
    }

    /// Parses the section-delimited format.
    pub fn parse(content: &str) -> Self {
        let mut keywords = Self::default();
        let mut current_section = String::new();

        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if let Some(section) = line.strip_suffix(':') {
                current_section = section.to_string();
                continue;
            }
            // Trailing comments are documentation, not part of the keyword.
            let keyword = line
                .split('#')
                .next()
                .unwrap_or_default()
                .trim()
                .to_lowercase();
            if keyword.is_empty() {
                continue;
            }
            let target = match current_section.as_str() {
                "cname_strong_suffix" => &mut keywords.cname_strong_suffix,
                "http_strong_header" => &mut keywords.http_strong_header,
                "http_medium_header" => &mut keywords.http_medium_header,
                "http_value_cdn_domains" => &mut keywords.http_value_cdn_domains,
                "asn_strong_exact" => &mut keywords.asn_strong_exact,
                "ns_hint_suffix" => &mut keywords.ns_hint_suffix,
                "cert_issuer_hint" => &mut keywords.cert_issuer_hint,
                "exclude_server_tokens" => &mut keywords.exclude_server_tokens,
                "exclude_keywords_generic" => &mut keywords.exclude_keywords_generic,
                _ => continue,
            };
            target.insert(keyword);
        }

        keywords
    }

    /// Classifies response headers and a certificate issuer into a tiered
    /// CDN verdict.
    pub fn classify(
        &self,
        headers: Option<&HashMap<String, String>>,
        issuer: Option<&str>,
    ) -> Option<CdnMatch> {
        if let Some(headers) = headers {
            if let Some(m) = self.match_strong_header(headers) {
                return Some(m);
            }
            if let Some(m) = self.match_value_domains(headers) {
                return Some(m);
            }
            if let Some(m) = self.match_medium_header(headers) {
                return Some(m);
            }
        }
        self.match_issuer_hint(issuer?)
    }

    fn match_strong_header(&self, headers: &HashMap<String, String>) -> Option<CdnMatch> {
        for keyword in &self.http_strong_header {
            // `server: token` entries match against the Server header value.
            if let Some(token) = keyword.strip_prefix("server: ") {
                let hit = headers.iter().find(|(name, value)| {
                    name.eq_ignore_ascii_case("server") && value.to_lowercase().contains(token)
                });
                if let Some((_, value)) = hit {
                    return Some(CdnMatch {
                        provider: "CDN".into(),
                        confidence: CdnConfidence::High,
                        evidence: format!("HTTP强响应头特征: Server={value}"),
                    });
                }
                continue;
            }
            if let Some((name, value)) = headers
                .iter()
                .find(|(name, _)| name.eq_ignore_ascii_case(keyword))
            {
                return Some(CdnMatch {
                    provider: "CDN".into(),
                    confidence: CdnConfidence::High,
                    evidence: format!("HTTP强响应头特征: {name}={value}"),
                });
            }
        }
        None
    }

    fn match_value_domains(&self, headers: &HashMap<String, String>) -> Option<CdnMatch> {
        for (name, value) in headers {
            let value_lower = value.to_lowercase();
            for domain in &self.http_value_cdn_domains {
                if value_lower.contains(domain) {
                    return Some(CdnMatch {
                        provider: "CDN".into(),
                        confidence: CdnConfidence::High,
                        evidence: format!("HTTP头值CDN域名特征: {name}包含{domain}"),
                    });
                }
            }
        }
        None
    }

    fn match_medium_header(&self, headers: &HashMap<String, String>) -> Option<CdnMatch> {
        for keyword in &self.http_medium_header {
            if let Some((name, value)) = headers
                .iter()
                .find(|(name, _)| name.eq_ignore_ascii_case(keyword))
            {
                return Some(CdnMatch {
                    provider: "CDN".into(),
                    confidence: CdnConfidence::Medium,
                    evidence: format!("HTTP中等响应头特征: {name}={value}"),
                });
            }
        }
        None
    }

    fn match_issuer_hint(&self, issuer: &str) -> Option<CdnMatch> {
        let issuer_lower = issuer.to_lowercase();
        let matched = if self.cert_issuer_hint.is_empty() {
            FALLBACK_ISSUER_HINTS
                .iter()
                .any(|hint| issuer_lower.contains(hint))
        } else {
            self.cert_issuer_hint
                .iter()
                .any(|hint| issuer_lower.contains(hint))
        };
        matched.then(|| CdnMatch {
            provider: "CDN".into(),
            confidence: CdnConfidence::Low,
            evidence: format!("证书签发者提示: {issuer}"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
# CDN fingerprint keywords
cname_strong_suffix:
cloudfront.net   # Amazon CloudFront
http_strong_header:
cf-ray
x-amz-cf-id
server: cloudflare
http_medium_header:
x-cache
http_value_cdn_domains:
fastly.net
cert_issuer_hint:
cloudflare
asn_strong_exact:
AS13335
";

    fn headers(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_section_dispatch_and_comment_stripping() {
        let kw = CdnKeywords::parse(SAMPLE);
        assert!(kw.cname_strong_suffix.contains("cloudfront.net"));
        assert!(kw.http_strong_header.contains("cf-ray"));
        assert!(kw.asn_strong_exact.contains("as13335"));
    }

    #[test]
    fn test_strong_header_wins_as_high() {
        let kw = CdnKeywords::parse(SAMPLE);
        let m = kw
            .classify(Some(&headers(&[("cf-ray", "8a1b-SJC")])), None)
            .expect("match");
        assert_eq!(m.confidence, CdnConfidence::High);
        assert!(m.evidence.contains("cf-ray"));
    }

    #[test]
    fn test_server_token_form() {
        let kw = CdnKeywords::parse(SAMPLE);
        let m = kw
            .classify(Some(&headers(&[("server", "Cloudflare")])), None)
            .expect("match");
        assert_eq!(m.confidence, CdnConfidence::High);
    }

    #[test]
    fn test_header_value_domain_is_high() {
        let kw = CdnKeywords::parse(SAMPLE);
        let m = kw
            .classify(
                Some(&headers(&[("x-served-by", "cache-sjc10029-FASTLY.net")])),
                None,
            )
            .expect("match");
        assert_eq!(m.confidence, CdnConfidence::High);
    }

    #[test]
    fn test_medium_header_tier() {
        let kw = CdnKeywords::parse(SAMPLE);
        let m = kw
            .classify(Some(&headers(&[("x-cache", "HIT")])), None)
            .expect("match");
        assert_eq!(m.confidence, CdnConfidence::Medium);
    }

    #[test]
    fn test_issuer_hint_is_low_tier() {
        let kw = CdnKeywords::parse(SAMPLE);
        let m = kw
            .classify(None, Some("CN=Cloudflare Inc ECC CA-3"))
            .expect("match");
        assert_eq!(m.confidence, CdnConfidence::Low);
        assert!(m.evidence.contains("Cloudflare"));
    }

    #[test]
    fn test_issuer_fallback_hints_when_section_empty() {
        let kw = CdnKeywords::default();
        assert!(kw.classify(None, Some("Amazon RSA 2048 M02")).is_some());
        assert!(kw.classify(None, Some("Let's Encrypt R11")).is_none());
    }

    #[test]
    fn test_tiers_scan_high_to_medium() {
        let kw = CdnKeywords::parse(SAMPLE);
        let hdrs = headers(&[("x-cache", "HIT"), ("cf-ray", "8a1b")]);
        let m = kw.classify(Some(&hdrs), None).expect("match");
        assert_eq!(m.confidence, CdnConfidence::High);
    }

    #[test]
    fn test_no_signal_no_match() {
        let kw = CdnKeywords::parse(SAMPLE);
        assert!(kw
            .classify(Some(&headers(&[("content-type", "text/html")])), None)
            .is_none());
    }
}
