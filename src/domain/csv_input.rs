//! CSV domain extraction.
//!
//! Reads a RealiTLScanner-format CSV (header row plus records, column
//! index 2 = `CERT_DOMAIN`) and extracts probe candidates. Scanner output
//! is noisy, so a fixed exclusion pass drops entries that can never be
//! masquerade targets: wildcard names, appliance placeholder certificates,
//! bare IPv4 literals, and obviously malformed names.

use std::path::Path;

use anyhow::{Context, Result};

/// Case-insensitive substrings that mark a certificate domain as noise.
const EXCLUDE_PATTERNS: [&str; 7] = [
    "localhost",
    "server.domain.com",
    "johnnasmalley.hostname",
    "Kubernetes Ingress Controller Fake Certificate",
    "CloudFlare Origin Certificate",
    "FortiGate",
    "Unspecified",
];

/// Column index of `CERT_DOMAIN` in RealiTLScanner output.
const CERT_DOMAIN_COLUMN: usize = 2;

/// Extracts de-duplicated candidate domains from `path`.
pub fn extract_domains_from_csv(path: &Path) -> Result<Vec<String>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("无法打开CSV文件 '{}'", path.display()))?;

    let mut domains = Vec::new();
    let mut seen = std::collections::HashSet::new();

    for record in reader.records() {
        let record = record.context("解析CSV文件失败")?;
        let Some(cert_domain) = record.get(CERT_DOMAIN_COLUMN) else {
            continue;
        };
        let cert_domain = cert_domain.trim().trim_matches('"');
        if cert_domain.is_empty() || should_exclude_domain(cert_domain) {
            continue;
        }
        if seen.insert(cert_domain.to_string()) {
            domains.push(cert_domain.to_string());
        }
    }

    Ok(domains)
}

/// Exclusion rules for scanner output.
pub fn should_exclude_domain(domain: &str) -> bool {
    if domain.contains('*') {
        return true;
    }

    let domain_lower = domain.to_lowercase();
    if EXCLUDE_PATTERNS
        .iter()
        .any(|pattern| domain_lower.contains(&pattern.to_lowercase()))
    {
        return true;
    }

    if is_dotted_quad(domain) {
        return true;
    }

    if domain.len() < 3 {
        return true;
    }

    domain.contains("..")
}

/// A four-part dotted name whose parts all look like octets.
fn is_dotted_quad(domain: &str) -> bool {
    let parts: Vec<&str> = domain.split('.').collect();
    parts.len() == 4
        && parts
            .iter()
            .all(|part| !part.is_empty() && part.len() <= 3 && part.chars().all(|c| c.is_ascii_digit()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_exclusion_rules() {
        for domain in [
            "*.wild.example",
            "localhost",
            "my.localhost.example",
            "server.domain.com",
            "Kubernetes Ingress Controller Fake Certificate",
            "cloudflare origin certificate",
            "fortigate",
            "198.51.100.7",
            "ab",
            "double..dot.example",
        ] {
            assert!(should_exclude_domain(domain), "{domain} should be excluded");
        }
    }

    #[test]
    fn test_kept_domains() {
        for domain in ["apple.com", "a.example", "188.com.example", "1.2.3.4.5"] {
            assert!(!should_exclude_domain(domain), "{domain} should be kept");
        }
    }

    #[test]
    fn test_dotted_quad_detection() {
        assert!(is_dotted_quad("1.2.3.4"));
        assert!(is_dotted_quad("255.255.255.255"));
        assert!(!is_dotted_quad("1.2.3"));
        assert!(!is_dotted_quad("1.2.3.4444"));
        assert!(!is_dotted_quad("a.b.c.d"));
    }

    #[test]
    fn test_extract_from_csv_file() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(file, "IP,ORIGIN,CERT_DOMAIN,CERT_ISSUER").unwrap();
        writeln!(file, "1.1.1.1,scan,apple.com,Apple CA").unwrap();
        writeln!(file, "1.1.1.2,scan,apple.com,Apple CA").unwrap();
        writeln!(file, "1.1.1.3,scan,*.wild.example,CA").unwrap();
        writeln!(file, "1.1.1.4,scan,\"quoted.example\",CA").unwrap();
        writeln!(file, "1.1.1.5,scan,,CA").unwrap();
        writeln!(file, "1.1.1.6,short").unwrap();

        let domains = extract_domains_from_csv(file.path()).expect("extract");
        assert_eq!(domains, vec!["apple.com", "quoted.example"]);
    }

    #[test]
    fn test_missing_file_errors() {
        let result = extract_domains_from_csv(Path::new("/nonexistent/scan.csv"));
        assert!(result.is_err());
    }
}
