//! Domain validation and input parsing.
//!
//! Validation is purely syntactic: a DNS lookup failure never invalidates a
//! name, because an unreachable domain is still a legitimate probe input
//! (the pipeline will report it unreachable with evidence).

mod csv_input;

pub use csv_input::extract_domains_from_csv;

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

static DOMAIN_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9]([A-Za-z0-9-]{0,61}[A-Za-z0-9])?(\.[A-Za-z0-9]([A-Za-z0-9-]{0,61}[A-Za-z0-9])?)*$")
        .expect("domain regex is valid")
});

/// Validates a domain name syntactically.
pub fn is_valid_domain(domain: &str) -> bool {
    if domain.is_empty() || domain.len() > 253 {
        return false;
    }
    if domain.contains(char::is_whitespace) {
        return false;
    }
    if domain.starts_with('.') || domain.ends_with('.') {
        return false;
    }
    if domain.contains("..") {
        return false;
    }
    DOMAIN_REGEX.is_match(domain)
}

/// Outcome of parsing a raw domain list.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ParsedDomains {
    /// Unique valid domains, lowercased, in first-seen order.
    pub valid: Vec<String>,
    /// Inputs that failed validation.
    pub invalid: Vec<String>,
    /// Valid inputs dropped because they were already seen.
    pub duplicates: Vec<String>,
}

/// Splits a whitespace-separated domain list into valid, invalid and
/// duplicate entries.
pub fn parse_domains(input: &str) -> ParsedDomains {
    let mut parsed = ParsedDomains::default();
    let mut seen = HashSet::new();

    for field in input.split_whitespace() {
        let domain = field.trim().to_lowercase();
        if domain.is_empty() {
            continue;
        }
        if !is_valid_domain(&domain) {
            parsed.invalid.push(domain);
            continue;
        }
        if seen.insert(domain.clone()) {
            parsed.valid.push(domain);
        } else {
            parsed.duplicates.push(domain);
        }
    }
    parsed
}
