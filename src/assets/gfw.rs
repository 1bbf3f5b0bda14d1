//! GFW blocklist store.
//!
//! Parses the clash-rules payload format: every line after the literal
//! `payload:` marker of the form `- '±.host'` contributes one entry. A
//! leading `+.` is stripped, so both `example.com` and `*.example.com`
//! style entries end up as exact strings in the set.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use log::{debug, warn};

/// In-memory GFW blocklist with exact and wildcard-suffix matching.
#[derive(Debug, Default)]
pub struct GfwList {
    entries: HashSet<String>,
}

impl GfwList {
    /// Loads the blocklist from `path`.
    ///
    /// A missing file or an empty parse leaves the set empty and logs a
    /// warning — an upstream format change would otherwise silently disable
    /// blocklist matching.
    pub fn load(path: &Path) -> Self {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) => {
                warn!("failed to read GFW list {}: {e}", path.display());
                return Self::default();
            }
        };
        let list = Self::parse(&content);
        if list.entries.is_empty() {
            warn!(
                "GFW list {} parsed to an empty set; upstream format may have changed",
                path.display()
            );
        } else {
            debug!("loaded {} GFW list entries", list.entries.len());
        }
        list
    }

    /// Parses the clash-rules payload format.
    pub fn parse(content: &str) -> Self {
        let mut entries = HashSet::new();
        let mut in_payload = false;

        for line in content.lines() {
            let line = line.trim();
            if line == "payload:" {
                in_payload = true;
                continue;
            }
            if !in_payload {
                continue;
            }
            if let Some(quoted) = line
                .strip_prefix("- '")
                .and_then(|rest| rest.strip_suffix('\''))
            {
                let entry = quoted.strip_prefix("+.").unwrap_or(quoted);
                if !entry.is_empty() {
                    entries.insert(entry.to_lowercase());
                }
            }
        }

        Self { entries }
    }

    /// Builds a list from pre-parsed entries (tests, fixtures).
    pub fn from_entries<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            entries: entries.into_iter().map(|s| s.into().to_lowercase()).collect(),
        }
    }

    /// Number of entries in the set.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when the set holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Matches `domain` exactly, then tries `*.<suffix>` for every label
    /// suffix of the domain. Returns the matching rule.
    pub fn matches(&self, domain: &str) -> Option<String> {
        let domain = domain.to_lowercase();
        if self.entries.contains(&domain) {
            return Some(domain);
        }
        let labels: Vec<&str> = domain.split('.').collect();
        for i in 0..labels.len() {
            let wildcard = format!("*.{}", labels[i..].join("."));
            if self.entries.contains(&wildcard) {
                return Some(wildcard);
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
# clash-rules gfw payload
payload:
  - '+.blocked.example'
  - 'exact.example'
  - '*.wild.example'
  - ''
not-a-rule
";

    #[test]
    fn test_parse_payload_format() {
        let list = GfwList::parse(SAMPLE);
        assert_eq!(list.len(), 3);
        assert!(list.matches("exact.example").is_some());
    }

    #[test]
    fn test_lines_before_payload_marker_are_ignored() {
        let list = GfwList::parse("  - 'early.example'\npayload:\n  - 'late.example'\n");
        assert_eq!(list.len(), 1);
        assert!(list.matches("early.example").is_none());
        assert!(list.matches("late.example").is_some());
    }

    #[test]
    fn test_plus_dot_prefix_is_stripped() {
        let list = GfwList::parse("payload:\n  - '+.stripped.example'\n");
        assert_eq!(list.matches("stripped.example").unwrap(), "stripped.example");
    }

    #[test]
    fn test_wildcard_suffix_match() {
        let list = GfwList::from_entries(["*.wild.example"]);
        // Any trailing-label match of the wildcard entry is blocked.
        assert_eq!(list.matches("a.wild.example").unwrap(), "*.wild.example");
        assert_eq!(list.matches("a.b.wild.example").unwrap(), "*.wild.example");
        assert_eq!(list.matches("wild.example").unwrap(), "*.wild.example");
        assert!(list.matches("notwild.example").is_none());
    }

    #[test]
    fn test_exact_match_is_case_insensitive() {
        let list = GfwList::from_entries(["Blocked.Example"]);
        assert!(list.matches("blocked.example").is_some());
        assert!(list.matches("BLOCKED.EXAMPLE").is_some());
    }

    #[test]
    fn test_empty_parse_yields_empty_set() {
        let list = GfwList::parse("no payload marker here\n");
        assert!(list.is_empty());
    }
}
