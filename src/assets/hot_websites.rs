//! Hot-website list store.
//!
//! One pattern per line, `#` comments. Exact entries match the domain
//! itself; `*.<base>` entries match `<base>` and any subdomain of it.
//! Matching also tries the `www.`-toggled variant of the domain, because
//! popularity lists mix apex and `www.` forms freely.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use log::{debug, warn};

/// In-memory hot-website pattern set.
#[derive(Debug, Default)]
pub struct HotWebsites {
    exact: HashSet<String>,
    suffixes: HashSet<String>,
}

impl HotWebsites {
    /// Loads patterns from `path`; a missing file yields an empty set.
    pub fn load(path: &Path) -> Self {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) => {
                warn!("failed to read hot-website list {}: {e}", path.display());
                return Self::default();
            }
        };
        let store = Self::parse(&content);
        debug!(
            "loaded {} hot-website patterns",
            store.exact.len() + store.suffixes.len()
        );
        store
    }

    /// Parses the pattern list.
    pub fn parse(content: &str) -> Self {
        let mut exact = HashSet::new();
        let mut suffixes = HashSet::new();
        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let line = line.to_lowercase();
            match line.strip_prefix("*.") {
                Some(base) if !base.is_empty() => {
                    suffixes.insert(base.to_string());
                }
                _ => {
                    exact.insert(line);
                }
            }
        }
        Self { exact, suffixes }
    }

    /// True when `domain` (or its `www.` toggle) matches any pattern.
    pub fn contains(&self, domain: &str) -> bool {
        let domain = domain.to_lowercase();
        if self.matches_single(&domain) {
            return true;
        }
        match domain.strip_prefix("www.") {
            Some(stripped) => self.matches_single(stripped),
            None => self.matches_single(&format!("www.{domain}")),
        }
    }

    fn matches_single(&self, domain: &str) -> bool {
        if self.exact.contains(domain) {
            return true;
        }
        self.suffixes.iter().any(|base| {
            domain == base || domain.ends_with(&format!(".{base}"))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
# top sites
apple.com
www.netflix.com
*.google.com
";

    #[test]
    fn test_exact_match() {
        let hot = HotWebsites::parse(SAMPLE);
        assert!(hot.contains("apple.com"));
        assert!(!hot.contains("apple.example"));
    }

    #[test]
    fn test_www_toggle_both_directions() {
        let hot = HotWebsites::parse(SAMPLE);
        // Listed apex, probed www form.
        assert!(hot.contains("www.apple.com"));
        // Listed www form, probed apex.
        assert!(hot.contains("netflix.com"));
    }

    #[test]
    fn test_wildcard_base_and_subdomains() {
        let hot = HotWebsites::parse(SAMPLE);
        assert!(hot.contains("google.com"));
        assert!(hot.contains("mail.google.com"));
        assert!(!hot.contains("notgoogle.com"));
    }

    #[test]
    fn test_comments_and_blanks_skipped() {
        let hot = HotWebsites::parse("# only comments\n\n   \n");
        assert!(!hot.contains("apple.com"));
    }
}
