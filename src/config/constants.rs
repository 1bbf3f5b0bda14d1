//! Probe timing and limit constants.
//!
//! These values are part of the probe's contract: changing them changes what
//! the tool reports for borderline servers, so they live in one place.

use std::time::Duration;

/// DNS query timeout.
pub const DNS_TIMEOUT: Duration = Duration::from_secs(2);

/// TCP connectivity probe timeout, applied per port (443, then 80).
pub const TCP_PROBE_TIMEOUT: Duration = Duration::from_secs(2);

/// Total timeout for the redirect-tracing HTTP client.
pub const HTTP_REDIRECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Default timeout for the observation TLS handshake.
///
/// Overridable through [`crate::Config::network_timeout`].
pub const DEFAULT_NETWORK_TIMEOUT: Duration = Duration::from_secs(5);

/// Timeout for the forced-X25519 TLS handshake.
pub const X25519_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(3);

/// Maximum number of manual redirect hops to follow.
///
/// The redirect chain therefore holds at most `MAX_REDIRECT_HOPS + 1` hosts.
pub const MAX_REDIRECT_HOPS: usize = 5;

/// Number of networking stages allowed to run concurrently inside one
/// pipeline invocation.
pub const STAGE_CONCURRENCY: usize = 4;

/// Browser-like User-Agent used for redirect tracing.
pub const USER_AGENT: &str =
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

/// HTTPS port probed by the TLS dialers.
pub const TLS_PORT: u16 = 443;

/// Default directory holding the GFW list, GeoIP database and keyword files.
pub const DEFAULT_DATA_DIR: &str = "data";

/// GFW blocklist file name (clash-rules payload format).
pub const GFW_LIST_FILE: &str = "gfwlist.conf";

/// MaxMind GeoIP2 country database file name.
pub const GEOIP_FILE: &str = "Country.mmdb";

/// Hot-website pattern list file name.
pub const HOT_WEBSITES_FILE: &str = "hot_websites.txt";

/// CDN keyword section file name.
pub const CDN_KEYWORDS_FILE: &str = "cdn_keywords.txt";
