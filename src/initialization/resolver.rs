//! DNS resolver initialization.

use hickory_resolver::config::{ResolverConfig, ResolverOpts};
use hickory_resolver::TokioAsyncResolver;

use crate::config::DNS_TIMEOUT;

/// Initializes the DNS resolver for hostname lookups.
///
/// Per-query timeout is 2 seconds with reduced retry attempts, so an
/// unresponsive DNS server fails the probe fast instead of stalling a
/// whole batch slot. `ndots = 0` prevents search-domain appending.
pub fn init_resolver() -> TokioAsyncResolver {
    let mut opts = ResolverOpts::default();
    opts.timeout = DNS_TIMEOUT;
    opts.attempts = 2;
    opts.ndots = 0;

    TokioAsyncResolver::tokio(ResolverConfig::default(), opts)
}
