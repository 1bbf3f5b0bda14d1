//! DNS resolution and TCP reachability primitives.

use std::net::IpAddr;

use hickory_resolver::TokioAsyncResolver;
use tokio::net::TcpStream;

use crate::config::TCP_PROBE_TIMEOUT;
use crate::error_handling::ProbeError;

/// Resolves `domain` to a single address, preferring IPv4.
///
/// Literal IP addresses pass through untouched. The resolver carries the
/// 2-second per-query timeout configured at initialization.
pub async fn resolve_preferring_ipv4(
    resolver: &TokioAsyncResolver,
    domain: &str,
) -> Result<IpAddr, ProbeError> {
    if let Ok(ip) = domain.parse::<IpAddr>() {
        return Ok(ip);
    }

    let response = resolver
        .lookup_ip(domain)
        .await
        .map_err(|e| ProbeError::ResolveFailed {
            message: e.to_string(),
        })?;

    let mut first = None;
    for ip in response.iter() {
        if ip.is_ipv4() {
            return Ok(ip);
        }
        first.get_or_insert(ip);
    }
    first.ok_or_else(|| ProbeError::ResolveFailed {
        message: "未找到IP地址".to_string(),
    })
}

/// Quick TCP reachability probe: port 443, falling back to port 80, with a
/// 2-second timeout per attempt.
pub async fn tcp_reachable(ip: IpAddr) -> bool {
    for port in [443u16, 80] {
        let attempt = tokio::time::timeout(TCP_PROBE_TIMEOUT, TcpStream::connect((ip, port))).await;
        if matches!(attempt, Ok(Ok(_))) {
            return true;
        }
    }
    false
}
