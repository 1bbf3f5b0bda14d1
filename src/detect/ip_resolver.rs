//! IP resolution and connectivity stage.
//!
//! Resolves the (possibly redirect-updated) domain to an address, preferring
//! IPv4, then proves basic reachability with a short TCP probe against port
//! 443 (falling back to 80). Failure here aborts the pipeline: nothing
//! downstream can produce a meaningful verdict on an unreachable host.

use async_trait::async_trait;

use crate::detect::{DetectionStage, ProbeRun};
use crate::error_handling::ProbeError;
use crate::models::LocationInfo;
use crate::net::{resolve_preferring_ipv4, tcp_reachable};

/// Resolves the target address and probes TCP reachability.
pub struct IpResolverStage;

#[async_trait]
impl DetectionStage for IpResolverStage {
    fn name(&self) -> &'static str {
        "ip_resolver"
    }

    fn priority(&self) -> u8 {
        3
    }

    fn blocking(&self) -> bool {
        true
    }

    async fn execute(&self, run: &mut ProbeRun) -> Result<(), ProbeError> {
        let cancel = run.env.cancel.clone();
        if cancel.is_cancelled() {
            return Err(ProbeError::Cancelled);
        }
        let ip = tokio::select! {
            _ = cancel.cancelled() => return Err(ProbeError::Cancelled),
            resolved = resolve_preferring_ipv4(&run.env.resolver, &run.domain) => resolved?,
        };

        let reachable = tokio::select! {
            _ = cancel.cancelled() => return Err(ProbeError::Cancelled),
            reachable = tcp_reachable(ip) => reachable,
        };
        if !reachable {
            return Err(ProbeError::Unreachable);
        }

        run.result
            .location
            .get_or_insert_with(LocationInfo::default)
            .ip_address = ip.to_string();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::AssetStore;
    use crate::detect::test_support::test_env_with;

    #[tokio::test]
    async fn test_unreachable_literal_ip_aborts() {
        // TEST-NET-1: resolves trivially, never connects.
        let mut run = ProbeRun::new("192.0.2.1".into(), test_env_with(AssetStore::empty()));
        let err = IpResolverStage.execute(&mut run).await.unwrap_err();
        assert_eq!(err, ProbeError::Unreachable);
        assert!(run.result.location.is_none());
    }

    #[tokio::test]
    async fn test_cancelled_run_aborts_immediately() {
        let env = test_env_with(AssetStore::empty());
        env.cancel.cancel();
        let mut run = ProbeRun::new("192.0.2.1".into(), env);
        let err = IpResolverStage.execute(&mut run).await.unwrap_err();
        assert_eq!(err, ProbeError::Cancelled);
    }
}
