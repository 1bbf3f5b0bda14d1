//! GeoIP location stage.
//!
//! Looks the resolved address up in the country database. A domain hosted
//! inside China is useless as a masquerade target (the censor controls the
//! path to it), so a domestic verdict short-circuits the pipeline.

use async_trait::async_trait;

use crate::detect::{DetectionStage, ProbeRun};
use crate::error_handling::ProbeError;
use crate::models::LocationInfo;
use crate::net::resolve_preferring_ipv4;

/// Resolves the country of the target address.
pub struct LocationStage;

#[async_trait]
impl DetectionStage for LocationStage {
    fn name(&self) -> &'static str {
        "location"
    }

    fn priority(&self) -> u8 {
        4
    }

    fn blocking(&self) -> bool {
        true
    }

    async fn execute(&self, run: &mut ProbeRun) -> Result<(), ProbeError> {
        // The IP resolver normally ran first; resolve again only if the
        // record is missing (e.g. a reordered stage set).
        let ip_address = match run.result.location.as_ref().map(|l| l.ip_address.clone()) {
            Some(ip) if !ip.is_empty() => ip,
            _ => resolve_preferring_ipv4(&run.env.resolver, &run.domain)
                .await?
                .to_string(),
        };

        let lookup = ip_address
            .parse()
            .ok()
            .and_then(|ip| run.env.assets.geoip.as_ref()?.lookup(ip));

        let (country, is_domestic) = match lookup {
            Some(hit) => (hit.country, hit.is_domestic),
            None => ("未知".to_string(), false),
        };

        run.result.location = Some(LocationInfo {
            country,
            is_domestic,
            ip_address,
        });

        if is_domestic {
            return Err(ProbeError::Domestic);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::AssetStore;
    use crate::detect::test_support::test_env_with;

    #[tokio::test]
    async fn test_without_geoip_reports_unknown_not_domestic() {
        let mut run = ProbeRun::new("192.0.2.1".into(), test_env_with(AssetStore::empty()));
        run.result.location = Some(LocationInfo {
            ip_address: "192.0.2.1".into(),
            ..Default::default()
        });

        LocationStage.execute(&mut run).await.unwrap();
        let location = run.result.location.expect("location record");
        assert_eq!(location.country, "未知");
        assert!(!location.is_domestic);
        assert_eq!(location.ip_address, "192.0.2.1");
    }

    #[tokio::test]
    async fn test_reuses_ip_resolved_by_prior_stage() {
        // A literal-IP run would resolve to itself; seed a different address
        // and verify the stage keeps it instead of re-resolving.
        let mut run = ProbeRun::new("192.0.2.1".into(), test_env_with(AssetStore::empty()));
        run.result.location = Some(LocationInfo {
            ip_address: "198.51.100.7".into(),
            ..Default::default()
        });

        LocationStage.execute(&mut run).await.unwrap();
        assert_eq!(
            run.result.location.expect("location record").ip_address,
            "198.51.100.7"
        );
    }
}
