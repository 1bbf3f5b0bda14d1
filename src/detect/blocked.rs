//! GFW blocklist stage.
//!
//! Highest-priority check: a blocked domain cannot serve as a masquerade
//! target no matter what its TLS stack looks like, so a hit short-circuits
//! the whole pipeline before any network traffic is spent.

use async_trait::async_trait;

use crate::detect::{DetectionStage, ProbeRun};
use crate::error_handling::ProbeError;
use crate::models::BlockedInfo;

/// Matches the input domain against the GFW set.
pub struct BlockedStage;

#[async_trait]
impl DetectionStage for BlockedStage {
    fn name(&self) -> &'static str {
        "blocked"
    }

    fn priority(&self) -> u8 {
        1
    }

    fn blocking(&self) -> bool {
        true
    }

    async fn execute(&self, run: &mut ProbeRun) -> Result<(), ProbeError> {
        let matched = run.env.assets.gfw.matches(&run.domain);

        run.result.blocked = Some(BlockedInfo {
            is_blocked: matched.is_some(),
            blocked_reasons: matched.iter().cloned().collect(),
            match_type: "gfwlist".to_string(),
        });

        match matched {
            Some(rule) => Err(ProbeError::Blocked { rule }),
            None => Ok(()),
        }
    }
}
