//! Hot-website stage.
//!
//! Flags final domains that appear on the popularity list. Purely
//! informational: masquerading as a famous site draws attention, so the
//! renderer withholds a star, but suitability is unaffected.

use async_trait::async_trait;

use crate::detect::{DetectionStage, ProbeRun};
use crate::error_handling::ProbeError;
use crate::models::CdnInfo;

/// Matches the final domain against the hot-website list.
pub struct HotWebsiteStage;

#[async_trait]
impl DetectionStage for HotWebsiteStage {
    fn name(&self) -> &'static str {
        "hot_website"
    }

    fn priority(&self) -> u8 {
        9
    }

    fn blocking(&self) -> bool {
        false
    }

    async fn execute(&self, run: &mut ProbeRun) -> Result<(), ProbeError> {
        let final_domain = run.result.effective_domain().to_string();
        let is_hot = run.env.assets.hot_websites.contains(&final_domain);

        match run.result.cdn.as_mut() {
            Some(cdn) => cdn.is_hot_website = is_hot,
            None => run.result.cdn = Some(CdnInfo::hot_only(is_hot)),
        }
        Ok(())
    }
}
