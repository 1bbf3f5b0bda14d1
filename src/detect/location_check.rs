//! Location cross-check stage.
//!
//! Idempotent re-read of the location record. Kept as its own stage so the
//! suitability evaluator and the location lookup stay decoupled; it never
//! mutates populated fields.

use async_trait::async_trait;
use log::debug;

use crate::detect::{DetectionStage, ProbeRun};
use crate::error_handling::ProbeError;

/// Cross-references the populated location record.
pub struct LocationCheckStage;

#[async_trait]
impl DetectionStage for LocationCheckStage {
    fn name(&self) -> &'static str {
        "location_check"
    }

    fn priority(&self) -> u8 {
        5
    }

    fn blocking(&self) -> bool {
        true
    }

    async fn execute(&self, run: &mut ProbeRun) -> Result<(), ProbeError> {
        if let Some(location) = &run.result.location {
            if location.is_domestic {
                // Verdict already taken by the location stage; the final
                // word belongs to the suitability evaluator.
                debug!("{} geolocates to {}", run.domain, location.country);
            }
        }
        Ok(())
    }
}
