//! Status code classification stage.
//!
//! Runs right after redirect tracing and classifies the final HTTP status.
//! A masquerade target must answer the way a real origin would; anything
//! outside {200, 401, 403} looks unnatural to an active prober.

use async_trait::async_trait;

use crate::detect::{DetectionStage, ProbeRun};
use crate::error_handling::ProbeError;
use crate::models::classify_status_code;

/// Classifies `Network.StatusCode` into safe / excluded / network.
pub struct StatusCheckStage;

#[async_trait]
impl DetectionStage for StatusCheckStage {
    fn name(&self) -> &'static str {
        "status_check"
    }

    fn priority(&self) -> u8 {
        3
    }

    fn blocking(&self) -> bool {
        true
    }

    async fn execute(&self, run: &mut ProbeRun) -> Result<(), ProbeError> {
        let Some(network) = &run.result.network else {
            return Ok(());
        };
        run.result.status_code_category =
            classify_status_code(network.status_code, network.accessible);
        Ok(())
    }
}
