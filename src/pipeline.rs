//! Detection pipeline.
//!
//! Orders and executes the stage set for one domain. The pipeline call
//! itself never fails: every failure surfaces inside the returned
//! [`DetectionResult`].
//!
//! Execution has two phases. Blocking stages run sequentially in priority
//! order; any error from one of them short-circuits the pipeline (early
//! exit). The remaining networking stages then run concurrently, bounded by
//! a small semaphore, each against a snapshot of the result that is merged
//! back monotonically — so concurrent stages always observe the final
//! domain settled by the redirect stage and never race on sub-records.

use std::sync::Arc;
use std::time::Instant;

use futures::FutureExt;
use log::debug;
use tokio::sync::Semaphore;

use crate::config::STAGE_CONCURRENCY;
use crate::detect::{
    BlockedStage, ComprehensiveTlsStage, DetectionStage, HotWebsiteStage, IpResolverStage,
    LocationCheckStage, LocationStage, ProbeEnv, ProbeRun, RedirectStage, StatusCheckStage,
};
use crate::error_handling::ProbeError;
use crate::models::{classify_status_code, DetectionResult, StatusCodeCategory};

/// The ordered stage set.
pub struct Pipeline {
    stages: Vec<Arc<dyn DetectionStage>>,
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl Pipeline {
    /// Builds the standard stage set, sorted by priority.
    pub fn new() -> Self {
        let mut stages: Vec<Arc<dyn DetectionStage>> = vec![
            Arc::new(BlockedStage),
            Arc::new(RedirectStage),
            Arc::new(StatusCheckStage),
            Arc::new(IpResolverStage),
            Arc::new(LocationStage),
            Arc::new(LocationCheckStage),
            Arc::new(ComprehensiveTlsStage),
            Arc::new(HotWebsiteStage),
        ];
        // Stable sort: stages sharing a priority keep registration order.
        stages.sort_by_key(|stage| stage.priority());
        Self { stages }
    }

    /// Probes one domain and returns the fully populated result.
    pub async fn execute(&self, env: Arc<ProbeEnv>, domain: &str) -> DetectionResult {
        let domain = domain.trim().to_lowercase();
        let started = Instant::now();
        let mut run = ProbeRun::new(domain, env);

        self.execute_stages(&mut run).await;

        run.result.duration = started.elapsed();
        evaluate_suitability(&mut run.result);
        run.result
    }

    async fn execute_stages(&self, run: &mut ProbeRun) {
        for stage in self.stages.iter().filter(|stage| stage.blocking()) {
            if run.env.cancel.is_cancelled() {
                run.result.error.get_or_insert(ProbeError::Cancelled);
                return;
            }
            if let Err(e) = stage.execute(run).await {
                debug!("stage {} aborted {}: {e}", stage.name(), run.result.domain);
                run.result.error = Some(e);
                run.result.early_exit = true;
                return;
            }
        }

        let networking: Vec<Arc<dyn DetectionStage>> = self
            .stages
            .iter()
            .filter(|stage| !stage.blocking())
            .cloned()
            .collect();
        if networking.is_empty() {
            return;
        }

        let semaphore = Arc::new(Semaphore::new(STAGE_CONCURRENCY));
        let mut handles = Vec::with_capacity(networking.len());
        for stage in networking {
            let semaphore = Arc::clone(&semaphore);
            let cancel = run.env.cancel.clone();
            let mut snapshot = run.snapshot();
            handles.push(tokio::spawn(async move {
                let permit = tokio::select! {
                    _ = cancel.cancelled() => None,
                    permit = semaphore.acquire_owned() => permit.ok(),
                };
                if permit.is_none() {
                    // Cancelled while queued: skip the stage entirely.
                    return (stage.name(), snapshot.result, None);
                }
                let outcome =
                    match std::panic::AssertUnwindSafe(stage.execute(&mut snapshot))
                        .catch_unwind()
                        .await
                    {
                        Ok(Ok(())) => None,
                        Ok(Err(e)) => Some(e),
                        Err(payload) => Some(ProbeError::StagePanic {
                            stage: stage.name(),
                            message: panic_message(payload),
                        }),
                    };
                (stage.name(), snapshot.result, outcome)
            }));
        }

        for handle in handles {
            match handle.await {
                Ok((name, stage_result, outcome)) => {
                    run.result.merge_stage_output(stage_result);
                    if let Some(e) = outcome {
                        debug!("stage {name} reported: {e}");
                        run.result.error = Some(e);
                    }
                }
                Err(join_error) => {
                    run.result.error = Some(ProbeError::StagePanic {
                        stage: "networking",
                        message: join_error.to_string(),
                    });
                }
            }
        }
    }
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

/// Applies the suitability rules to a fully populated result.
///
/// Hard conditions are checked in fixed priority order; the first failure
/// sets the verdict and the canonical error. A technical failure (the probe
/// could not decide) never yields a suitable verdict.
pub(crate) fn evaluate_suitability(result: &mut DetectionResult) {
    // A probe that could not decide keeps its technical error.
    if result
        .error
        .as_ref()
        .is_some_and(|e| !e.is_expected_negative())
    {
        result.suitable = false;
        return;
    }

    if let Some(blocked) = &result.blocked {
        if blocked.is_blocked {
            result.suitable = false;
            result.error = Some(ProbeError::Blocked {
                rule: blocked.blocked_reasons.first().cloned().unwrap_or_default(),
            });
            return;
        }
    }

    if result.location.as_ref().is_some_and(|l| l.is_domestic) {
        result.suitable = false;
        result.error = Some(ProbeError::Domestic);
        return;
    }

    if let Some(network) = &result.network {
        if !network.accessible {
            result.suitable = false;
            result.error = Some(ProbeError::Unreachable);
            result.status_code_category = StatusCodeCategory::Network;
            return;
        }
        let category = classify_status_code(network.status_code, true);
        result.status_code_category = category;
        if category == StatusCodeCategory::Excluded {
            result.suitable = false;
            result.error = Some(ProbeError::UnnaturalStatus {
                code: network.status_code,
            });
            return;
        }
    }

    if let Some(tls) = &result.tls {
        if !tls.supports_tls13 {
            result.suitable = false;
            result.error = Some(ProbeError::NoTls13);
            return;
        }
        if !tls.supports_x25519 {
            result.suitable = false;
            result.error = Some(ProbeError::NoX25519);
            return;
        }
        if !tls.supports_http2 {
            result.suitable = false;
            result.error = Some(ProbeError::NoHttp2);
            return;
        }
    }

    if let Some(certificate) = &result.certificate {
        if !certificate.valid {
            result.suitable = false;
            result.error = Some(ProbeError::CertInvalid);
            return;
        }
        if certificate.days_until_expiry <= 0 {
            result.suitable = false;
            result.error = Some(ProbeError::CertExpired {
                days: certificate.days_until_expiry,
            });
            return;
        }
    }

    if let Some(sni) = &result.sni {
        if !sni.supports_sni || !sni.sni_match {
            result.suitable = false;
            result.error = Some(ProbeError::SniMismatch);
            return;
        }
    }

    result.suitable = true;
    result.hard_requirements_met = true;
}
