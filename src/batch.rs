//! Batch dispatcher.
//!
//! Fans a domain list out to independent pipeline invocations under a
//! tier-sized concurrency cap, streams per-domain progress as completions
//! arrive, and aggregates the outcome. The result array is input-ordered;
//! only the progress log is completion-ordered.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use futures::FutureExt;
use log::warn;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::detect::ProbeEnv;
use crate::error_handling::ProbeError;
use crate::initialization::init_semaphore;
use crate::models::DetectionResult;
use crate::pipeline::Pipeline;

/// Batch-level failure.
#[derive(Debug, Error)]
pub enum BatchError {
    /// The batch was cancelled before all domains completed.
    #[error("检测已取消")]
    Cancelled,
}

/// Aggregate counters over one batch.
#[derive(Debug, Clone, Default)]
pub struct Statistics {
    /// Number of input domains.
    pub total_domains: usize,
    /// Probes that completed with a verdict (including expected negatives).
    pub successful_checks: usize,
    /// Probes that failed technically.
    pub failed_checks: usize,
    /// Domains judged suitable.
    pub suitable_domains: usize,
    /// Domains on the blocklist.
    pub blocked_domains: usize,
}

/// Derived rates for the report header.
#[derive(Debug, Clone, Default)]
pub struct BatchSummary {
    /// `successful_checks / total_domains`.
    pub success_rate: f64,
    /// `suitable_domains / total_domains`.
    pub suitability_rate: f64,
    /// `blocked_domains / total_domains`.
    pub blocking_rate: f64,
}

/// One batch run: per-domain results plus aggregates.
#[derive(Debug)]
pub struct BatchReport {
    /// Batch start time.
    pub start_time: DateTime<Utc>,
    /// Batch end time.
    pub end_time: DateTime<Utc>,
    /// Wall-clock duration of the whole batch.
    pub total_duration: Duration,
    /// Per-domain results, in input order.
    pub results: Vec<DetectionResult>,
    /// Aggregate counters.
    pub statistics: Statistics,
    /// Derived rates.
    pub summary: BatchSummary,
}

struct ProgressMessage {
    index: usize,
    domain: String,
    result: DetectionResult,
}

/// Computes the concurrency cap for a batch of `n` domains.
///
/// The work is DNS- and TLS-bound: tiny batches may run fully parallel,
/// larger ones throttle to stay clear of DNS rate limits and local socket
/// pressure.
pub fn optimal_concurrency(n: usize) -> usize {
    match n {
        0..=5 => n,
        6..=20 => 3,
        21..=50 => 4,
        51..=100 => 5,
        _ => 6,
    }
}

/// Checks `domains` under the batch concurrency model.
///
/// Returns per-input results in input order. Cancellation of the
/// environment token unwinds immediately with [`BatchError::Cancelled`].
pub async fn check_domains(
    env: Arc<ProbeEnv>,
    domains: &[String],
) -> Result<Vec<DetectionResult>, BatchError> {
    if domains.is_empty() {
        return Ok(Vec::new());
    }

    let total = domains.len();
    let semaphore = init_semaphore(optimal_concurrency(total));
    let (tx, mut rx) = mpsc::channel::<ProgressMessage>(total);
    let pipeline = Arc::new(Pipeline::new());

    for (index, domain) in domains.iter().enumerate() {
        let env = Arc::clone(&env);
        let pipeline = Arc::clone(&pipeline);
        let semaphore = Arc::clone(&semaphore);
        let tx = tx.clone();
        let domain = domain.clone();
        tokio::spawn(async move {
            let permit = tokio::select! {
                _ = env.cancel.cancelled() => None,
                permit = semaphore.acquire_owned() => permit.ok(),
            };
            if permit.is_none() {
                return;
            }

            // The pipeline contains its own panic barrier for concurrent
            // stages; this one covers faults in the blocking phase so a
            // single bad domain cannot wedge the collector.
            let result = match std::panic::AssertUnwindSafe(pipeline.execute(Arc::clone(&env), &domain))
                .catch_unwind()
                .await
            {
                Ok(result) => result,
                Err(_) => {
                    let mut result = DetectionResult::new(domain.to_lowercase());
                    result.error = Some(ProbeError::StagePanic {
                        stage: "pipeline",
                        message: "pipeline panicked".to_string(),
                    });
                    result
                }
            };

            let message = ProgressMessage {
                index,
                domain,
                result,
            };
            if tx.send(message).await.is_err() {
                // Collector already unwound (cancellation).
            }
        });
    }
    drop(tx);

    let mut slots: Vec<Option<DetectionResult>> = Vec::new();
    slots.resize_with(total, || None);
    let mut completed = 0usize;

    while completed < total {
        let message = tokio::select! {
            _ = env.cancel.cancelled() => return Err(BatchError::Cancelled),
            message = rx.recv() => match message {
                Some(message) => message,
                None => return Err(BatchError::Cancelled),
            },
        };

        completed += 1;
        print_progress(completed, total, &message.domain, &message.result);
        slots[message.index] = Some(message.result);
    }

    Ok(slots
        .into_iter()
        .map(|slot| slot.expect("every completed slot holds a result"))
        .collect())
}

/// Runs a batch and wraps the results in a [`BatchReport`].
pub async fn run_batch(
    env: Arc<ProbeEnv>,
    domains: &[String],
) -> Result<BatchReport, BatchError> {
    let start_time = Utc::now();
    let started = Instant::now();

    let results = check_domains(env, domains).await?;

    let statistics = aggregate(&results);
    let summary = summarize(&statistics);
    Ok(BatchReport {
        start_time,
        end_time: Utc::now(),
        total_duration: started.elapsed(),
        results,
        statistics,
        summary,
    })
}

fn print_progress(completed: usize, total: usize, domain: &str, result: &DetectionResult) {
    let status = match (&result.error, result.suitable) {
        (Some(e), _) if !e.is_expected_negative() => format!("失败 - {e}"),
        (_, true) => "适合".to_string(),
        (Some(e), false) => format!("不适合 - {e}"),
        (None, false) => "不适合 - 未知原因".to_string(),
    };
    println!("正在检测 [{completed}/{total}]: {domain}... {status}");
}

/// Classifies results into the aggregate counters.
pub fn aggregate(results: &[DetectionResult]) -> Statistics {
    let mut stats = Statistics {
        total_domains: results.len(),
        ..Default::default()
    };

    for result in results {
        match &result.error {
            // Expected negatives are legitimate findings, not failures.
            None => stats.successful_checks += 1,
            Some(e) if e.is_expected_negative() => stats.successful_checks += 1,
            Some(e) => {
                warn!("{}: {e}", result.domain);
                stats.failed_checks += 1;
            }
        }
        if result.suitable {
            stats.suitable_domains += 1;
        }
        if result.blocked.as_ref().is_some_and(|b| b.is_blocked) {
            stats.blocked_domains += 1;
        }
    }
    stats
}

fn summarize(stats: &Statistics) -> BatchSummary {
    let total = stats.total_domains as f64;
    if stats.total_domains == 0 {
        return BatchSummary::default();
    }
    BatchSummary {
        success_rate: stats.successful_checks as f64 / total,
        suitability_rate: stats.suitable_domains as f64 / total,
        blocking_rate: stats.blocked_domains as f64 / total,
    }
}
