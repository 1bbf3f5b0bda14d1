//! Batch dispatcher behavior through the public API.
//!
//! Uses blocklisted fixture domains so every pipeline early-exits without
//! touching the network.

use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;

use reality_probe::{Checker, Config};

fn fixture_checker(blocked: &[&str], cancel: CancellationToken) -> Checker {
    let dir = tempfile::tempdir().expect("temp dir");
    let mut payload = String::from("payload:\n");
    for domain in blocked {
        payload.push_str(&format!("  - '{domain}'\n"));
    }
    std::fs::write(dir.path().join("gfwlist.conf"), payload).expect("write gfwlist");

    let config = Config {
        data_dir: dir.path().to_path_buf(),
        ..Default::default()
    };
    // The tempdir is dropped here; the asset store has already read it.
    Checker::with_cancellation(config, cancel).expect("checker")
}

#[tokio::test]
async fn test_batch_results_keep_input_order() {
    let domains: Vec<String> = (0..12).map(|i| format!("blocked{i}.example")).collect();
    let blocked: Vec<&str> = domains.iter().map(String::as_str).collect();
    let checker = fixture_checker(&blocked, CancellationToken::new());

    let report = checker.check_domains(&domains).await.expect("batch");

    assert_eq!(report.results.len(), domains.len());
    for (input, result) in domains.iter().zip(&report.results) {
        assert_eq!(&result.domain, input, "results must be input-ordered");
        assert!(result.early_exit);
        assert!(!result.suitable);
    }
    // Blocked findings are successful probes, not failures.
    assert_eq!(report.statistics.successful_checks, domains.len());
    assert_eq!(report.statistics.failed_checks, 0);
    assert_eq!(report.statistics.blocked_domains, domains.len());
    assert_eq!(report.summary.blocking_rate, 1.0);
}

#[tokio::test]
async fn test_cancelled_batch_unwinds_immediately() {
    let cancel = CancellationToken::new();
    cancel.cancel();
    let checker = fixture_checker(&[], cancel);

    let domains: Vec<String> = (0..10).map(|i| format!("d{i}.example")).collect();
    let started = Instant::now();
    let outcome = checker.check_domains(&domains).await;

    assert!(outcome.is_err(), "cancelled batch must return the error");
    assert!(
        started.elapsed() < Duration::from_secs(2),
        "cancellation must not wait for pending probes"
    );
}

#[tokio::test]
async fn test_single_domain_check_normalizes_input() {
    let checker = fixture_checker(&["blocked.example"], CancellationToken::new());
    let result = checker.check_domain("  Blocked.Example  ").await;

    assert_eq!(result.domain, "blocked.example");
    assert!(result.blocked.expect("blocked record").is_blocked);
    assert_eq!(result.error.expect("error").kind_name(), "blocked");
}
