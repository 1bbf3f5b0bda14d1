//! Report rendering.
//!
//! Formats single results and batch reports as console tables with a
//! star-rated recommendation. Cell text is padded before coloring so ANSI
//! escapes never skew column widths.

mod table;

use std::collections::HashMap;
use std::time::Duration;

use colored::Colorize;

use crate::batch::BatchReport;
use crate::models::DetectionResult;
use table::{Cell, Table, Tint};

/// Renders one detection result the way a single-row batch would print.
pub fn format_single_result(result: &DetectionResult) -> String {
    let mut output = String::new();
    output.push_str("检测结果:\n\n");
    output.push_str(&format_suitable_table(&[result]));
    output.push('\n');

    if !result.suitable || result.error.is_some() {
        output.push_str(&format_unsuitable_summary(&[result]));
    }
    output
}

/// Renders a whole batch: header statistics, the suitable-domain table and
/// the unsuitable summary grouped by reason.
pub fn format_batch_report(report: &BatchReport) -> String {
    let mut output = String::new();
    output.push_str(&format!(
        "\n批量检测报告\n总耗时: {}\n检测域名: {} 个\n成功率: {:.1}%\n适合性率: {:.1}%\n\n",
        format_duration(report.total_duration),
        report.statistics.total_domains,
        report.summary.success_rate * 100.0,
        report.summary.suitability_rate * 100.0,
    ));

    let (suitable, unsuitable): (Vec<&DetectionResult>, Vec<&DetectionResult>) = report
        .results
        .iter()
        .partition(|result| result.suitable && result.error.is_none());

    if !suitable.is_empty() {
        output.push_str("适合的域名:\n\n");
        output.push_str(&format_suitable_table(&suitable));
        output.push('\n');
    }

    if !unsuitable.is_empty() {
        output.push_str(&format_unsuitable_summary(&unsuitable));
    }

    output
}

/// Counts the recommendation stars for a result, 0–5.
///
/// One independent star per clause: all four TLS hard requirements, a fast
/// handshake (≤ 200 ms), no CDN, not a hot website, and a certificate with
/// at least 60 days left.
pub fn recommendation_stars(result: &DetectionResult) -> usize {
    let mut stars = 0;

    let tls_hard_requirements = result.tls.as_ref().is_some_and(|tls| {
        tls.supports_tls13 && tls.supports_x25519 && tls.supports_http2
    }) && result.sni.as_ref().is_some_and(|sni| sni.sni_match);
    if tls_hard_requirements {
        stars += 1;
    }

    if result
        .tls
        .as_ref()
        .is_some_and(|tls| !tls.handshake_time.is_zero() && tls.handshake_time.as_millis() <= 200)
    {
        stars += 1;
    }

    if result.cdn.as_ref().is_none_or(|cdn| !cdn.is_cdn) {
        stars += 1;
    }

    if result.cdn.as_ref().is_some_and(|cdn| !cdn.is_hot_website) {
        stars += 1;
    }

    if result
        .certificate
        .as_ref()
        .is_some_and(|cert| cert.valid && cert.days_until_expiry >= 60)
    {
        stars += 1;
    }

    stars
}

fn format_suitable_table(results: &[&DetectionResult]) -> String {
    let mut table = Table::new(vec![
        "最终域名", "TLS1.3", "X25519", "H2", "SNI匹配", "握手时间", "证书时间", "CDN", "热门",
        "推荐",
    ]);

    for &result in results {
        let check = |ok: bool| {
            if ok {
                Cell::tinted("✓", Tint::Green)
            } else {
                Cell::tinted("✗", Tint::Red)
            }
        };

        let tls = result.tls.as_ref();
        let handshake = match tls.filter(|t| !t.handshake_time.is_zero()) {
            Some(t) => {
                let ms = t.handshake_time.as_millis();
                let tint = if ms <= 200 {
                    Tint::Green
                } else if ms <= 500 {
                    Tint::Yellow
                } else {
                    Tint::Red
                };
                Cell::tinted(format!("{ms}ms"), tint)
            }
            None => Cell::tinted("N/A", Tint::Red),
        };

        let cert = match result.certificate.as_ref().filter(|c| c.valid) {
            Some(c) => {
                let days = c.days_until_expiry;
                let tint = if days >= 60 {
                    Tint::Green
                } else if days >= 30 {
                    Tint::Yellow
                } else {
                    Tint::Red
                };
                Cell::tinted(format!("{days}天"), tint)
            }
            None => Cell::tinted("无效", Tint::Red),
        };

        let cdn = match &result.cdn {
            None if result.early_exit => Cell::tinted("无效", Tint::Red),
            Some(cdn) if cdn.is_cdn => Cell::tinted(
                cdn.confidence.map(|c| c.label()).unwrap_or("低"),
                Tint::Red,
            ),
            _ => Cell::tinted("无", Tint::Green),
        };

        let hot = match &result.cdn {
            None if result.early_exit => Cell::tinted("无效", Tint::Red),
            Some(cdn) if cdn.is_hot_website => Cell::tinted("✓", Tint::Red),
            _ => Cell::plain("-"),
        };

        let recommend = if result.early_exit {
            Cell::tinted("无效", Tint::Red)
        } else {
            Cell::tinted("*".repeat(recommendation_stars(result)), Tint::Yellow)
        };

        table.push_row(vec![
            Cell::plain(result.effective_domain()),
            check(tls.is_some_and(|t| t.supports_tls13)),
            check(tls.is_some_and(|t| t.supports_x25519)),
            check(tls.is_some_and(|t| t.supports_http2)),
            check(result.sni.as_ref().is_some_and(|s| s.sni_match)),
            handshake,
            cert,
            cdn,
            hot,
            recommend,
        ]);
    }

    table.render()
}

fn format_unsuitable_summary(results: &[&DetectionResult]) -> String {
    if results.is_empty() {
        return String::new();
    }

    let mut output = format!("不适合的域名 ({}个):\n", results.len());

    // Group by reason, preserving first-seen order for stable output.
    let mut counts: HashMap<String, usize> = HashMap::new();
    let mut order: Vec<String> = Vec::new();
    for result in results {
        let reason = result
            .error
            .as_ref()
            .map(|e| e.to_string())
            .unwrap_or_else(|| "未知原因".to_string());
        if !counts.contains_key(&reason) {
            order.push(reason.clone());
        }
        *counts.entry(reason).or_insert(0) += 1;
    }
    for reason in order {
        output.push_str(&format!("   - {}个{}\n", counts[&reason], reason));
    }
    output.push('\n');
    output
}

/// Formats a duration the way the progress header expects (µs/ms/s/mXs).
pub fn format_duration(d: Duration) -> String {
    if d < Duration::from_millis(1) {
        format!("{}µs", d.as_micros())
    } else if d < Duration::from_secs(1) {
        format!("{}ms", d.as_millis())
    } else if d < Duration::from_secs(60) {
        format!("{:.2}s", d.as_secs_f64())
    } else {
        let minutes = d.as_secs() / 60;
        let seconds = d.as_secs() % 60;
        format!("{minutes}m{seconds}s")
    }
}

/// Prints the startup banner.
pub fn print_banner() {
    println!();
    println!("{}", "Reality 目标域名检测".bold());
    println!("{}", format!("reality-probe v{}", env!("CARGO_PKG_VERSION")).dimmed());
    println!();
}

/// Prints a timestamped progress message.
pub fn print_timestamped(message: &str) {
    println!(
        "[{}] {message}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        CdnConfidence, CdnInfo, CertificateInfo, NetworkInfo, SniInfo, TlsInfo,
    };
    use chrono::{Duration as ChronoDuration, Utc};

    fn five_star_result() -> DetectionResult {
        let mut result = DetectionResult::new("ok.example");
        result.suitable = true;
        result.hard_requirements_met = true;
        result.network = Some(NetworkInfo {
            accessible: true,
            status_code: 200,
            final_domain: "ok.example".into(),
            ..Default::default()
        });
        result.tls = Some(TlsInfo {
            protocol_version: "TLSv1_3".into(),
            supports_tls13: true,
            supports_x25519: true,
            supports_http2: true,
            cipher_suite: "TLS13_AES_128_GCM_SHA256".into(),
            handshake_time: Duration::from_millis(150),
        });
        result.sni = Some(SniInfo {
            supports_sni: true,
            sni_match: true,
            server_name: "ok.example".into(),
        });
        result.certificate = Some(CertificateInfo {
            valid: true,
            issuer: "CN=Example CA".into(),
            subject: "CN=ok.example".into(),
            not_before: Utc::now() - ChronoDuration::days(10),
            not_after: Utc::now() + ChronoDuration::days(90),
            days_until_expiry: 90,
            certificate_sans: vec!["ok.example".into()],
        });
        result.cdn = Some(CdnInfo::hot_only(false));
        result
    }

    #[test]
    fn test_five_stars() {
        assert_eq!(recommendation_stars(&five_star_result()), 5);
    }

    #[test]
    fn test_each_clause_is_independent() {
        // Slow handshake drops exactly one star.
        let mut result = five_star_result();
        result.tls.as_mut().unwrap().handshake_time = Duration::from_millis(800);
        assert_eq!(recommendation_stars(&result), 4);

        // CDN presence drops the no-CDN star.
        let mut result = five_star_result();
        result.cdn = Some(CdnInfo {
            is_cdn: true,
            cdn_provider: "CDN".into(),
            confidence: Some(CdnConfidence::High),
            evidence: "cf-ray".into(),
            is_hot_website: false,
        });
        assert_eq!(recommendation_stars(&result), 4);

        // Hot website drops the not-hot star.
        let mut result = five_star_result();
        result.cdn.as_mut().unwrap().is_hot_website = true;
        assert_eq!(recommendation_stars(&result), 4);

        // Short-lived certificate drops the cert star.
        let mut result = five_star_result();
        result.certificate.as_mut().unwrap().days_until_expiry = 30;
        assert_eq!(recommendation_stars(&result), 4);

        // Missing X25519 drops the hard-requirement star.
        let mut result = five_star_result();
        result.tls.as_mut().unwrap().supports_x25519 = false;
        assert_eq!(recommendation_stars(&result), 4);
    }

    #[test]
    fn test_missing_cdn_record_scores_no_hot_star() {
        // Without a CDN record the "no CDN" clause passes but the
        // "not hot" clause cannot be asserted.
        let mut result = five_star_result();
        result.cdn = None;
        assert_eq!(recommendation_stars(&result), 4);
    }

    #[test]
    fn test_early_exit_renders_invalid_recommendation() {
        let mut result = DetectionResult::new("blocked.example");
        result.early_exit = true;
        let rendered = format_suitable_table(&[&result]);
        assert!(rendered.contains("无效"));
    }

    #[test]
    fn test_unsuitable_summary_groups_by_reason() {
        colored::control::set_override(false);
        let mut a = DetectionResult::new("a.example");
        a.error = Some(crate::error_handling::ProbeError::NoX25519);
        let mut b = DetectionResult::new("b.example");
        b.error = Some(crate::error_handling::ProbeError::NoX25519);
        let mut c = DetectionResult::new("c.example");
        c.error = Some(crate::error_handling::ProbeError::Domestic);

        let summary = format_unsuitable_summary(&[&a, &b, &c]);
        assert!(summary.starts_with("不适合的域名 (3个):"));
        assert!(summary.contains("- 2个不支持X25519密钥交换"));
        assert!(summary.contains("- 1个国内网站（仅参考GeoIP）"));
    }

    #[test]
    fn test_format_duration_tiers() {
        assert_eq!(format_duration(Duration::from_micros(120)), "120µs");
        assert_eq!(format_duration(Duration::from_millis(45)), "45ms");
        assert_eq!(format_duration(Duration::from_millis(2500)), "2.50s");
        assert_eq!(format_duration(Duration::from_secs(90)), "1m30s");
    }

    #[test]
    fn test_single_result_contains_table_and_summary() {
        colored::control::set_override(false);
        let mut result = five_star_result();
        result.suitable = false;
        result.error = Some(crate::error_handling::ProbeError::NoHttp2);

        let rendered = format_single_result(&result);
        assert!(rendered.contains("检测结果:"));
        assert!(rendered.contains("ok.example"));
        assert!(rendered.contains("不适合的域名 (1个):"));
    }
}
