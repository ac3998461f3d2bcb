// src/core/scoring.rs

//! Cyber score derived from an audit `ScanReport`.
//!
//! Each factor starts at 1.0 and loses a fixed amount per finding:
//! 0.15 for a critical, 0.05 for a warning and 0.02 for an info finding.
//!
//! * `technical`: TLS and HTTP header findings.
//! * `behavioral`: DNS e-mail authentication findings (SPF, DMARC, DKIM, CAA).
//! * `organizational`: information disclosure: 0.1 per detected technology
//!   that exposes its version.
//!
//! `overall = 0.5 * technical + 0.25 * behavioral + 0.25 * organizational`,
//! every value clamped to `[0, 1]` and rounded to three decimals.

use crate::core::models::{AnalysisFinding, ScanReport, ScoreResult, Severity};

const TECHNICAL_WEIGHT: f64 = 0.5;
const BEHAVIORAL_WEIGHT: f64 = 0.25;
const ORGANIZATIONAL_WEIGHT: f64 = 0.25;

fn penalty(finding: &AnalysisFinding) -> f64 {
    match finding.severity {
        Severity::Critical => 0.15,
        Severity::Warning => 0.05,
        Severity::Info => 0.02,
    }
}

fn factor<'a>(findings: impl Iterator<Item = &'a AnalysisFinding>) -> f64 {
    round3((1.0 - findings.map(penalty).sum::<f64>()).clamp(0.0, 1.0))
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

/// Weighted overall score from the three factors.
pub fn overall(technical: f64, behavioral: f64, organizational: f64) -> f64 {
    round3(
        (TECHNICAL_WEIGHT * technical + BEHAVIORAL_WEIGHT * behavioral + ORGANIZATIONAL_WEIGHT * organizational)
            .clamp(0.0, 1.0),
    )
}

pub fn score_report(report: &ScanReport) -> ScoreResult {
    let technical = factor(
        report.ssl_results.analysis.iter().chain(report.headers_results.analysis.iter()),
    );
    let behavioral = factor(report.dns_results.analysis.iter());

    let disclosed = report
        .fingerprint_results
        .technologies
        .as_ref()
        .map(|techs| techs.iter().filter(|t| t.version.is_some()).count())
        .unwrap_or(0);
    let organizational = round3((1.0 - 0.1 * disclosed as f64).clamp(0.0, 1.0));

    ScoreResult {
        overall: overall(technical, behavioral, organizational),
        technical,
        behavioral,
        organizational,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::{FingerprintResults, Technology};

    #[test]
    fn clean_report_scores_one() {
        let report = ScanReport::default();
        let score = score_report(&report);
        assert_eq!(score.technical, 1.0);
        assert_eq!(score.overall, 1.0);
    }

    #[test]
    fn findings_lower_their_factor() {
        let mut report = ScanReport::default();
        report.headers_results.analysis = vec![
            AnalysisFinding::new(Severity::Warning, "HEADERS_HSTS_MISSING"),
            AnalysisFinding::new(Severity::Warning, "HEADERS_CSP_MISSING"),
        ];
        report.dns_results.analysis = vec![
            AnalysisFinding::new(Severity::Warning, "DNS_SPF_MISSING"),
            AnalysisFinding::new(Severity::Warning, "DNS_DMARC_POLICY_NONE"),
        ];
        report.fingerprint_results = FingerprintResults {
            technologies: Ok(vec![Technology { name: "Nginx".into(), category: "Web Server".into(), version: Some("1.25".into()) }]),
        };

        let score = score_report(&report);
        assert_eq!(score.technical, 0.9);
        assert_eq!(score.behavioral, 0.9);
        assert_eq!(score.organizational, 0.9);
        assert_eq!(score.overall, 0.9);
    }

    #[test]
    fn factors_never_go_negative() {
        let mut report = ScanReport::default();
        report.ssl_results.analysis = (0..20).map(|_| AnalysisFinding::new(Severity::Critical, "SSL_EXPIRED")).collect();
        assert_eq!(score_report(&report).technical, 0.0);
    }
}
