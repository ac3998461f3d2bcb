// src/report.rs

//! Markdown companions for audit and compliance artifacts.

use std::fmt::Write;

use serde_json::Value;

use crate::core::knowledge_base::{self, FindingCategory};
use crate::core::models::{
    ComplianceRecord, ComplianceResult, DoraResult, Nis2Result, RecordStatus, ScanResult, Severity,
};

/// A finding as it appears in a payload: a `code` and a `severity`.
struct PayloadFinding {
    code: String,
    severity: String,
}

/// Collects every `{code, severity}` object in the payload, depth first.
fn collect_findings(value: &Value, out: &mut Vec<PayloadFinding>) {
    match value {
        Value::Object(map) => {
            if let (Some(Value::String(code)), Some(Value::String(severity))) = (map.get("code"), map.get("severity")) {
                out.push(PayloadFinding { code: code.clone(), severity: severity.clone() });
                return;
            }
            for child in map.values() {
                collect_findings(child, out);
            }
        }
        Value::Array(items) => items.iter().for_each(|item| collect_findings(item, out)),
        _ => {}
    }
}

fn severity_label(severity: &Severity) -> &'static str {
    match severity {
        Severity::Critical => "Critical",
        Severity::Warning => "Warning",
        Severity::Info => "Info",
    }
}

pub fn audit_markdown(record: &ScanResult) -> String {
    let mut md = String::new();
    let _ = writeln!(md, "# Security Audit: {}\n", record.target);
    let _ = writeln!(md, "- **Status:** {}", record.status);
    let _ = writeln!(md, "- **Duration:** {} ms", record.duration_ms);
    let _ = writeln!(md, "- **Generated:** {}\n", record.timestamp);

    if record.status == RecordStatus::Error {
        let reason = record.payload.get("error").and_then(Value::as_str).unwrap_or("unknown error");
        let _ = writeln!(md, "The audit could not be completed: {}", reason);
        return md;
    }

    let mut findings = Vec::new();
    collect_findings(&record.payload, &mut findings);
    if findings.is_empty() {
        let _ = writeln!(md, "No issues were found during the audit.");
        return md;
    }

    let mut known: Vec<_> = findings
        .iter()
        .filter_map(|f| knowledge_base::get_finding_detail(&f.code))
        .collect();
    known.sort_by_key(|d| d.category);

    let mut current: Option<FindingCategory> = None;
    for detail in &known {
        if current != Some(detail.category) {
            let _ = writeln!(md, "## {}\n", detail.category);
            current = Some(detail.category);
        }
        let _ = writeln!(md, "### [{}] {}\n", severity_label(&detail.severity), detail.title);
        let _ = writeln!(md, "{}\n", detail.description);
        let _ = writeln!(md, "**Remediation:** {}\n", detail.remediation);
    }

    let unknown: Vec<_> = findings
        .iter()
        .filter(|f| knowledge_base::get_finding_detail(&f.code).is_none())
        .collect();
    if !unknown.is_empty() {
        let _ = writeln!(md, "## Other Findings\n");
        for finding in unknown {
            let _ = writeln!(md, "- [{}] `{}`", finding.severity, finding.code);
        }
    }
    md
}

fn write_recommendations(md: &mut String, recommendations: &[String]) {
    let _ = writeln!(md, "\n## Recommendations\n");
    if recommendations.is_empty() {
        let _ = writeln!(md, "None.");
    }
    for (i, rec) in recommendations.iter().enumerate() {
        let _ = writeln!(md, "{}. {}", i + 1, rec);
    }
}

fn write_dora(md: &mut String, result: &DoraResult) {
    let _ = writeln!(md, "| Metric | Value |\n|---|---|");
    let _ = writeln!(md, "| Compliance status | {} |", result.compliance_status);
    let _ = writeln!(md, "| ICT risk score | {:.2} |", result.ict_risk_score);
    let _ = writeln!(md, "| Incident response time | {:.1} h |", result.incident_response_hours);
    let _ = writeln!(md, "| Operational resilience | {:.2} |", result.resilience_score);
    write_recommendations(md, &result.recommendations);
}

fn write_nis2(md: &mut String, result: &Nis2Result) {
    let _ = writeln!(md, "| Metric | Value |\n|---|---|");
    let _ = writeln!(md, "| Compliance status | {} |", result.compliance_status);
    let _ = writeln!(md, "| Risk level | {} |", result.risk_level);
    let _ = writeln!(md, "| Incident reporting time | {:.1} h |", result.incident_reporting_hours);
    let _ = writeln!(md, "| Business continuity | {:.2} |", result.business_continuity_score);
    let _ = writeln!(md, "| Supply chain security | {:.2} |", result.supply_chain_score);
    write_recommendations(md, &result.recommendations);
}

pub fn compliance_markdown(record: &ComplianceRecord) -> String {
    let title = match record.framework {
        crate::core::models::Framework::Dora => "DORA",
        crate::core::models::Framework::Nis2 => "NIS2",
    };
    let mut md = String::new();
    let _ = writeln!(md, "# {} Compliance Report: {}\n", title, record.target);
    let _ = writeln!(md, "- **Status:** {}", record.status);
    if let Some(provider) = record.provider {
        let _ = writeln!(md, "- **Provider:** {}", provider);
    }
    let _ = writeln!(md, "- **Generated:** {}\n", record.timestamp);

    match (&record.result, &record.error) {
        (Some(ComplianceResult::Dora(result)), _) => write_dora(&mut md, result),
        (Some(ComplianceResult::Nis2(result)), _) => write_nis2(&mut md, result),
        (None, Some(error)) => {
            let _ = writeln!(md, "The assessment could not be completed: {}", error);
        }
        (None, None) => {
            let _ = writeln!(md, "No assessment data.");
        }
    }
    md
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::compliance;
    use crate::core::models::Framework;
    use serde_json::json;

    fn audit(payload: Value, status: RecordStatus) -> ScanResult {
        ScanResult {
            target: "example.com".into(),
            tool: "audit".into(),
            status,
            payload,
            duration_ms: 5,
            timestamp: "2024-01-01T00:00:00Z".into(),
        }
    }

    #[test]
    fn audit_groups_known_findings() {
        let payload = json!({
            "dns_results": {"analysis": [{"severity": "Warning", "code": "DNS_DMARC_MISSING"}]},
            "headers_results": {"analysis": [{"severity": "Warning", "code": "HEADERS_HSTS_MISSING"}]},
            "extra": [{"severity": "Info", "code": "VENDOR_SPECIFIC"}]
        });
        let md = audit_markdown(&audit(payload, RecordStatus::Success));
        assert!(md.contains("## DNS Configuration"));
        assert!(md.contains("## HTTP Security\n"));
        assert!(md.contains("`VENDOR_SPECIFIC`"));
    }

    #[test]
    fn failed_audit_reports_the_reason() {
        let md = audit_markdown(&audit(json!({"error": "fallback disabled"}), RecordStatus::Error));
        assert!(md.contains("fallback disabled"));
    }

    #[test]
    fn compliance_lists_recommendations() {
        let record = ComplianceRecord {
            framework: Framework::Nis2,
            target: "example.com".into(),
            status: RecordStatus::Success,
            result: Some(ComplianceResult::Nis2(compliance::assess_nis2("example.com"))),
            error: None,
            provider: None,
            duration_ms: 1,
            timestamp: "2024-01-01T00:00:00Z".into(),
        };
        let md = compliance_markdown(&record);
        assert!(md.starts_with("# NIS2 Compliance Report: example.com"));
        assert!(md.contains("1. Maintain current compliance posture"));
    }
}
