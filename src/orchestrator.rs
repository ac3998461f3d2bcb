// src/orchestrator.rs

//! Primary → fallback execution.
//!
//! Every operation is tried on the primary backend first. The primary is
//! considered failed when the call errors, when its payload carries a failed
//! `status`, or when the payload is not JSON; the cause is logged and the
//! fallback is tried once. Whatever happens, the operation ends with exactly
//! one JSON artifact on disk (plus a Markdown companion for audits and
//! compliance). Backend failures become `status: error` records, never
//! process errors; only artifact I/O can fail an invocation.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Instant;

use chrono::Utc;
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::config::ComplianceMode;
use crate::core::models::{
    CombinedComplianceRecord, ComplianceRecord, ComplianceResult, ComplianceStatus, DoraResult, Framework,
    Nis2Result, Operation, Provenance, ProviderOutcome, RecordStatus, RiskLevel, ScanResult, ScoreRecord,
    ScoreResult, Tool,
};
use crate::core::scoring;
use crate::error::Result;
use crate::output::OutputSink;
use crate::providers::Backend;
use crate::report;
use crate::validate::{self, SchemaKind};

/// A record together with the artifacts it was written to.
#[derive(Debug, Clone)]
pub struct Persisted<T> {
    pub record: T,
    pub artifacts: Vec<PathBuf>,
}

/// Result of the compliance command: one record per framework assessed and,
/// in both-mode, the combined record.
#[derive(Debug, Clone)]
pub struct ComplianceRun {
    pub records: Vec<ComplianceRecord>,
    pub combined: Option<CombinedComplianceRecord>,
    pub artifacts: Vec<PathBuf>,
}

/// Payload accepted from one of the backends.
struct Served {
    value: Value,
    provenance: Provenance,
}

/// Payload `status` values that mark a failed operation.
const FAILED_STATUSES: &[&str] = &["error", "failed", "failure"];

fn reports_failure(value: &Value) -> bool {
    value
        .get("status")
        .and_then(Value::as_str)
        .map(|s| FAILED_STATUSES.contains(&s.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Best error message a failed payload offers.
fn payload_error(value: &Value) -> String {
    ["error", "message", "detail"]
        .iter()
        .find_map(|key| value.get(key).and_then(Value::as_str))
        .unwrap_or("backend reported a failed status")
        .to_string()
}

fn now() -> String {
    Utc::now().to_rfc3339()
}

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis() as u64
}

pub struct Orchestrator<P, F> {
    primary: P,
    fallback: F,
    sink: OutputSink,
}

impl<P: Backend, F: Backend> Orchestrator<P, F> {
    pub fn new(primary: P, fallback: F, sink: OutputSink) -> Self {
        Self { primary, fallback, sink }
    }

    /// Runs `op` on the primary, then on the fallback when the primary fails.
    /// `Err` carries the last failure reason.
    async fn execute(&self, op: &Operation) -> std::result::Result<Served, String> {
        let operation = op.name();
        let target = op.target();

        match self.primary.call(op).await {
            ProviderOutcome::Ok(raw) => match validate::safe_parse(&raw) {
                Ok(value) if reports_failure(&value) => {
                    warn!(operation, target, cause = "status", reason = %payload_error(&value), "Primary backend failed, falling back.");
                }
                Ok(value) => {
                    info!(operation, target, provider = %self.primary.provenance(), "Operation served.");
                    return Ok(Served { value, provenance: self.primary.provenance() });
                }
                Err(reason) => {
                    warn!(operation, target, cause = "unparsable", %reason, "Primary backend failed, falling back.");
                }
            },
            ProviderOutcome::Err(reason) => {
                warn!(operation, target, cause = "unavailable", %reason, "Primary backend failed, falling back.");
            }
        }

        match self.fallback.call(op).await {
            ProviderOutcome::Ok(raw) => match validate::safe_parse(&raw) {
                Ok(value) => {
                    info!(operation, target, provider = %self.fallback.provenance(), "Operation served.");
                    Ok(Served { value, provenance: self.fallback.provenance() })
                }
                Err(reason) => {
                    warn!(operation, target, %reason, "Fallback output is unusable.");
                    Err(format!("unparsable fallback output: {}", reason))
                }
            },
            ProviderOutcome::Err(reason) => {
                warn!(operation, target, %reason, "Fallback backend failed.");
                Err(reason)
            }
        }
    }

    pub async fn scan(&self, tool: Tool, target: &str) -> Result<Persisted<ScanResult>> {
        let op = Operation::Scan { tool, target: target.to_string() };
        let record = self.scan_like(&op).await;
        let path = self.sink.write_record("scan", target, &record)?;
        Ok(Persisted { record, artifacts: vec![path] })
    }

    pub async fn audit(&self, target: &str) -> Result<Persisted<ScanResult>> {
        let op = Operation::Audit { target: target.to_string() };
        let record = self.scan_like(&op).await;
        let json = self.sink.write_record("audit", target, &record)?;
        let md = self.sink.write_text("audit", target, &report::audit_markdown(&record))?;
        Ok(Persisted { record, artifacts: vec![json, md] })
    }

    async fn scan_like(&self, op: &Operation) -> ScanResult {
        let started = Instant::now();
        let outcome = self.execute(op).await;
        normalize_scan(op, outcome, elapsed_ms(started))
    }

    pub async fn score(&self, target: &str) -> Result<Persisted<ScoreRecord>> {
        let op = Operation::Score { target: target.to_string() };
        let started = Instant::now();
        let outcome = self.execute(&op).await;
        let duration_ms = elapsed_ms(started);

        let (status, score, error, provider) = match outcome {
            Ok(served) => {
                validate::validate_shape(&served.value, SchemaKind::Score);
                if reports_failure(&served.value) {
                    (RecordStatus::Error, None, Some(payload_error(&served.value)), Some(served.provenance))
                } else {
                    match normalize_score(&served.value) {
                        Some(score) => (RecordStatus::Success, Some(score), None, Some(served.provenance)),
                        None => (
                        RecordStatus::Error,
                        None,
                            Some("payload has no score factors".to_string()),
                            Some(served.provenance),
                        ),
                    }
                }
            }
            Err(reason) => (RecordStatus::Error, None, Some(reason), None),
        };

        let record = ScoreRecord {
            target: target.to_string(),
            status,
            score,
            error,
            provider,
            duration_ms,
            timestamp: now(),
        };
        let path = self.sink.write_record("score", target, &record)?;
        Ok(Persisted { record, artifacts: vec![path] })
    }

    /// Assesses one framework and persists its JSON and Markdown artifacts.
    async fn assess(&self, framework: Framework, target: &str) -> Result<Persisted<ComplianceRecord>> {
        let op = Operation::Compliance { framework, target: target.to_string() };
        let started = Instant::now();
        let outcome = self.execute(&op).await;
        let record = normalize_compliance(framework, target, outcome, elapsed_ms(started));

        let kind = format!("compliance-{}", framework);
        let json = self.sink.write_record(&kind, target, &record)?;
        let md = self.sink.write_text(&kind, target, &report::compliance_markdown(&record))?;
        Ok(Persisted { record, artifacts: vec![json, md] })
    }

    pub async fn compliance(&self, mode: ComplianceMode, target: &str) -> Result<ComplianceRun> {
        let single = match mode {
            ComplianceMode::Dora => Some(Framework::Dora),
            ComplianceMode::Nis2 => Some(Framework::Nis2),
            ComplianceMode::Both => None,
        };
        if let Some(framework) = single {
            let persisted = self.assess(framework, target).await?;
            return Ok(ComplianceRun {
                records: vec![persisted.record],
                combined: None,
                artifacts: persisted.artifacts,
            });
        }

        let (dora, nis2) = tokio::join!(
            self.assess(Framework::Dora, target),
            self.assess(Framework::Nis2, target)
        );
        let (dora, nis2) = (dora?, nis2?);

        let combined = CombinedComplianceRecord {
            target: target.to_string(),
            dora: dora.record.clone(),
            nis2: nis2.record.clone(),
            timestamp: now(),
        };
        let combined_path = self.sink.write_record("compliance-combined", target, &combined)?;

        let mut artifacts = dora.artifacts;
        artifacts.extend(nis2.artifacts);
        artifacts.push(combined_path);
        Ok(ComplianceRun {
            records: vec![dora.record, nis2.record],
            combined: Some(combined),
            artifacts,
        })
    }
}

/// Canonical scan record. The primary already answers with one; anything
/// else becomes the payload of a fresh record.
fn normalize_scan(op: &Operation, outcome: std::result::Result<Served, String>, duration_ms: u64) -> ScanResult {
    let target = op.target().to_string();
    let tool = op.name().to_string();
    match outcome {
        Ok(served) => {
            validate::validate_shape(&served.value, SchemaKind::Scan);
            if served.provenance == Provenance::Native {
                if let Ok(record) = serde_json::from_value::<ScanResult>(served.value.clone()) {
                    return record;
                }
            }
            let status = if reports_failure(&served.value) { RecordStatus::Error } else { RecordStatus::Success };
            ScanResult { target, tool, status, payload: served.value, duration_ms, timestamp: now() }
        }
        Err(reason) => ScanResult {
            target,
            tool,
            status: RecordStatus::Error,
            payload: json!({ "error": reason }),
            duration_ms,
            timestamp: now(),
        },
    }
}

fn number(value: &Value, keys: &[&str]) -> Option<f64> {
    keys.iter().find_map(|key| match value.get(key)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    })
}

/// Values in `(1, 100]` are percentages.
fn unit_interval(raw: f64) -> f64 {
    let scaled = if raw > 1.0 && raw <= 100.0 { raw / 100.0 } else { raw };
    (scaled.clamp(0.0, 1.0) * 1000.0).round() / 1000.0
}

/// Reads the score factors from the payload (or its `score` / `data`
/// member). A missing factor takes the overall value, a missing overall is
/// computed from the factors.
fn normalize_score(value: &Value) -> Option<ScoreResult> {
    let section = validate::score_section(value)?;
    let overall = number(section, &["overall", "overall_score", "overallScore"]).map(unit_interval);
    let factor = |keys: &[&str]| number(section, keys).map(unit_interval).or(overall).unwrap_or(0.0);

    let technical = factor(&["technical", "technical_score", "technicalScore"]);
    let behavioral = factor(&["behavioral", "behavioral_score", "behavioralScore"]);
    let organizational = factor(&["organizational", "organizational_score", "organizationalScore"]);
    Some(ScoreResult {
        overall: overall.unwrap_or_else(|| scoring::overall(technical, behavioral, organizational)),
        technical,
        behavioral,
        organizational,
    })
}

/// `PartiallyCompliant`, `partially_compliant` and `partially compliant`
/// all read the same.
fn parse_enum<T: FromStr>(value: &Value, keys: &[&str], variants: &[(&str, T)]) -> Option<T>
where
    T: Copy,
{
    let raw = keys.iter().find_map(|key| value.get(key).and_then(Value::as_str))?;
    let folded: String = raw.chars().filter(|c| c.is_ascii_alphanumeric()).collect::<String>().to_ascii_lowercase();
    variants
        .iter()
        .find(|(name, _)| *name == folded)
        .map(|(_, v)| *v)
        .or_else(|| raw.parse().ok())
}

fn compliance_status(value: &Value) -> ComplianceStatus {
    parse_enum(
        value,
        &["complianceStatus", "compliance_status", "status"],
        &[
            ("compliant", ComplianceStatus::Compliant),
            ("partiallycompliant", ComplianceStatus::PartiallyCompliant),
            ("noncompliant", ComplianceStatus::NonCompliant),
            ("unknown", ComplianceStatus::Unknown),
        ],
    )
    .unwrap_or(ComplianceStatus::Unknown)
}

fn recommendations(value: &Value) -> Vec<String> {
    value
        .get("recommendations")
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(|v| v.as_str().map(String::from)).collect())
        .unwrap_or_default()
}

fn normalize_dora(value: &Value) -> DoraResult {
    let section = validate::compliance_section(value).unwrap_or(value);
    DoraResult {
        ict_risk_score: number(section, &["ictRiskScore", "ict_risk_score"]).unwrap_or(0.0),
        incident_response_hours: number(
            section,
            &["incidentResponseHours", "incident_response_hours", "incidentResponseTime", "incident_response_time"],
        )
        .unwrap_or(0.0),
        resilience_score: number(section, &["resilienceScore", "resilience_score"]).unwrap_or(0.0),
        compliance_status: compliance_status(section),
        recommendations: recommendations(section),
    }
}

fn normalize_nis2(value: &Value) -> Nis2Result {
    let section = validate::compliance_section(value).unwrap_or(value);
    Nis2Result {
        risk_level: parse_enum(
            section,
            &["riskLevel", "risk_level"],
            &[
                ("low", RiskLevel::Low),
                ("medium", RiskLevel::Medium),
                ("high", RiskLevel::High),
                ("critical", RiskLevel::Critical),
            ],
        )
        .unwrap_or(RiskLevel::Medium),
        incident_reporting_hours: number(
            section,
            &["incidentReportingHours", "incident_reporting_hours", "incidentReportingTime", "incident_reporting_time"],
        )
        .unwrap_or(0.0),
        business_continuity_score: number(section, &["businessContinuityScore", "business_continuity_score"])
            .unwrap_or(0.0),
        supply_chain_score: number(section, &["supplyChainScore", "supply_chain_score"]).unwrap_or(0.0),
        compliance_status: compliance_status(section),
        recommendations: recommendations(section),
    }
}

fn normalize_compliance(
    framework: Framework,
    target: &str,
    outcome: std::result::Result<Served, String>,
    duration_ms: u64,
) -> ComplianceRecord {
    let (status, result, error, provider) = match outcome {
        Ok(served) if reports_failure(&served.value) => {
            (RecordStatus::Error, None, Some(payload_error(&served.value)), Some(served.provenance))
        }
        Ok(served) => {
            let kind = match framework {
                Framework::Dora => SchemaKind::Dora,
                Framework::Nis2 => SchemaKind::Nis2,
            };
            validate::validate_shape(&served.value, kind);
            let result = match framework {
                Framework::Dora => ComplianceResult::Dora(normalize_dora(&served.value)),
                Framework::Nis2 => ComplianceResult::Nis2(normalize_nis2(&served.value)),
            };
            (RecordStatus::Success, Some(result), None, Some(served.provenance))
        }
        Err(reason) => (RecordStatus::Error, None, Some(reason), None),
    };
    ComplianceRecord {
        framework,
        target: target.to_string(),
        status,
        result,
        error,
        provider,
        duration_ms,
        timestamp: now(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    /// Backend answering every call with a fixed outcome, or per framework.
    struct Scripted {
        provenance: Provenance,
        outcome: ProviderOutcome,
        dora_outcome: Option<ProviderOutcome>,
        calls: AtomicUsize,
    }

    impl Scripted {
        fn new(provenance: Provenance, outcome: ProviderOutcome) -> Self {
            Self { provenance, outcome, dora_outcome: None, calls: AtomicUsize::new(0) }
        }

        fn ok(provenance: Provenance, payload: Value) -> Self {
            Self::new(provenance, ProviderOutcome::Ok(payload.to_string()))
        }

        fn err(provenance: Provenance, reason: &str) -> Self {
            Self::new(provenance, ProviderOutcome::Err(reason.to_string()))
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl Backend for Scripted {
        fn provenance(&self) -> Provenance {
            self.provenance
        }

        async fn call(&self, op: &Operation) -> ProviderOutcome {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match (op, &self.dora_outcome) {
                (Operation::Compliance { framework: Framework::Dora, .. }, Some(outcome)) => outcome.clone(),
                _ => self.outcome.clone(),
            }
        }
    }

    fn orchestrator(primary: Scripted, fallback: Scripted) -> (Orchestrator<Scripted, Scripted>, TempDir) {
        let dir = TempDir::new().unwrap();
        let sink = OutputSink::new(dir.path().join("results"));
        (Orchestrator::new(primary, fallback, sink), dir)
    }

    fn artifact(path: &std::path::Path) -> Value {
        serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
    }

    #[tokio::test]
    async fn primary_success_skips_the_fallback() {
        let canonical = json!({
            "target": "example.com", "tool": "ssl_scan", "status": "success",
            "payload": {"valid": true}, "durationMs": 3, "timestamp": "2024-01-01T00:00:00Z"
        });
        let (orch, _dir) = orchestrator(
            Scripted::ok(Provenance::Native, canonical),
            Scripted::err(Provenance::Legacy, "unused"),
        );

        let run = orch.scan(Tool::SslScan, "example.com").await.unwrap();
        assert_eq!(run.record.status, RecordStatus::Success);
        assert_eq!(run.record.duration_ms, 3);
        assert_eq!(orch.fallback.calls(), 0);
        assert_eq!(artifact(&run.artifacts[0])["payload"]["valid"], true);
    }

    #[tokio::test]
    async fn failed_status_triggers_the_fallback() {
        let (orch, _dir) = orchestrator(
            Scripted::ok(Provenance::Native, json!({"status": "error", "error": "boom"})),
            Scripted::ok(Provenance::Legacy, json!({"open_ports": [80, 443]})),
        );

        let run = orch.scan(Tool::PortScan, "example.com").await.unwrap();
        assert_eq!(orch.fallback.calls(), 1);
        assert_eq!(run.record.status, RecordStatus::Success);
        assert_eq!(run.record.tool, "port_scan");
        assert_eq!(run.record.payload["open_ports"][1], 443);
    }

    #[tokio::test]
    async fn unparsable_primary_triggers_the_fallback() {
        let (orch, _dir) = orchestrator(
            Scripted::new(Provenance::Native, ProviderOutcome::Ok("{not json".into())),
            Scripted::ok(Provenance::Legacy, json!({"records": []})),
        );
        let run = orch.scan(Tool::DnsEnum, "example.com").await.unwrap();
        assert_eq!(orch.fallback.calls(), 1);
        assert_eq!(run.record.status, RecordStatus::Success);
    }

    #[tokio::test]
    async fn both_failing_still_writes_an_error_artifact() {
        let (orch, _dir) = orchestrator(
            Scripted::err(Provenance::Native, "native engine disabled"),
            Scripted::err(Provenance::Legacy, "fallback disabled"),
        );

        let run = orch.scan(Tool::WhoisScan, "https://Example.com!!").await.unwrap();
        assert_eq!(run.artifacts.len(), 1);
        let written = artifact(&run.artifacts[0]);
        assert_eq!(written["status"], "error");
        assert_eq!(written["payload"]["error"], "fallback disabled");

        let name = run.artifacts[0].file_name().unwrap().to_str().unwrap().to_string();
        assert!(name.starts_with("scan-https-example-com-"));
    }

    #[tokio::test]
    async fn legacy_scores_are_normalized() {
        let (orch, _dir) = orchestrator(
            Scripted::err(Provenance::Native, "timed out after 10 ms"),
            Scripted::ok(Provenance::Legacy, json!({"score": {"technical": 80, "behavioral": 0.6, "organizational": "70"}})),
        );

        let run = orch.score("example.com").await.unwrap();
        let score = run.record.score.unwrap();
        assert_eq!(score.technical, 0.8);
        assert_eq!(score.behavioral, 0.6);
        assert_eq!(score.organizational, 0.7);
        assert_eq!(score.overall, 0.725);
        assert_eq!(run.record.provider, Some(Provenance::Legacy));
    }

    #[tokio::test]
    async fn failed_status_wins_over_partial_score_factors() {
        let (orch, _dir) = orchestrator(
            Scripted::err(Provenance::Native, "native engine disabled"),
            Scripted::ok(Provenance::Legacy, json!({"status": "error", "error": "quota exceeded", "technical": 0.4})),
        );

        let run = orch.score("example.com").await.unwrap();
        assert_eq!(run.record.status, RecordStatus::Error);
        assert!(run.record.score.is_none());
        assert_eq!(run.record.error.as_deref(), Some("quota exceeded"));
        assert_eq!(run.record.provider, Some(Provenance::Legacy));
    }

    #[tokio::test]
    async fn audit_writes_a_markdown_companion() {
        let (orch, _dir) = orchestrator(
            Scripted::err(Provenance::Native, "down"),
            Scripted::err(Provenance::Legacy, "exit code 1: boom"),
        );
        let run = orch.audit("example.com").await.unwrap();
        assert_eq!(run.artifacts.len(), 2);
        assert!(std::fs::read_to_string(&run.artifacts[1]).unwrap().contains("exit code 1: boom"));
    }

    #[tokio::test]
    async fn both_mode_keeps_the_surviving_framework() {
        let nis2 = json!({
            "riskLevel": "Medium", "incidentReportingHours": 2.0, "businessContinuityScore": 1.0,
            "supplyChainScore": 0.75, "complianceStatus": "Compliant", "recommendations": ["Keep going"]
        });
        let mut primary = Scripted::ok(Provenance::Native, nis2);
        primary.dora_outcome = Some(ProviderOutcome::Err("dora engine crashed".into()));
        let (orch, _dir) = orchestrator(primary, Scripted::err(Provenance::Legacy, "fallback disabled"));

        let run = orch.compliance(ComplianceMode::Both, "example.com").await.unwrap();
        assert_eq!(run.records.len(), 2);
        assert_eq!(run.artifacts.len(), 5);

        let combined = artifact(run.artifacts.last().unwrap());
        assert_eq!(combined["dora"]["status"], "error");
        assert_eq!(combined["dora"]["error"], "fallback disabled");
        assert_eq!(combined["nis2"]["status"], "success");
        assert_eq!(combined["nis2"]["result"]["complianceStatus"], "Compliant");
        assert_eq!(combined["nis2"]["provider"], "native");
    }

    #[test]
    fn lenient_compliance_fields() {
        let dora = normalize_dora(&json!({"data": {"compliance_status": "PARTIALLY_COMPLIANT", "ict_risk_score": "0.5"}}));
        assert_eq!(dora.compliance_status, ComplianceStatus::PartiallyCompliant);
        assert_eq!(dora.ict_risk_score, 0.5);
        assert!(dora.recommendations.is_empty());

        let nis2 = normalize_nis2(&json!({}));
        assert_eq!(nis2.compliance_status, ComplianceStatus::Unknown);
    }
}
