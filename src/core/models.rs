// src/core/models.rs

use serde::{Serialize, Deserialize};
use chrono::{DateTime, Utc};
use strum::{Display, EnumString, IntoStaticStr, VariantArray};

// --- Reusable Result Types ---

// A result that can hold an optional success value or a String error.
// `Ok(None)` means the lookup worked but found nothing.
pub type ProbeResult<T> = Result<Option<T>, String>;

// --- Core Data Models ---

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum Severity {
    Critical,
    Warning,
    Info,
}

// An analysis finding: a severity and a knowledge-base code.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisFinding {
    pub severity: Severity,
    pub code: String,
}

impl AnalysisFinding {
    pub fn new(severity: Severity, code: &str) -> Self {
        Self { severity, code: code.to_string() }
    }
}

// --- DNS Scanner Models ---

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpfData {
    pub record: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DmarcData {
    pub record: String,
    pub policy: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DkimRecord {
    pub selector: String,
    pub record: String,
}

// Aggregated e-mail hygiene results: SPF, DMARC, DKIM and CAA.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DnsResults {
    pub spf: ProbeResult<SpfData>,
    pub dmarc: ProbeResult<DmarcData>,
    pub dkim: ProbeResult<Vec<DkimRecord>>,
    pub caa: ProbeResult<Vec<String>>,
    pub analysis: Vec<AnalysisFinding>,
}

impl Default for DnsResults {
    fn default() -> Self {
        Self {
            spf: Ok(None),
            dmarc: Ok(None),
            dkim: Ok(None),
            caa: Ok(None),
            analysis: Vec::new(),
        }
    }
}

// A single enumerated DNS record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DnsRecord {
    pub record_type: String,
    pub name: String,
    pub value: String,
}

// --- SSL/TLS Scanner Models ---

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CertificateInfo {
    pub subject_name: String,
    pub issuer_name: String,
    pub not_before: DateTime<Utc>,
    pub not_after: DateTime<Utc>,
    pub days_until_expiry: i64,
    pub serial_number: String,
    pub signature_algorithm: String,
    pub san: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SslData {
    pub is_valid: bool,
    pub certificate_info: CertificateInfo,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SslResults {
    pub scan: ProbeResult<SslData>,
    pub analysis: Vec<AnalysisFinding>,
}

impl Default for SslResults {
    fn default() -> Self {
        Self {
            scan: Ok(None),
            analysis: Vec::new(),
        }
    }
}

// --- HTTP Header Scanner Models ---

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeaderData {
    pub value: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeadersResults {
    pub hsts: ProbeResult<HeaderData>,
    pub csp: ProbeResult<HeaderData>,
    pub x_frame_options: ProbeResult<HeaderData>,
    pub x_content_type_options: ProbeResult<HeaderData>,
    pub referrer_policy: ProbeResult<HeaderData>,
    pub permissions_policy: ProbeResult<HeaderData>,
    pub error: Option<String>,
    pub analysis: Vec<AnalysisFinding>,
}

impl Default for HeadersResults {
    fn default() -> Self {
        Self {
            hsts: Ok(None),
            csp: Ok(None),
            x_frame_options: Ok(None),
            x_content_type_options: Ok(None),
            referrer_policy: Ok(None),
            permissions_policy: Ok(None),
            error: None,
            analysis: Vec::new(),
        }
    }
}

// --- HTTP Probe Models (methods, cookies, url) ---

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct MethodsResults {
    pub allowed: Vec<String>,
    pub analysis: Vec<AnalysisFinding>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CookieData {
    pub name: String,
    pub secure: bool,
    pub http_only: bool,
    pub same_site: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CookieResults {
    pub cookies: Vec<CookieData>,
    pub analysis: Vec<AnalysisFinding>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UrlAnalysis {
    pub input: String,
    pub scheme: String,
    pub host: String,
    pub port: Option<u16>,
    pub path: String,
    pub final_url: Option<String>,
    pub http_status: Option<u16>,
    pub redirected_to_https: bool,
    pub analysis: Vec<AnalysisFinding>,
}

// --- Port Scanner Models ---

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PortState {
    Open,
    Closed,
    Filtered,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortScanResult {
    pub port: u16,
    pub state: PortState,
    pub service: Option<String>,
}

// --- Fingerprint Scanner Models ---

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Technology {
    pub name: String,
    pub category: String,
    pub version: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FingerprintResults {
    pub technologies: Result<Vec<Technology>, String>,
}

impl Default for FingerprintResults {
    fn default() -> Self {
        Self {
            technologies: Ok(Vec::new()),
        }
    }
}

// --- Comprehensive Report ---

// Combines the results of the audit scanners into one report.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ScanReport {
    pub dns_results: DnsResults,
    pub ssl_results: SslResults,
    pub headers_results: HeadersResults,
    pub fingerprint_results: FingerprintResults,
}

impl ScanReport {
    /// Every finding across the report, in scanner order.
    pub fn findings(&self) -> impl Iterator<Item = &AnalysisFinding> {
        self.dns_results.analysis.iter()
            .chain(self.ssl_results.analysis.iter())
            .chain(self.headers_results.analysis.iter())
    }
}

// --- Canonical Records ---

/// The tools accepted by `scan`. Names match the legacy CLI's tool list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, IntoStaticStr, VariantArray, Serialize, Deserialize, clap::ValueEnum)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
#[value(rename_all = "snake_case")]
pub enum Tool {
    CookieScan,
    DirScan,
    DnsEnum,
    HeadersCheck,
    MethodsScan,
    PortScan,
    ReverseDns,
    SslScan,
    UrlAnalyze,
    WhoisScan,
    XssScan,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum RecordStatus {
    Success,
    Error,
}

/// Canonical scan record. Both backends are normalized into this shape
/// before anything is persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanResult {
    pub target: String,
    pub tool: String,
    pub status: RecordStatus,
    pub payload: serde_json::Value,
    pub duration_ms: u64,
    pub timestamp: String,
}

/// Cyber score, every factor in `[0, 1]`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ScoreResult {
    pub overall: f64,
    pub technical: f64,
    pub behavioral: f64,
    pub organizational: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
pub enum ComplianceStatus {
    Compliant,
    PartiallyCompliant,
    NonCompliant,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DoraResult {
    pub ict_risk_score: f64,
    pub incident_response_hours: f64,
    pub resilience_score: f64,
    pub compliance_status: ComplianceStatus,
    pub recommendations: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Nis2Result {
    pub risk_level: RiskLevel,
    pub incident_reporting_hours: f64,
    pub business_continuity_score: f64,
    pub supply_chain_score: f64,
    pub compliance_status: ComplianceStatus,
    pub recommendations: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "framework", rename_all = "lowercase")]
pub enum ComplianceResult {
    Dora(DoraResult),
    Nis2(Nis2Result),
}

/// A single compliance framework.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, IntoStaticStr)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Framework {
    Dora,
    Nis2,
}

/// Which backend produced a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Provenance {
    Native,
    Legacy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreRecord {
    pub target: String,
    pub status: RecordStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<ScoreResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<Provenance>,
    pub duration_ms: u64,
    pub timestamp: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplianceRecord {
    pub framework: Framework,
    pub target: String,
    pub status: RecordStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<ComplianceResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<Provenance>,
    pub duration_ms: u64,
    pub timestamp: String,
}

/// The joint record written by `compliance both`. Holds both sections even
/// when one of them failed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CombinedComplianceRecord {
    pub target: String,
    pub dora: ComplianceRecord,
    pub nis2: ComplianceRecord,
    pub timestamp: String,
}

// --- Provider Boundary ---

/// Uniform contract returned by every adapter call: the raw payload text,
/// or a reason the call failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderOutcome {
    Ok(String),
    Err(String),
}

/// A logical operation handed to a provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    Scan { tool: Tool, target: String },
    Score { target: String },
    Audit { target: String },
    Compliance { framework: Framework, target: String },
}

impl Operation {
    pub fn target(&self) -> &str {
        match self {
            Operation::Scan { target, .. }
            | Operation::Score { target }
            | Operation::Audit { target }
            | Operation::Compliance { target, .. } => target,
        }
    }

    /// Short operation name, used in logs and as the record's `tool` for audits.
    pub fn name(&self) -> &'static str {
        match self {
            Operation::Scan { tool, .. } => tool.into(),
            Operation::Score { .. } => "score",
            Operation::Audit { .. } => "audit",
            Operation::Compliance { framework, .. } => framework.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn tool_names_are_snake_case() {
        assert_eq!(Tool::PortScan.to_string(), "port_scan");
        assert_eq!(Tool::from_str("headers_check").unwrap(), Tool::HeadersCheck);
        assert_eq!(Tool::VARIANTS.len(), 11);
    }

    #[test]
    fn scan_result_serializes_camel_case() {
        let result = ScanResult {
            target: "example.com".into(),
            tool: "ssl_scan".into(),
            status: RecordStatus::Success,
            payload: serde_json::json!({}),
            duration_ms: 12,
            timestamp: "2024-01-01T00:00:00Z".into(),
        };
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["status"], "success");
        assert_eq!(value["durationMs"], 12);
    }

    #[test]
    fn compliance_result_is_tagged_by_framework() {
        let result = ComplianceResult::Dora(DoraResult {
            ict_risk_score: 0.75,
            incident_response_hours: 2.0,
            resilience_score: 0.85,
            compliance_status: ComplianceStatus::Compliant,
            recommendations: vec![],
        });
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["framework"], "dora");
        assert_eq!(value["complianceStatus"], "Compliant");
    }
}
