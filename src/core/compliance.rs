// src/core/compliance.rs

//! DORA and NIS2 assessments.
//!
//! The measurements behind each framework are a fixed baseline profile; the
//! engine applies the framework thresholds to them and derives a status and
//! an ordered list of recommendations. The baseline is the same for every
//! target, so two assessments differ only in the `target` they report.

use std::time::Duration;

use tracing::debug;

use crate::core::models::{ComplianceStatus, DoraResult, Nis2Result, RiskLevel};

/// DORA: maximum time to respond to a major ICT incident.
const DORA_MAX_RESPONSE: Duration = Duration::from_secs(4 * 3600);
const DORA_MIN_RESILIENCE: f64 = 0.7;
/// NIS2: early-warning reporting deadline.
const NIS2_MAX_REPORTING: Duration = Duration::from_secs(24 * 3600);
const NIS2_MIN_SUPPLY_CHAIN: f64 = 0.7;

/// Measurements a DORA assessment is computed from.
#[derive(Debug, Clone)]
pub struct DoraInputs {
    pub ict_risk_score: f64,
    pub incident_response_time: Duration,
    pub resilience_score: f64,
    /// Highest risk level among assessed third-party ICT providers.
    pub worst_third_party_risk: RiskLevel,
}

impl Default for DoraInputs {
    fn default() -> Self {
        Self {
            ict_risk_score: 0.75,
            incident_response_time: Duration::from_secs(2 * 3600),
            resilience_score: 0.85,
            worst_third_party_risk: RiskLevel::Medium,
        }
    }
}

/// Measurements a NIS2 assessment is computed from.
#[derive(Debug, Clone)]
pub struct Nis2Inputs {
    pub risk_level: RiskLevel,
    pub reporting_time: Duration,
    pub continuity_plan_exists: bool,
    pub continuity_plan_tested: bool,
    pub vendor_assessment: f64,
    pub security_requirements: f64,
    pub monitoring_capability: f64,
}

impl Default for Nis2Inputs {
    fn default() -> Self {
        Self {
            risk_level: RiskLevel::Medium,
            reporting_time: Duration::from_secs(2 * 3600),
            continuity_plan_exists: true,
            continuity_plan_tested: true,
            vendor_assessment: 0.8,
            security_requirements: 0.75,
            monitoring_capability: 0.7,
        }
    }
}

impl Nis2Inputs {
    fn supply_chain_score(&self) -> f64 {
        let mean = (self.vendor_assessment + self.security_requirements + self.monitoring_capability) / 3.0;
        (mean * 1000.0).round() / 1000.0
    }

    fn business_continuity_score(&self) -> f64 {
        match (self.continuity_plan_exists, self.continuity_plan_tested) {
            (true, true) => 1.0,
            (true, false) => 0.5,
            (false, _) => 0.0,
        }
    }
}

/// All three checks pass ⇒ compliant, at least one ⇒ partially, none ⇒ non-compliant.
fn status_from_checks(checks: &[bool]) -> ComplianceStatus {
    if checks.iter().all(|ok| *ok) {
        ComplianceStatus::Compliant
    } else if checks.iter().any(|ok| *ok) {
        ComplianceStatus::PartiallyCompliant
    } else {
        ComplianceStatus::NonCompliant
    }
}

fn hours(duration: Duration) -> f64 {
    duration.as_secs_f64() / 3600.0
}

pub fn assess_dora(target: &str) -> DoraResult {
    debug!(target, "Running DORA assessment.");
    assess_dora_with(&DoraInputs::default())
}

pub fn assess_dora_with(inputs: &DoraInputs) -> DoraResult {
    let response_ok = inputs.incident_response_time <= DORA_MAX_RESPONSE;
    let resilience_ok = inputs.resilience_score >= DORA_MIN_RESILIENCE;
    let third_party_ok = !matches!(inputs.worst_third_party_risk, RiskLevel::High | RiskLevel::Critical);
    let compliance_status = status_from_checks(&[response_ok, resilience_ok, third_party_ok]);

    DoraResult {
        ict_risk_score: inputs.ict_risk_score,
        incident_response_hours: hours(inputs.incident_response_time),
        resilience_score: inputs.resilience_score,
        compliance_status,
        recommendations: dora_recommendations(compliance_status),
    }
}

fn dora_recommendations(status: ComplianceStatus) -> Vec<String> {
    let items: &[&str] = match status {
        ComplianceStatus::Compliant => &["Maintain current compliance posture"],
        ComplianceStatus::PartiallyCompliant => &[
            "Improve incident response procedures",
            "Enhance third-party risk management",
            "Strengthen operational resilience",
        ],
        ComplianceStatus::NonCompliant => &[
            "Implement comprehensive ICT risk management framework",
            "Establish incident response team and procedures",
            "Conduct third-party risk assessments",
            "Develop business continuity plans",
        ],
        ComplianceStatus::Unknown => &["Conduct comprehensive compliance assessment"],
    };
    items.iter().map(|s| s.to_string()).collect()
}

pub fn assess_nis2(target: &str) -> Nis2Result {
    debug!(target, "Running NIS2 assessment.");
    assess_nis2_with(&Nis2Inputs::default())
}

pub fn assess_nis2_with(inputs: &Nis2Inputs) -> Nis2Result {
    let supply_chain_score = inputs.supply_chain_score();
    let reporting_ok = inputs.reporting_time <= NIS2_MAX_REPORTING;
    let continuity_ok = inputs.continuity_plan_exists && inputs.continuity_plan_tested;
    let supply_chain_ok = supply_chain_score >= NIS2_MIN_SUPPLY_CHAIN;
    let compliance_status = status_from_checks(&[reporting_ok, continuity_ok, supply_chain_ok]);

    Nis2Result {
        risk_level: inputs.risk_level,
        incident_reporting_hours: hours(inputs.reporting_time),
        business_continuity_score: inputs.business_continuity_score(),
        supply_chain_score,
        compliance_status,
        recommendations: nis2_recommendations(compliance_status),
    }
}

fn nis2_recommendations(status: ComplianceStatus) -> Vec<String> {
    let items: &[&str] = match status {
        ComplianceStatus::Compliant => &["Maintain current compliance posture"],
        ComplianceStatus::PartiallyCompliant => &[
            "Improve incident reporting procedures",
            "Enhance business continuity planning",
            "Strengthen supply chain security",
        ],
        ComplianceStatus::NonCompliant => &[
            "Implement comprehensive risk management system",
            "Establish incident handling procedures",
            "Develop business continuity plans",
            "Conduct supply chain security assessments",
        ],
        ComplianceStatus::Unknown => &["Conduct comprehensive compliance assessment"],
    };
    items.iter().map(|s| s.to_string()).collect()
}
