// src/providers/native.rs

//! The in-process scanning engine.
//!
//! Scans and audits answer with a canonical `ScanResult`, scores with a
//! `ScoreResult` and compliance with the framework result, all as JSON text.
//! Each call is bounded by the configured timeout.

use std::time::{Duration, Instant};

use chrono::Utc;
use serde::Serialize;
use serde_json::{json, Value};
use tokio::time::timeout;
use tracing::{debug, info};

use crate::config::Settings;
use crate::core::models::{
    Framework, Operation, Provenance, ProviderOutcome, RecordStatus, ScanResult, Tool,
};
use crate::core::scanner::{self, dns_scanner, http_probe, port_scanner, ssl_scanner};
use crate::core::{compliance, scoring};
use crate::providers::Backend;

#[derive(Debug, Clone)]
pub struct NativeEngine {
    enabled: bool,
    timeout: Duration,
}

impl NativeEngine {
    pub fn new(enabled: bool, timeout: Duration) -> Self {
        Self { enabled, timeout }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.use_fast_backend, Duration::from_millis(settings.fast_backend_timeout_ms))
    }

    /// Whether `scan <tool>` can be answered without the legacy backend.
    pub fn supports(tool: Tool) -> bool {
        !matches!(tool, Tool::DirScan | Tool::WhoisScan | Tool::XssScan)
    }

    async fn execute(&self, op: &Operation) -> Result<String, String> {
        match op {
            Operation::Scan { tool, target } => {
                let started = Instant::now();
                let outcome = run_tool(*tool, target).await?;
                to_json(&scan_result(target, &tool.to_string(), outcome, started))
            }
            Operation::Audit { target } => {
                let started = Instant::now();
                let client = scanner::http_client()?;
                let report = scanner::run_full_scan(&client, &host_of(target)).await;
                info!(target = %target, findings = report.findings().count(), "Native audit finished.");
                to_json(&scan_result(target, "audit", to_value(&report), started))
            }
            Operation::Score { target } => {
                let client = scanner::http_client()?;
                let report = scanner::run_full_scan(&client, &host_of(target)).await;
                to_json(&scoring::score_report(&report))
            }
            Operation::Compliance { framework: Framework::Dora, target } => to_json(&compliance::assess_dora(target)),
            Operation::Compliance { framework: Framework::Nis2, target } => to_json(&compliance::assess_nis2(target)),
        }
    }
}

impl Backend for NativeEngine {
    fn provenance(&self) -> Provenance {
        Provenance::Native
    }

    async fn call(&self, op: &Operation) -> ProviderOutcome {
        if !self.enabled {
            return ProviderOutcome::Err("native engine disabled".to_string());
        }
        if let Operation::Scan { tool, .. } = op {
            if !Self::supports(*tool) {
                return ProviderOutcome::Err("tool not supported by native engine".to_string());
            }
        }

        debug!(operation = op.name(), target = op.target(), "Dispatching to native engine.");
        match timeout(self.timeout, self.execute(op)).await {
            Ok(Ok(payload)) => ProviderOutcome::Ok(payload),
            Ok(Err(reason)) => ProviderOutcome::Err(reason),
            Err(_) => ProviderOutcome::Err(format!("timed out after {} ms", self.timeout.as_millis())),
        }
    }
}

/// Runs one scan tool. `Err` in the inner result is a failed scan that is
/// still reported as a record; `Err` in the outer result means the engine
/// could not run at all.
async fn run_tool(tool: Tool, target: &str) -> Result<Result<Value, String>, String> {
    let host = host_of(target);
    let outcome = match tool {
        Tool::PortScan => port_scanner::run_port_scan(&host, port_scanner::COMMON_PORTS)
            .await
            .and_then(|ports| {
                let analysis = port_scanner::analyze_ports(&ports);
                to_value(&json!({ "ports": ports, "analysis": analysis }))
            }),
        Tool::SslScan => {
            let results = ssl_scanner::run_ssl_scan(&host).await;
            match &results.scan {
                Err(e) => Err(e.clone()),
                Ok(_) => to_value(&results),
            }
        }
        Tool::DnsEnum => dns_scanner::run_dns_enum(&host)
            .await
            .and_then(|records| to_value(&json!({ "records": records }))),
        Tool::ReverseDns => dns_scanner::run_reverse_dns(&host)
            .await
            .and_then(|records| to_value(&json!({ "records": records }))),
        Tool::HeadersCheck => {
            let client = scanner::http_client()?;
            let results = scanner::headers_scanner::run_headers_scan(&client, &host).await;
            match &results.error {
                Some(e) => Err(e.clone()),
                None => to_value(&results),
            }
        }
        Tool::MethodsScan => {
            let client = scanner::http_client()?;
            http_probe::run_methods_scan(&client, target).await.and_then(|r| to_value(&r))
        }
        Tool::CookieScan => {
            let client = scanner::http_client()?;
            http_probe::run_cookie_scan(&client, target).await.and_then(|r| to_value(&r))
        }
        Tool::UrlAnalyze => {
            let client = scanner::http_client()?;
            http_probe::run_url_analyze(&client, target).await.and_then(|r| to_value(&r))
        }
        Tool::DirScan | Tool::WhoisScan | Tool::XssScan => {
            return Err("tool not supported by native engine".to_string());
        }
    };
    info!(%tool, ok = outcome.is_ok(), "Native scan finished.");
    Ok(outcome)
}

fn scan_result(target: &str, tool: &str, outcome: Result<Value, String>, started: Instant) -> ScanResult {
    let (status, payload) = match outcome {
        Ok(payload) => (RecordStatus::Success, payload),
        Err(error) => (RecordStatus::Error, json!({ "error": error })),
    };
    ScanResult {
        target: target.to_string(),
        tool: tool.to_string(),
        status,
        payload,
        duration_ms: started.elapsed().as_millis() as u64,
        timestamp: Utc::now().to_rfc3339(),
    }
}

/// Host part of a target given as a bare domain or a URL.
pub(crate) fn host_of(target: &str) -> String {
    http_probe::normalize_url(target)
        .ok()
        .and_then(|url| url.host_str().map(String::from))
        .unwrap_or_else(|| target.to_string())
}

fn to_value<T: Serialize>(value: &T) -> Result<Value, String> {
    serde_json::to_value(value).map_err(|e| format!("failed to encode result: {}", e))
}

fn to_json<T: Serialize>(value: &T) -> Result<String, String> {
    serde_json::to_string(value).map_err(|e| format!("failed to encode result: {}", e))
}
