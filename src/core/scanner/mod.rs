// src/core/scanner/mod.rs

//! Native probes. `run_full_scan` is the audit; the other tools are called
//! one at a time by the native engine.

pub mod dns_scanner;
pub mod fingerprint_scanner;
pub mod headers_scanner;
pub mod http_probe;
pub mod port_scanner;
pub mod ssl_scanner;

use std::time::Duration;

use crate::core::models::ScanReport;

/// Per-request timeout for every HTTP probe.
const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Builds the HTTP client shared by the header, fingerprint and probe scans.
pub fn http_client() -> Result<reqwest::Client, String> {
    reqwest::Client::builder()
        .user_agent(concat!("scorton/", env!("CARGO_PKG_VERSION")))
        .timeout(HTTP_TIMEOUT)
        .build()
        .map_err(|e| format!("Failed to build HTTP client: {}", e))
}

/// DNS, TLS, headers and fingerprint scans of `host`, run concurrently.
pub async fn run_full_scan(client: &reqwest::Client, host: &str) -> ScanReport {
    let (dns_results, ssl_results, headers_results, fingerprint_results) = tokio::join!(
        dns_scanner::run_dns_scan(host),
        ssl_scanner::run_ssl_scan(host),
        headers_scanner::run_headers_scan(client, host),
        fingerprint_scanner::run_fingerprint_scan(client, host)
    );
    ScanReport { dns_results, ssl_results, headers_results, fingerprint_results }
}
