// src/core/scanner/port_scanner.rs

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpStream;
use tokio::sync::Semaphore;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::core::models::{AnalysisFinding, PortScanResult, PortState, Severity};

/// Ports probed by `port_scan` when no explicit list is given.
pub const COMMON_PORTS: &[u16] = &[
    21, 22, 23, 25, 53, 80, 110, 135, 139, 143, 443, 993, 995, 1723, 3306, 3389, 5432, 6379, 27017,
];

/// Services that should never be reachable from the internet.
const RISKY_PORTS: &[u16] = &[23, 135, 139, 3306, 3389, 5432, 6379, 27017];
/// Services that send credentials in clear text.
const PLAINTEXT_PORTS: &[u16] = &[21, 110, 143];

const PORT_TIMEOUT: Duration = Duration::from_secs(3);
const MAX_CONCURRENT: usize = 64;

/// Scans `ports` on `target` with a bounded number of concurrent connects.
///
/// The target is resolved once; a connect that completes is `Open`, a refused
/// connect is `Closed`, and a connect that times out is `Filtered`.
/// Results are returned in port order.
pub async fn run_port_scan(target: &str, ports: &[u16]) -> Result<Vec<PortScanResult>, String> {
    info!(target, count = ports.len(), "Starting port scan.");
    let ip = resolve_target(target).await?;

    let semaphore = Arc::new(Semaphore::new(MAX_CONCURRENT));
    let mut tasks = Vec::with_capacity(ports.len());
    for &port in ports {
        let semaphore = Arc::clone(&semaphore);
        tasks.push(tokio::spawn(async move {
            // The semaphore is never closed, so acquire only fails if it is dropped.
            let _permit = semaphore.acquire().await;
            probe_port(ip, port).await
        }));
    }

    let mut results = Vec::with_capacity(tasks.len());
    for task in tasks {
        match task.await {
            Ok(result) => results.push(result),
            Err(e) => warn!(error = %e, "Port probe task failed."),
        }
    }
    results.sort_by_key(|r| r.port);

    let open = results.iter().filter(|r| r.state == PortState::Open).count();
    info!(open, "Port scan finished.");
    Ok(results)
}

async fn resolve_target(target: &str) -> Result<IpAddr, String> {
    if let Ok(ip) = target.parse::<IpAddr>() {
        return Ok(ip);
    }
    let mut addrs = tokio::net::lookup_host((target, 0))
        .await
        .map_err(|e| format!("Could not resolve {}: {}", target, e))?;
    addrs
        .next()
        .map(|addr| addr.ip())
        .ok_or_else(|| format!("No IP address found for {}", target))
}

async fn probe_port(ip: IpAddr, port: u16) -> PortScanResult {
    let addr = SocketAddr::new(ip, port);
    let state = match timeout(PORT_TIMEOUT, TcpStream::connect(addr)).await {
        Ok(Ok(_)) => PortState::Open,
        Ok(Err(_)) => PortState::Closed,
        Err(_) => PortState::Filtered,
    };
    debug!(port, ?state, "Probed port.");
    PortScanResult {
        port,
        state,
        service: if state == PortState::Open { detect_service(port) } else { None },
    }
}

/// Well-known service name for a port.
pub fn detect_service(port: u16) -> Option<String> {
    let name = match port {
        21 => "ftp",
        22 => "ssh",
        23 => "telnet",
        25 => "smtp",
        53 => "dns",
        80 => "http",
        110 => "pop3",
        135 => "msrpc",
        139 => "netbios-ssn",
        143 => "imap",
        443 => "https",
        993 => "imaps",
        995 => "pop3s",
        1723 => "pptp",
        3306 => "mysql",
        3389 => "rdp",
        5432 => "postgresql",
        6379 => "redis",
        27017 => "mongodb",
        _ => return None,
    };
    Some(name.to_string())
}

/// Findings for exposed services among the open ports.
pub fn analyze_ports(results: &[PortScanResult]) -> Vec<AnalysisFinding> {
    let open = || results.iter().filter(|r| r.state == PortState::Open);
    let mut analyses = Vec::new();
    if open().any(|r| RISKY_PORTS.contains(&r.port)) {
        analyses.push(AnalysisFinding::new(Severity::Critical, "PORT_RISKY_SERVICE_OPEN"));
    }
    if open().any(|r| PLAINTEXT_PORTS.contains(&r.port)) {
        analyses.push(AnalysisFinding::new(Severity::Warning, "PORT_PLAINTEXT_SERVICE_OPEN"));
    }
    analyses
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn service_detection() {
        assert_eq!(detect_service(80), Some("http".to_string()));
        assert_eq!(detect_service(443), Some("https".to_string()));
        assert_eq!(detect_service(9999), None);
    }

    #[test]
    fn open_redis_is_critical() {
        let results = vec![
            PortScanResult { port: 443, state: PortState::Open, service: detect_service(443) },
            PortScanResult { port: 6379, state: PortState::Open, service: detect_service(6379) },
            PortScanResult { port: 21, state: PortState::Closed, service: None },
        ];
        let findings = analyze_ports(&results);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].code, "PORT_RISKY_SERVICE_OPEN");
    }

    #[tokio::test]
    async fn scans_a_local_listener() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let results = run_port_scan("127.0.0.1", &[port]).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].port, port);
        assert_eq!(results[0].state, PortState::Open);
    }
}
