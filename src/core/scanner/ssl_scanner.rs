// src/core/scanner/ssl_scanner.rs

//! Certificate inspection on port 443.
//!
//! native-tls is blocking, so the connection and handshake run on the
//! blocking pool. The certificate is then decoded with x509-parser.

use std::fmt::Display;
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use chrono::{DateTime, Utc};
use native_tls::TlsConnector;
use tokio::task::spawn_blocking;
use tracing::{debug, info, warn};
use x509_parser::prelude::*;

use crate::core::models::{AnalysisFinding, CertificateInfo, ProbeResult, Severity, SslData, SslResults};

const TLS_PORT: u16 = 443;
const IO_TIMEOUT: Duration = Duration::from_secs(10);
const EXPIRY_WARNING_DAYS: i64 = 30;

pub async fn run_ssl_scan(target: &str) -> SslResults {
    info!(target, "Starting TLS scan.");
    let host = target.to_string();
    let scan = match spawn_blocking(move || peer_certificate(&host)).await {
        Ok(outcome) => outcome.and_then(|der| der.map(|der| describe(&der, Utc::now())).transpose()),
        Err(e) => Err(format!("TLS task failed: {}", e)),
    };

    let mut results = SslResults { scan, analysis: Vec::new() };
    results.analysis = analyze_ssl_results(&results);
    info!(findings = results.analysis.len(), "TLS scan finished.");
    results
}

/// Logs a failed stage and turns it into the scan's error string.
fn stage<E: Display>(name: &'static str) -> impl Fn(E) -> String {
    move |e| {
        warn!(stage = name, error = %e, "TLS scan stage failed.");
        format!("{}: {}", name, e)
    }
}

/// DER bytes of the certificate the server presents, `None` when the
/// handshake completes without one.
fn peer_certificate(host: &str) -> Result<Option<Vec<u8>>, String> {
    let connector = TlsConnector::new().map_err(stage("TLS setup"))?;
    let addr = (host, TLS_PORT)
        .to_socket_addrs()
        .map_err(stage("Address resolution"))?
        .next()
        .ok_or_else(|| format!("Address resolution: no address for {}", host))?;

    debug!(host, %addr, "Connecting.");
    let tcp = TcpStream::connect_timeout(&addr, IO_TIMEOUT).map_err(stage("TCP connect"))?;
    tcp.set_read_timeout(Some(IO_TIMEOUT)).map_err(stage("TCP connect"))?;
    tcp.set_write_timeout(Some(IO_TIMEOUT)).map_err(stage("TCP connect"))?;

    let tls = connector.connect(host, tcp).map_err(stage("TLS handshake"))?;
    match tls.peer_certificate().map_err(stage("Peer certificate"))? {
        Some(cert) => cert.to_der().map(Some).map_err(stage("DER encoding")),
        None => Ok(None),
    }
}

fn describe(der: &[u8], now: DateTime<Utc>) -> Result<SslData, String> {
    let (_, x509) = parse_x509_certificate(der).map_err(stage("X.509 parsing"))?;
    let validity = x509.validity();
    let not_before = to_utc(&validity.not_before);
    let not_after = to_utc(&validity.not_after);
    debug!(subject = %x509.subject(), %not_after, "Certificate decoded.");

    let san = x509
        .subject_alternative_name()
        .ok()
        .flatten()
        .map(|ext| {
            ext.value
                .general_names
                .iter()
                .filter_map(|name| match name {
                    GeneralName::DNSName(dns) => Some(dns.to_string()),
                    _ => None,
                })
                .collect()
        })
        .unwrap_or_default();

    Ok(SslData {
        is_valid: not_before < now && now < not_after,
        certificate_info: CertificateInfo {
            subject_name: x509.subject().to_string(),
            issuer_name: x509.issuer().to_string(),
            not_before,
            not_after,
            days_until_expiry: (not_after - now).num_days(),
            serial_number: x509.raw_serial_as_string(),
            signature_algorithm: x509.signature_algorithm.algorithm.to_id_string(),
            san,
        },
    })
}

fn to_utc(time: &ASN1Time) -> DateTime<Utc> {
    DateTime::from_timestamp(time.timestamp(), 0).unwrap_or_default()
}

pub(crate) fn analyze_ssl_results(results: &SslResults) -> Vec<AnalysisFinding> {
    let data = match &results.scan {
        Err(_) => return vec![AnalysisFinding::new(Severity::Critical, "SSL_HANDSHAKE_FAILED")],
        Ok(None) => return vec![AnalysisFinding::new(Severity::Warning, "SSL_NO_CERTIFICATE_FOUND")],
        Ok(Some(data)) => data,
    };

    let mut findings = Vec::new();
    if !data.is_valid {
        findings.push(AnalysisFinding::new(Severity::Critical, "SSL_EXPIRED"));
    }
    if (0..=EXPIRY_WARNING_DAYS).contains(&data.certificate_info.days_until_expiry) {
        findings.push(AnalysisFinding::new(Severity::Warning, "SSL_EXPIRING_SOON"));
    }
    findings
}
