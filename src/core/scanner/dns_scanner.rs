// src/core/scanner/dns_scanner.rs

//! E-mail authentication and CAA hygiene, plus the plain `dns_enum` and
//! `reverse_dns` tools.

use std::net::IpAddr;

use hickory_resolver::TokioAsyncResolver;
use hickory_resolver::config::{ResolverConfig, ResolverOpts};
use hickory_resolver::error::{ResolveError, ResolveErrorKind};
use hickory_resolver::proto::rr::RecordType;
use tracing::{debug, info, warn};

use crate::core::models::{
    AnalysisFinding, DkimRecord, DmarcData, DnsRecord, DnsResults, ProbeResult, Severity, SpfData,
};

/// Selectors tried when looking for a DKIM key.
const DKIM_SELECTORS: &[&str] = &["google", "selector1", "selector2", "default", "dkim", "k1"];

/// Looks up SPF, DMARC, DKIM and CAA for the registrable domain of `target`
/// and attaches the hygiene findings.
pub async fn run_dns_scan(target: &str) -> DnsResults {
    let domain = root_domain(target);
    info!(domain, "Starting DNS scan.");
    let resolver = new_resolver();

    let dmarc_name = format!("_dmarc.{}", domain);
    let (spf, dmarc, dkim, caa) = tokio::join!(
        txt_records(&resolver, domain),
        txt_records(&resolver, &dmarc_name),
        lookup_dkim(&resolver, domain),
        lookup_caa(&resolver, domain)
    );

    let mut results = DnsResults {
        spf: spf.map(|records| spf_record(&records)),
        dmarc: dmarc.map(|records| dmarc_record(&records)),
        dkim,
        caa,
        analysis: Vec::new(),
    };
    results.analysis = analyze_dns_results(&results);
    info!(findings = results.analysis.len(), "DNS scan finished.");
    results
}

fn new_resolver() -> TokioAsyncResolver {
    TokioAsyncResolver::tokio(ResolverConfig::default(), ResolverOpts::default())
}

/// Mail records live on the apex, not on `www.`.
fn root_domain(target: &str) -> &str {
    target.strip_prefix("www.").unwrap_or(target)
}

fn is_absent(e: &ResolveError) -> bool {
    matches!(e.kind(), ResolveErrorKind::NoRecordsFound { .. })
}

/// TXT strings at `name`. A name with no TXT records yields an empty list;
/// only resolver failures are errors.
async fn txt_records(resolver: &TokioAsyncResolver, name: &str) -> Result<Vec<String>, String> {
    match resolver.txt_lookup(name).await {
        Ok(lookup) => Ok(lookup.iter().map(|txt| txt.to_string()).collect()),
        Err(e) if is_absent(&e) => {
            debug!(record = name, "No TXT records.");
            Ok(Vec::new())
        }
        Err(e) => {
            warn!(record = name, error = %e, "TXT lookup failed.");
            Err(format!("DNS Error: {}", e))
        }
    }
}

fn spf_record(records: &[String]) -> Option<SpfData> {
    records
        .iter()
        .find(|r| r.starts_with("v=spf1"))
        .map(|record| SpfData { record: record.clone() })
}

fn dmarc_record(records: &[String]) -> Option<DmarcData> {
    records.iter().find(|r| r.starts_with("v=DMARC1")).map(|record| DmarcData {
        record: record.clone(),
        policy: tag_value(record, "p").map(str::to_ascii_lowercase),
    })
}

/// Value of a `key=value` tag in a `;`-separated record.
fn tag_value<'a>(record: &'a str, key: &str) -> Option<&'a str> {
    record.split(';').find_map(|part| {
        let (k, v) = part.split_once('=')?;
        k.trim().eq_ignore_ascii_case(key).then(|| v.trim())
    })
}

async fn lookup_dkim(resolver: &TokioAsyncResolver, domain: &str) -> ProbeResult<Vec<DkimRecord>> {
    let mut found = Vec::new();
    let mut failures = 0;
    for selector in DKIM_SELECTORS {
        let name = format!("{selector}._domainkey.{domain}");
        match txt_records(resolver, &name).await {
            Ok(records) => found.extend(
                records
                    .into_iter()
                    .filter(|r| r.starts_with("v=DKIM1") || r.contains("p="))
                    .map(|record| DkimRecord { selector: selector.to_string(), record }),
            ),
            Err(_) => failures += 1,
        }
    }

    if failures == DKIM_SELECTORS.len() {
        return Err("DNS Error: every DKIM selector lookup failed".to_string());
    }
    debug!(domain, keys = found.len(), "DKIM lookup finished.");
    Ok((!found.is_empty()).then_some(found))
}

async fn lookup_caa(resolver: &TokioAsyncResolver, domain: &str) -> ProbeResult<Vec<String>> {
    match resolver.lookup(domain, RecordType::CAA).await {
        Ok(lookup) => {
            let records: Vec<String> = lookup.iter().map(|r| r.to_string()).collect();
            Ok((!records.is_empty()).then_some(records))
        }
        Err(e) if is_absent(&e) => Ok(None),
        Err(e) => {
            warn!(domain, error = %e, "CAA lookup failed.");
            Err(format!("DNS Error: {}", e))
        }
    }
}

/// Enumerates the common record types (A, AAAA, MX, NS, TXT) for a domain.
///
/// Lookups run concurrently; a record type that fails to resolve is simply
/// absent from the output. The call only fails when every lookup failed,
/// which usually means the name does not exist or DNS is unreachable.
pub async fn run_dns_enum(target: &str) -> Result<Vec<DnsRecord>, String> {
    info!(target, "Starting DNS enumeration.");
    let resolver = new_resolver();
    let name = target.to_string();

    let (a, aaaa, mx, ns, txt) = tokio::join!(
        resolver.ipv4_lookup(target),
        resolver.ipv6_lookup(target),
        resolver.mx_lookup(target),
        resolver.ns_lookup(target),
        resolver.txt_lookup(target)
    );

    let mut records = Vec::new();
    let mut failures = Vec::new();
    let mut push = |record_type: &str, value: String| {
        records.push(DnsRecord { record_type: record_type.to_string(), name: name.clone(), value });
    };

    match a {
        Ok(lookup) => lookup.iter().for_each(|r| push("A", r.to_string())),
        Err(e) => failures.push(format!("A: {}", e)),
    }
    match aaaa {
        Ok(lookup) => lookup.iter().for_each(|r| push("AAAA", r.to_string())),
        Err(e) => failures.push(format!("AAAA: {}", e)),
    }
    match mx {
        Ok(lookup) => lookup.iter().for_each(|r| push("MX", format!("{} {}", r.preference(), r.exchange()))),
        Err(e) => failures.push(format!("MX: {}", e)),
    }
    match ns {
        Ok(lookup) => lookup.iter().for_each(|r| push("NS", r.to_string())),
        Err(e) => failures.push(format!("NS: {}", e)),
    }
    match txt {
        Ok(lookup) => lookup.iter().for_each(|r| push("TXT", r.to_string())),
        Err(e) => failures.push(format!("TXT: {}", e)),
    }

    if failures.len() == 5 {
        warn!(target, "Every DNS lookup failed.");
        return Err(format!("DNS enumeration failed: {}", failures.join("; ")));
    }

    info!(count = %records.len(), "DNS enumeration finished.");
    Ok(records)
}

/// Resolves PTR names for a target. An IP is looked up directly; a host name
/// is first resolved and each of its addresses is looked up in turn.
pub async fn run_reverse_dns(target: &str) -> Result<Vec<DnsRecord>, String> {
    info!(target, "Starting reverse DNS lookup.");
    let resolver = new_resolver();

    let addresses: Vec<IpAddr> = match target.parse::<IpAddr>() {
        Ok(ip) => vec![ip],
        Err(_) => resolver
            .lookup_ip(target)
            .await
            .map_err(|e| format!("DNS Error: {}", e))?
            .iter()
            .collect(),
    };

    let mut records = Vec::new();
    for ip in addresses {
        match resolver.reverse_lookup(ip).await {
            Ok(lookup) => {
                for name in lookup.iter() {
                    records.push(DnsRecord {
                        record_type: "PTR".to_string(),
                        name: ip.to_string(),
                        value: name.to_string(),
                    });
                }
            }
            Err(e) => debug!(%ip, error = %e, "No PTR record."),
        }
    }

    info!(count = %records.len(), "Reverse DNS lookup finished.");
    Ok(records)
}

/// Findings for the collected records. A lookup that errored produces no
/// finding, since absence could not be established.
pub(crate) fn analyze_dns_results(results: &DnsResults) -> Vec<AnalysisFinding> {
    let mut findings = Vec::new();

    match &results.dmarc {
        Ok(None) => findings.push(AnalysisFinding::new(Severity::Critical, "DNS_DMARC_MISSING")),
        Ok(Some(dmarc)) if dmarc.policy.as_deref() == Some("none") => {
            findings.push(AnalysisFinding::new(Severity::Warning, "DNS_DMARC_POLICY_NONE"))
        }
        _ => {}
    }

    match &results.spf {
        Ok(None) => findings.push(AnalysisFinding::new(Severity::Warning, "DNS_SPF_MISSING")),
        Ok(Some(spf)) => match spf.record.split_whitespace().last() {
            Some("~all") => findings.push(AnalysisFinding::new(Severity::Info, "DNS_SPF_POLICY_SOFTFAIL")),
            Some("?all") => findings.push(AnalysisFinding::new(Severity::Info, "DNS_SPF_POLICY_NEUTRAL")),
            _ => {}
        },
        Err(_) => {}
    }

    if matches!(results.dkim, Ok(None)) {
        findings.push(AnalysisFinding::new(Severity::Info, "DNS_DKIM_MISSING"));
    }
    if matches!(results.caa, Ok(None)) {
        findings.push(AnalysisFinding::new(Severity::Info, "DNS_CAA_MISSING"));
    }

    debug!(count = findings.len(), "DNS analysis done.");
    findings
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_domain_strips_www() {
        assert_eq!(root_domain("www.example.com"), "example.com");
        assert_eq!(root_domain("api.example.com"), "api.example.com");
    }

    #[test]
    fn dmarc_policy_is_parsed_from_tags() {
        let records = vec!["google-site-verification=x".to_string(), "v=DMARC1; P = Reject ; rua=mailto:a@b".to_string()];
        let dmarc = dmarc_record(&records).unwrap();
        assert_eq!(dmarc.policy.as_deref(), Some("reject"));
        assert!(dmarc_record(&records[..1]).is_none());
    }

    #[test]
    fn spf_is_picked_among_txt_records() {
        let records = vec!["v=verify123".to_string(), "v=spf1 mx -all".to_string()];
        assert_eq!(spf_record(&records).unwrap().record, "v=spf1 mx -all");
    }

    #[test]
    fn missing_dmarc_is_critical() {
        let findings = analyze_dns_results(&DnsResults::default());
        assert!(findings.iter().any(|f| f.code == "DNS_DMARC_MISSING" && f.severity == Severity::Critical));
        assert!(findings.iter().any(|f| f.code == "DNS_SPF_MISSING"));
    }

    #[test]
    fn dmarc_policy_none_and_softfail_spf() {
        let results = DnsResults {
            spf: Ok(Some(SpfData { record: "v=spf1 include:_spf.example.com ~all".into() })),
            dmarc: Ok(Some(DmarcData { record: "v=DMARC1; p=none".into(), policy: Some("none".into()) })),
            dkim: Ok(Some(vec![])),
            caa: Ok(Some(vec!["0 issue \"letsencrypt.org\"".into()])),
            analysis: vec![],
        };
        let codes: Vec<String> = analyze_dns_results(&results).into_iter().map(|f| f.code).collect();
        assert_eq!(codes, vec!["DNS_DMARC_POLICY_NONE", "DNS_SPF_POLICY_SOFTFAIL"]);
    }

    #[test]
    fn lookup_errors_add_no_findings() {
        let results = DnsResults {
            spf: Err("DNS Error".into()),
            dmarc: Err("DNS Error".into()),
            dkim: Err("DNS Error".into()),
            caa: Err("DNS Error".into()),
            analysis: vec![],
        };
        assert!(analyze_dns_results(&results).is_empty());
    }
}
