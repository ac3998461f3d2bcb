// src/core/scanner/headers_scanner.rs

//! Presence of the HTTP response headers that harden a site in the browser.

use reqwest::header::HeaderMap;
use tracing::{debug, info, warn};

use crate::core::models::{AnalysisFinding, HeaderData, HeadersResults, ProbeResult, Severity};

/// Value of `name`, or `Ok(None)` when absent. A non-UTF-8 value still
/// counts as present.
pub(crate) fn check_header(headers: &HeaderMap, name: &str) -> ProbeResult<HeaderData> {
    let Some(raw) = headers.get(name) else {
        debug!(header = name, "Header absent.");
        return Ok(None);
    };
    let value = raw.to_str().map(str::to_string).unwrap_or_else(|_| {
        warn!(header = name, "Header value is not UTF-8.");
        "[Invalid UTF-8]".to_string()
    });
    Ok(Some(HeaderData { value }))
}

/// GETs `https://{target}` and records the security headers of the response.
pub async fn run_headers_scan(client: &reqwest::Client, target: &str) -> HeadersResults {
    info!(target, "Starting headers scan.");
    let url = format!("https://{}", target);

    let mut results = match client.get(&url).send().await {
        Ok(response) => {
            debug!(status = %response.status(), "Headers response received.");
            headers_from_map(response.headers())
        }
        Err(e) => {
            warn!(url = %url, error = %e, "Headers request failed.");
            HeadersResults { error: Some(format!("HTTP request failed: {}", e)), ..Default::default() }
        }
    };
    results.analysis = analyze_headers_results(&results);
    info!(findings = results.analysis.len(), "Headers scan finished.");
    results
}

/// Header presence for a response, without analysis.
pub(crate) fn headers_from_map(headers: &HeaderMap) -> HeadersResults {
    HeadersResults {
        hsts: check_header(headers, "strict-transport-security"),
        csp: check_header(headers, "content-security-policy"),
        x_frame_options: check_header(headers, "x-frame-options"),
        x_content_type_options: check_header(headers, "x-content-type-options"),
        referrer_policy: check_header(headers, "referrer-policy"),
        permissions_policy: check_header(headers, "permissions-policy"),
        error: None,
        analysis: Vec::new(),
    }
}

/// One finding per missing header. A failed request yields a single
/// critical `HEADERS_REQUEST_FAILED` instead.
pub(crate) fn analyze_headers_results(results: &HeadersResults) -> Vec<AnalysisFinding> {
    if results.error.is_some() {
        return vec![AnalysisFinding::new(Severity::Critical, "HEADERS_REQUEST_FAILED")];
    }

    let checks = [
        (&results.hsts, Severity::Warning, "HEADERS_HSTS_MISSING"),
        (&results.csp, Severity::Warning, "HEADERS_CSP_MISSING"),
        (&results.x_frame_options, Severity::Warning, "HEADERS_X_FRAME_OPTIONS_MISSING"),
        (&results.x_content_type_options, Severity::Info, "HEADERS_X_CONTENT_TYPE_OPTIONS_MISSING"),
        (&results.referrer_policy, Severity::Info, "HEADERS_REFERRER_POLICY_MISSING"),
        (&results.permissions_policy, Severity::Info, "HEADERS_PERMISSIONS_POLICY_MISSING"),
    ];

    checks
        .into_iter()
        .filter(|(header, _, _)| matches!(header, Ok(None)))
        .map(|(_, severity, code)| AnalysisFinding::new(severity, code))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    #[test]
    fn all_headers_present_yields_no_findings() {
        let mut map = HeaderMap::new();
        map.insert("strict-transport-security", HeaderValue::from_static("max-age=31536000"));
        map.insert("content-security-policy", HeaderValue::from_static("default-src 'self'"));
        map.insert("x-frame-options", HeaderValue::from_static("DENY"));
        map.insert("x-content-type-options", HeaderValue::from_static("nosniff"));
        map.insert("referrer-policy", HeaderValue::from_static("no-referrer"));
        map.insert("permissions-policy", HeaderValue::from_static("geolocation=()"));

        let results = headers_from_map(&map);
        assert!(analyze_headers_results(&results).is_empty());
    }

    #[test]
    fn missing_hsts_is_a_warning() {
        let map = HeaderMap::new();
        let results = headers_from_map(&map);
        let findings = analyze_headers_results(&results);
        assert_eq!(findings.len(), 6);
        let hsts = findings.iter().find(|f| f.code == "HEADERS_HSTS_MISSING").unwrap();
        assert_eq!(hsts.severity, Severity::Warning);
    }

    #[test]
    fn request_failure_short_circuits() {
        let results = HeadersResults {
            error: Some("connection refused".into()),
            ..Default::default()
        };
        let findings = analyze_headers_results(&results);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].code, "HEADERS_REQUEST_FAILED");
    }
}
