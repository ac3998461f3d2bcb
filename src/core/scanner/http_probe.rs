// src/core/scanner/http_probe.rs

//! Lightweight HTTP probes: allowed methods, cookie flags and URL analysis.

use tracing::{debug, info, warn};

use crate::core::models::{
    AnalysisFinding, CookieData, CookieResults, MethodsResults, Severity, UrlAnalysis,
};
use reqwest::header::HeaderMap;
use reqwest::Method;
use url::Url;

/// Methods that should not be exposed by a public web server.
const DANGEROUS_METHODS: &[&str] = &["PUT", "DELETE", "TRACE", "CONNECT", "PATCH"];

/// Adds `https://` when the input has no scheme, then parses it.
pub fn normalize_url(input: &str) -> Result<Url, String> {
    let with_scheme = if input.starts_with("http://") || input.starts_with("https://") {
        input.to_string()
    } else {
        format!("https://{}", input)
    };
    Url::parse(&with_scheme).map_err(|e| format!("Invalid URL '{}': {}", input, e))
}

/// Sends an `OPTIONS` request and reports the methods listed in `Allow`.
pub async fn run_methods_scan(client: &reqwest::Client, target: &str) -> Result<MethodsResults, String> {
    info!(target, "Starting HTTP methods scan.");
    let url = normalize_url(target)?;

    let response = client
        .request(Method::OPTIONS, url.as_str())
        .send()
        .await
        .map_err(|e| format!("HTTP request failed: {}", e))?;

    let allowed = parse_allow_header(response.headers());
    let analysis = analyze_methods(&allowed);
    info!(count = %allowed.len(), "HTTP methods scan finished.");
    Ok(MethodsResults { allowed, analysis })
}

fn parse_allow_header(headers: &HeaderMap) -> Vec<String> {
    let mut methods: Vec<String> = headers
        .get_all("allow")
        .iter()
        .chain(headers.get_all("access-control-allow-methods").iter())
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .map(|m| m.trim().to_ascii_uppercase())
        .filter(|m| !m.is_empty())
        .collect();
    methods.sort();
    methods.dedup();
    methods
}

fn analyze_methods(allowed: &[String]) -> Vec<AnalysisFinding> {
    if allowed.iter().any(|m| DANGEROUS_METHODS.contains(&m.as_str())) {
        debug!(?allowed, "Dangerous method advertised.");
        vec![AnalysisFinding::new(Severity::Warning, "METHODS_DANGEROUS_ALLOWED")]
    } else {
        Vec::new()
    }
}

/// Fetches the target and inspects the flags of every `Set-Cookie` header.
pub async fn run_cookie_scan(client: &reqwest::Client, target: &str) -> Result<CookieResults, String> {
    info!(target, "Starting cookie scan.");
    let url = normalize_url(target)?;

    let response = client
        .get(url.as_str())
        .send()
        .await
        .map_err(|e| format!("HTTP request failed: {}", e))?;

    let cookies: Vec<CookieData> = response
        .headers()
        .get_all("set-cookie")
        .iter()
        .filter_map(|v| v.to_str().ok())
        .filter_map(parse_set_cookie)
        .collect();

    let analysis = analyze_cookies(&cookies);
    info!(count = %cookies.len(), "Cookie scan finished.");
    Ok(CookieResults { cookies, analysis })
}

pub(crate) fn parse_set_cookie(header: &str) -> Option<CookieData> {
    let mut parts = header.split(';');
    let name = parts.next()?.split('=').next()?.trim();
    if name.is_empty() {
        return None;
    }

    let mut cookie = CookieData {
        name: name.to_string(),
        secure: false,
        http_only: false,
        same_site: None,
    };
    for attribute in parts {
        let attribute = attribute.trim();
        let (key, value) = match attribute.split_once('=') {
            Some((k, v)) => (k.trim(), Some(v.trim())),
            None => (attribute, None),
        };
        match key.to_ascii_lowercase().as_str() {
            "secure" => cookie.secure = true,
            "httponly" => cookie.http_only = true,
            "samesite" => cookie.same_site = value.map(str::to_string),
            _ => {}
        }
    }
    Some(cookie)
}

fn analyze_cookies(cookies: &[CookieData]) -> Vec<AnalysisFinding> {
    let mut analyses = Vec::new();
    if cookies.iter().any(|c| !c.secure) {
        analyses.push(AnalysisFinding::new(Severity::Warning, "COOKIE_NOT_SECURE"));
    }
    if cookies.iter().any(|c| !c.http_only) {
        analyses.push(AnalysisFinding::new(Severity::Info, "COOKIE_NOT_HTTPONLY"));
    }
    analyses
}

/// Parses the target as a URL and checks whether plain HTTP is redirected
/// to HTTPS.
pub async fn run_url_analyze(client: &reqwest::Client, target: &str) -> Result<UrlAnalysis, String> {
    info!(target, "Starting URL analysis.");
    let url = normalize_url(target)?;
    let host = url.host_str().ok_or_else(|| format!("URL '{}' has no host", target))?.to_string();

    let mut plain = url.clone();
    // `set_scheme` only fails for special/non-special mismatches, never http<->https.
    let _ = plain.set_scheme("http");

    let (final_url, http_status) = match client.get(plain.as_str()).send().await {
        Ok(response) => (Some(response.url().to_string()), Some(response.status().as_u16())),
        Err(e) => {
            warn!(url = %plain, error = %e, "Plain HTTP request failed.");
            (None, None)
        }
    };

    let redirected_to_https = final_url
        .as_deref()
        .map(|u| u.starts_with("https://"))
        .unwrap_or(false);

    let mut analysis = Vec::new();
    if final_url.is_some() && !redirected_to_https {
        analysis.push(AnalysisFinding::new(Severity::Warning, "URL_NO_HTTPS_REDIRECT"));
    }

    info!(redirected_to_https, "URL analysis finished.");
    Ok(UrlAnalysis {
        input: target.to_string(),
        scheme: url.scheme().to_string(),
        host,
        port: url.port(),
        path: url.path().to_string(),
        final_url,
        http_status,
        redirected_to_https,
        analysis,
    })
}
