// src/core/scanner/fingerprint_scanner.rs

//! Technology fingerprinting from one HTTPS response.
//!
//! Each signature names the part of the response it inspects and a pattern.
//! When the pattern has a capture group, the first group is the version.

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::header::HeaderMap;
use scraper::{Html, Selector};
use tracing::{debug, info, warn};

use crate::core::models::{FingerprintResults, Technology};

/// Part of the response a signature is matched against.
#[derive(Debug, Clone, Copy)]
enum Source {
    Header(&'static str),
    Meta(&'static str),
    Body,
    Script,
    Stylesheet,
    Cookie,
}

struct Signature {
    name: &'static str,
    category: &'static str,
    source: Source,
    pattern: Regex,
}

const SIGNATURES: &[(&str, &str, Source, &str)] = &[
    ("Nginx", "Web Server", Source::Header("server"), r"nginx/([\d.]+)"),
    ("Nginx", "Web Server", Source::Body, r"<hr><center>nginx</center>"),
    ("Apache", "Web Server", Source::Header("server"), r"Apache/([\d.]+)"),
    ("Apache", "Web Server", Source::Body, r"Apache Server at"),
    ("Microsoft IIS", "Web Server", Source::Header("server"), r"Microsoft-IIS/([\d.]+)"),
    ("LiteSpeed", "Web Server", Source::Header("server"), r"LiteSpeed"),
    ("Cloudflare", "CDN / WAF", Source::Header("server"), r"cloudflare"),
    ("WordPress", "CMS", Source::Meta("generator"), r"WordPress ([\d.]+)"),
    ("WordPress", "CMS", Source::Body, r"/wp-content/|/wp-includes/"),
    ("Joomla", "CMS", Source::Meta("generator"), r"Joomla!"),
    ("Drupal", "CMS", Source::Header("x-generator"), r"Drupal ([\d.]+)"),
    ("Shopify", "E-commerce", Source::Header("x-shopid"), r".+"),
    ("Magento", "E-commerce", Source::Cookie, r"(?i)magento"),
    ("PHP", "Language", Source::Header("x-powered-by"), r"PHP/([\d.]+)"),
    ("PHP", "Language", Source::Cookie, r"PHPSESSID"),
    ("ASP.NET", "Framework", Source::Header("x-aspnet-version"), r"([\d.]+)"),
    ("Java", "Language", Source::Cookie, r"JSESSIONID"),
    ("Django", "Framework", Source::Cookie, r"csrftoken"),
    ("Ruby on Rails", "Framework", Source::Cookie, r"_rails_session"),
    ("Express", "Framework", Source::Header("x-powered-by"), r"Express"),
    ("Next.js", "JS Framework", Source::Header("x-powered-by"), r"Next\.js ([\d.]+)"),
    ("Next.js", "JS Framework", Source::Script, r"/_next/static/"),
    ("Nuxt.js", "JS Framework", Source::Body, r"__NUXT__"),
    ("Angular", "JS Framework", Source::Body, r#"ng-version="([\d.]+)""#),
    ("Svelte", "JS Framework", Source::Body, r#"class=["']svelte-"#),
    ("Gatsby", "JS Framework", Source::Body, r#"id=["']___gatsby["']"#),
    ("Astro", "JS Framework", Source::Meta("generator"), r"Astro v([\d.]+)"),
    ("React", "JS Library", Source::Body, r"react-dom|data-reactroot"),
    ("Vue.js", "JS Library", Source::Body, r"data-v-app|__VUE_"),
    ("jQuery", "JS Library", Source::Script, r"jquery[-.]?([\d]+\.[\d.]+)?(?:\.min|\.slim)?\.js"),
    ("Bootstrap", "UI Framework", Source::Stylesheet, r"bootstrap(?:\.min)?\.css"),
    ("Google Analytics", "Analytics", Source::Script, r"google-analytics\.com/|googletagmanager\.com/"),
];

static RULES: Lazy<Vec<Signature>> = Lazy::new(|| {
    SIGNATURES
        .iter()
        .filter_map(|&(name, category, source, pattern)| match Regex::new(pattern) {
            Ok(pattern) => Some(Signature { name, category, source, pattern }),
            Err(e) => {
                warn!(tech = name, error = %e, "Skipping invalid fingerprint pattern.");
                None
            }
        })
        .collect()
});

static SCRIPT_SRC: Lazy<Option<Selector>> = Lazy::new(|| Selector::parse("script[src]").ok());
static LINK_HREF: Lazy<Option<Selector>> = Lazy::new(|| Selector::parse("link[href]").ok());

/// Fetches `https://{target}` and matches every signature against it.
pub async fn run_fingerprint_scan(client: &reqwest::Client, target: &str) -> FingerprintResults {
    info!(target, "Starting fingerprint scan.");
    let url = format!("https://{}", target);

    let response = match client.get(&url).send().await {
        Ok(response) => response,
        Err(e) => {
            warn!(url = %url, error = %e, "Fingerprint request failed.");
            return FingerprintResults { technologies: Err(format!("HTTP request failed: {}", e)) };
        }
    };
    let headers = response.headers().clone();
    let body = match response.text().await {
        Ok(body) => body,
        Err(e) => {
            warn!(url = %url, error = %e, "Could not read response body.");
            return FingerprintResults { technologies: Err(format!("Failed to read response body: {}", e)) };
        }
    };

    let technologies = detect_technologies(&headers, &body);
    info!(count = technologies.len(), "Fingerprint scan finished.");
    FingerprintResults { technologies: Ok(technologies) }
}

/// Distinct technologies in a response, ordered by name. A technology seen
/// by several signatures keeps the first version any of them captured.
pub(crate) fn detect_technologies(headers: &HeaderMap, body: &str) -> Vec<Technology> {
    let page = Page::new(headers, body);
    let mut found: BTreeMap<&str, Technology> = BTreeMap::new();

    for rule in RULES.iter() {
        let Some(version) = page.matches(rule) else { continue };
        debug!(tech = rule.name, version = ?version, "Signature matched.");
        let entry = found.entry(rule.name).or_insert_with(|| Technology {
            name: rule.name.to_string(),
            category: rule.category.to_string(),
            version: None,
        });
        if entry.version.is_none() {
            entry.version = version;
        }
    }

    found.into_values().collect()
}

struct Page<'a> {
    headers: &'a HeaderMap,
    body: &'a str,
    cookies: String,
    document: Html,
}

impl<'a> Page<'a> {
    fn new(headers: &'a HeaderMap, body: &'a str) -> Self {
        let cookies = headers
            .get_all("set-cookie")
            .iter()
            .filter_map(|v| v.to_str().ok())
            .collect::<Vec<_>>()
            .join("; ");
        Self { headers, body, cookies, document: Html::parse_document(body) }
    }

    /// Texts a source resolves to in this page.
    fn haystacks(&self, source: Source) -> Vec<&str> {
        match source {
            Source::Header(name) => self.headers.get(name).and_then(|v| v.to_str().ok()).into_iter().collect(),
            Source::Cookie => vec![self.cookies.as_str()],
            Source::Body => vec![self.body],
            Source::Meta(name) => Selector::parse(&format!("meta[name='{}']", name))
                .ok()
                .and_then(|selector| self.document.select(&selector).next())
                .and_then(|el| el.value().attr("content"))
                .into_iter()
                .collect(),
            Source::Script => self.attributes(&SCRIPT_SRC, "src"),
            Source::Stylesheet => self.attributes(&LINK_HREF, "href"),
        }
    }

    fn attributes(&self, selector: &Option<Selector>, attr: &str) -> Vec<&str> {
        selector
            .as_ref()
            .map(|selector| self.document.select(selector).filter_map(|el| el.value().attr(attr)).collect())
            .unwrap_or_default()
    }

    /// `None` when nothing matched, `Some(version)` otherwise.
    fn matches(&self, rule: &Signature) -> Option<Option<String>> {
        self.haystacks(rule.source).into_iter().find_map(|text| {
            rule.pattern.captures(text).map(|caps| {
                caps.get(1).map(|m| m.as_str().to_string()).filter(|v| !v.is_empty())
            })
        })
    }
}
