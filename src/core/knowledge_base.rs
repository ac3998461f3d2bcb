// src/core/knowledge_base.rs

//! Every finding code the native engine can emit, with the prose the audit
//! Markdown report prints for it.

use crate::core::models::Severity;
use std::fmt;

/// Report section a finding is listed under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum FindingCategory {
    Dns,
    Ssl,
    Http,
    Network,
}

impl fmt::Display for FindingCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let title = match self {
            FindingCategory::Dns => "DNS Configuration",
            FindingCategory::Ssl => "SSL/TLS Certificate",
            FindingCategory::Http => "HTTP Security",
            FindingCategory::Network => "Network Exposure",
        };
        f.write_str(title)
    }
}

/// Explanation and remediation for one finding code.
pub struct FindingDetail {
    pub code: &'static str,
    pub title: &'static str,
    pub category: FindingCategory,
    /// Severity the scanners attach to this code.
    pub severity: Severity,
    pub description: &'static str,
    pub remediation: &'static str,
}

const fn detail(
    code: &'static str,
    category: FindingCategory,
    severity: Severity,
    title: &'static str,
    description: &'static str,
    remediation: &'static str,
) -> FindingDetail {
    FindingDetail { code, title, category, severity, description, remediation }
}

use FindingCategory::{Dns, Http, Network, Ssl};
use Severity::{Critical, Info, Warning};

static FINDINGS: &[FindingDetail] = &[
    // DNS e-mail authentication
    detail(
        "DNS_DMARC_MISSING", Dns, Critical,
        "No DMARC Record",
        "The domain publishes no `_dmarc` TXT record, so receivers have no policy for mail that fails SPF or DKIM and spoofed mail from this domain is usually delivered.",
        "Publish `v=DMARC1; p=none; rua=mailto:…` to collect reports, then tighten to `p=quarantine` or `p=reject` once legitimate senders pass.",
    ),
    detail(
        "DNS_DMARC_POLICY_NONE", Dns, Warning,
        "DMARC in Monitoring Mode",
        "The DMARC policy is `p=none`. Failing mail is reported but still delivered.",
        "Move the policy to `p=quarantine` and later `p=reject` after reviewing the aggregate reports.",
    ),
    detail(
        "DNS_SPF_MISSING", Dns, Warning,
        "No SPF Record",
        "No `v=spf1` TXT record lists the hosts allowed to send mail for the domain, which makes spoofing easier and hurts deliverability.",
        "Publish an SPF record naming every legitimate sender, ending in `-all` or `~all`.",
    ),
    detail(
        "DNS_SPF_POLICY_SOFTFAIL", Dns, Info,
        "SPF Ends in ~all",
        "Mail from unlisted hosts is marked as suspicious but accepted.",
        "Switch the qualifier to `-all` once the record covers every sending service.",
    ),
    detail(
        "DNS_SPF_POLICY_NEUTRAL", Dns, Info,
        "SPF Ends in ?all",
        "A neutral qualifier expresses no opinion on unlisted senders and gives no protection.",
        "Replace `?all` with `-all`, or `~all` while the sender list is being completed.",
    ),
    detail(
        "DNS_DKIM_MISSING", Dns, Info,
        "No DKIM Key Found",
        "None of the common DKIM selectors returned a public key. Without signatures, receivers cannot tell whether a message was altered or forged.",
        "Enable DKIM signing at the mail provider and publish the key under its selector.",
    ),
    detail(
        "DNS_CAA_MISSING", Dns, Info,
        "No CAA Record",
        "Any certificate authority may issue certificates for this domain.",
        "Publish a CAA record restricting issuance, for example `0 issue \"letsencrypt.org\"`.",
    ),
    // TLS
    detail(
        "SSL_HANDSHAKE_FAILED", Ssl, Critical,
        "TLS Handshake Failed",
        "No TLS session could be established on port 443. The certificate may be invalid for the host, or the server may not speak TLS at all.",
        "Install a trusted certificate for this host name and check the listener configuration.",
    ),
    detail(
        "SSL_EXPIRED", Ssl, Critical,
        "Certificate Expired",
        "The certificate's validity period has ended. Browsers block the site with a full-page warning.",
        "Renew the certificate now and automate renewal (ACME or the provider's equivalent).",
    ),
    detail(
        "SSL_NO_CERTIFICATE_FOUND", Ssl, Warning,
        "No Certificate Presented",
        "The handshake completed without a peer certificate, so clients cannot authenticate the server.",
        "Configure the listener to send a CA-issued certificate for this host name.",
    ),
    detail(
        "SSL_EXPIRING_SOON", Ssl, Warning,
        "Certificate Expires Within 30 Days",
        "The certificate is still valid but close to its end date.",
        "Renew ahead of expiry and confirm the automated renewal job is running.",
    ),
    // HTTP
    detail(
        "HEADERS_REQUEST_FAILED", Http, Critical,
        "Site Unreachable",
        "The HTTPS request to the target failed, so none of the header checks could run.",
        "Confirm the host is online and reachable from the internet, and that no firewall drops the scanner.",
    ),
    detail(
        "HEADERS_HSTS_MISSING", Http, Warning,
        "No Strict-Transport-Security",
        "Browsers are not told to stick to HTTPS, which leaves visitors open to downgrade and cookie theft on hostile networks.",
        "Send `Strict-Transport-Security: max-age=31536000; includeSubDomains`.",
    ),
    detail(
        "HEADERS_CSP_MISSING", Http, Warning,
        "No Content-Security-Policy",
        "Without a CSP the browser will load and run scripts from any origin, so an injection flaw turns directly into XSS.",
        "Define a policy listing trusted script, style and frame sources. Start strict and relax where needed.",
    ),
    detail(
        "HEADERS_X_FRAME_OPTIONS_MISSING", Http, Warning,
        "No X-Frame-Options",
        "Pages can be embedded in a frame on another site, which enables clickjacking.",
        "Send `X-Frame-Options: DENY` or `SAMEORIGIN`, or the CSP `frame-ancestors` directive.",
    ),
    detail(
        "HEADERS_X_CONTENT_TYPE_OPTIONS_MISSING", Http, Info,
        "No X-Content-Type-Options",
        "Browsers may MIME-sniff responses and execute content served with a harmless type.",
        "Send `X-Content-Type-Options: nosniff`.",
    ),
    detail(
        "HEADERS_REFERRER_POLICY_MISSING", Http, Info,
        "No Referrer-Policy",
        "Full page URLs, query strings included, may leak to third parties in the Referer header.",
        "Send `Referrer-Policy: strict-origin-when-cross-origin`.",
    ),
    detail(
        "HEADERS_PERMISSIONS_POLICY_MISSING", Http, Info,
        "No Permissions-Policy",
        "Pages and embedded frames may request camera, microphone or geolocation access.",
        "Disable unused features, e.g. `Permissions-Policy: geolocation=(), camera=(), microphone=()`.",
    ),
    detail(
        "METHODS_DANGEROUS_ALLOWED", Http, Warning,
        "Dangerous HTTP Methods Allowed",
        "The server advertises PUT, DELETE, TRACE or CONNECT. TRACE enables cross-site tracing and unauthenticated writes allow tampering.",
        "Allow only the methods the application uses, usually GET, HEAD and POST.",
    ),
    detail(
        "COOKIE_NOT_SECURE", Http, Warning,
        "Cookie Without Secure",
        "The cookie is also sent over plain HTTP, where it can be read in transit.",
        "Set the `Secure` attribute on every cookie.",
    ),
    detail(
        "COOKIE_NOT_HTTPONLY", Http, Info,
        "Cookie Without HttpOnly",
        "Scripts on the page can read the cookie, so an XSS flaw can steal session state.",
        "Set `HttpOnly` on session and authentication cookies.",
    ),
    detail(
        "URL_NO_HTTPS_REDIRECT", Http, Warning,
        "No Redirect to HTTPS",
        "Plain HTTP requests are answered without a redirect, so first visits can be intercepted or downgraded.",
        "Answer every HTTP request with a 301 or 308 to the HTTPS URL.",
    ),
    // Network
    detail(
        "PORT_RISKY_SERVICE_OPEN", Network, Critical,
        "Risky Service Exposed",
        "A service that should stay private (telnet, RDP, a database or cache) accepts connections from the internet.",
        "Close the port at the firewall or bind the service to a private interface behind a VPN or bastion.",
    ),
    detail(
        "PORT_PLAINTEXT_SERVICE_OPEN", Network, Warning,
        "Plaintext Service Exposed",
        "A protocol that sends credentials in clear text (FTP, POP3, IMAP) is reachable.",
        "Offer only the TLS variant (SFTP or FTPS, POP3S, IMAPS) and disable the plaintext one.",
    ),
];

/// Looks a finding code up. Unknown codes return `None` and are listed
/// under "Other Findings" in reports.
pub fn get_finding_detail(code: &str) -> Option<&'static FindingDetail> {
    FINDINGS.iter().find(|f| f.code == code)
}
