// src/checker/probe.rs
// =============================================================================
// This module decides whether a single URL is alive by probing it.
//
// Key functionality:
// - Skips archive URLs entirely (a snapshot existing IS the answer)
// - Checks DNS resolution before spending a request
// - Makes an HTTP HEAD request (lightweight, no body download)
// - Falls back to GET where servers handle HEAD badly (403, 404, 3xx)
// - Detects bot-blocking so anti-bot defenses don't masquerade as dead links
//
// A probe NEVER returns an error: every network failure is folded into a
// verdict. The decision tree is sequential and unretried - retries and
// escalation live in retry.rs.
//
// Rust concepts:
// - async/await: For network I/O
// - Enums: To represent the verdict
// - let-else: Early return when a parse fails
// =============================================================================

use crate::classify::is_archive_url;
use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

// Redirect cap shared by every client this crate builds
pub(crate) const MAX_REDIRECTS: usize = 5;

// The HTTP codes that mean "redirect". A Dead verdict carrying one of
// these is the only case we treat as a plausible false positive.
pub const REDIRECT_CODES: &[u16] = &[301, 302, 303, 307, 308];

// Default User-Agent. Plenty of sites hand a bare bot UA a 403 for a page
// that is perfectly reachable, so we identify as a current browser.
pub(crate) const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

// Substrings that mark a response header line as anti-bot machinery
const BOT_HEADER_INDICATORS: &[&str] = &[
    "cloudflare",
    "captcha",
    "challenge",
    "bot",
    "automated",
    "rate limit",
    "access denied",
    "security",
    "blocked",
];

// Phrases that mark a response body as a blocking page rather than content
const BLOCKING_PHRASES: &[&str] = &[
    "access denied",
    "forbidden",
    "blocked",
    "bot detected",
    "automated access",
    "rate limit",
    "captcha",
    "challenge",
    "security check",
    "cloudflare",
    "ddos protection",
];

// Represents the verdict for one URL after probing
//
// #[derive(Serialize, Deserialize)] lets us convert to/from JSON
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkStatus {
    /// Reachable, final status < 400
    Alive,
    /// The server affirmatively reports the resource gone or errored
    Dead,
    /// The server responded, but the evidence says anti-bot defense,
    /// not genuine absence of content
    Blocked,
    /// A snapshot-service URL - skipped by design, never probed
    Archived,
    /// DNS or network failure, no server response at all
    ConnectionError,
}

// The result of probing a single URL
//
// This is an immutable value type; http_code is absent for DNS and
// connection failures where no server ever answered.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeResult {
    /// The URL that was probed
    pub url: String,
    /// The verdict
    pub status: LinkStatus,
    /// The HTTP status code behind the verdict, when there was one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_code: Option<u16>,
}

impl ProbeResult {
    pub fn alive(url: &str, code: u16) -> Self {
        Self {
            url: url.to_string(),
            status: LinkStatus::Alive,
            http_code: Some(code),
        }
    }

    pub fn dead(url: &str, code: u16) -> Self {
        Self {
            url: url.to_string(),
            status: LinkStatus::Dead,
            http_code: Some(code),
        }
    }

    pub fn blocked(url: &str, code: u16) -> Self {
        Self {
            url: url.to_string(),
            status: LinkStatus::Blocked,
            http_code: Some(code),
        }
    }

    pub fn archived(url: &str) -> Self {
        Self {
            url: url.to_string(),
            status: LinkStatus::Archived,
            http_code: None,
        }
    }

    pub fn connection_error(url: &str) -> Self {
        Self {
            url: url.to_string(),
            status: LinkStatus::ConnectionError,
            http_code: None,
        }
    }

    /// Helper to check if the verdict is Alive
    pub fn is_alive(&self) -> bool {
        matches!(self.status, LinkStatus::Alive)
    }
}

// Checks whether an HTTP code is in the redirect set
pub fn is_redirect_code(code: u16) -> bool {
    REDIRECT_CODES.contains(&code)
}

// The prober owns one connection-pooled client that is reused for every
// probe (and cheaply cloned into worker tasks - Client is just a
// reference counter internally).
#[derive(Clone)]
pub struct Prober {
    client: Client,
}

impl Prober {
    // Builds the shared client. If this fails there is no point probing
    // anything - the caller should abort the whole run rather than emit
    // misleading verdicts.
    pub fn new() -> anyhow::Result<Self> {
        let client = Client::builder()
            .user_agent(BROWSER_USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .build()?;
        Ok(Self { client })
    }

    // Probes a single URL. Sequential decision tree:
    // 1. Archive URL -> Archived, no network call
    // 2. DNS failure -> ConnectionError
    // 3. HEAD with redirects; fall back to GET for codes where HEAD lies
    // 4. HEAD network error -> GET fallback -> ConnectionError
    pub async fn probe(&self, url: &str, timeout: Duration) -> ProbeResult {
        if is_archive_url(url) {
            return ProbeResult::archived(url);
        }

        if !resolve_host(url).await {
            return ProbeResult::connection_error(url);
        }

        match self.client.head(url).timeout(timeout).send().await {
            Ok(response) => self.analyze_head_response(url, response, timeout).await,
            Err(_) => self.get_fallback(url, timeout).await,
        }
    }

    // Routes a HEAD response through the per-code rules
    async fn analyze_head_response(
        &self,
        url: &str,
        response: reqwest::Response,
        timeout: Duration,
    ) -> ProbeResult {
        let code = response.status().as_u16();

        if code < 400 {
            return ProbeResult::alive(url, code);
        }

        if code == 403 {
            return self.classify_forbidden(url, response, timeout).await;
        }

        // A final 3xx after redirect-following means the chain went
        // somewhere HEAD couldn't complete - give GET a clean shot
        if is_redirect_code(code) {
            return self.fresh_session_get(url, code, timeout).await;
        }

        // Some servers reject HEAD outright with a 404 they would never
        // give a GET
        if code == 404 {
            return self.get_double_check(url, code, timeout).await;
        }

        // Any other >= 400 is trusted as genuinely dead
        ProbeResult::dead(url, code)
    }

    // 403 handling: decide between Blocked and Dead.
    //
    // A GET gives us a body to scan for blocking evidence; if the GET
    // itself fails we fall back to the HEAD response's headers.
    // Conservative default: no evidence means Dead, never assume blocking.
    async fn classify_forbidden(
        &self,
        url: &str,
        head_response: reqwest::Response,
        timeout: Duration,
    ) -> ProbeResult {
        match self.client.get(url).timeout(timeout).send().await {
            Ok(get_response) => {
                let get_code = get_response.status().as_u16();
                let headers_blocked = headers_suggest_blocking(get_response.headers());
                let body = get_response.text().await.unwrap_or_default();

                if headers_blocked || body_suggests_blocking(&body) {
                    ProbeResult::blocked(url, 403)
                } else if get_code < 400 {
                    // The server only dislikes HEAD
                    ProbeResult::alive(url, get_code)
                } else {
                    ProbeResult::dead(url, 403)
                }
            }
            Err(_) => {
                if headers_suggest_blocking(head_response.headers()) {
                    ProbeResult::blocked(url, 403)
                } else {
                    ProbeResult::dead(url, 403)
                }
            }
        }
    }

    // 3xx handling: GET through a brand-new session with redirects
    // enabled, mirroring a clean browser visit
    async fn fresh_session_get(&self, url: &str, head_code: u16, timeout: Duration) -> ProbeResult {
        let Ok(client) = Client::builder()
            .user_agent(BROWSER_USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .build()
        else {
            return ProbeResult::dead(url, head_code);
        };

        match client.get(url).timeout(timeout).send().await {
            Ok(response) => {
                let code = response.status().as_u16();
                if code < 400 {
                    ProbeResult::alive(url, code)
                } else {
                    ProbeResult::dead(url, code)
                }
            }
            Err(_) => ProbeResult::dead(url, head_code),
        }
    }

    // 404 handling: one GET as a second opinion before trusting the HEAD
    async fn get_double_check(&self, url: &str, head_code: u16, timeout: Duration) -> ProbeResult {
        match self.client.get(url).timeout(timeout).send().await {
            Ok(response) if response.status().as_u16() < 400 => {
                ProbeResult::alive(url, response.status().as_u16())
            }
            _ => ProbeResult::dead(url, head_code),
        }
    }

    // HEAD threw a network error: GET is the fallback; if that also
    // fails there was no server response at all
    async fn get_fallback(&self, url: &str, timeout: Duration) -> ProbeResult {
        match self.client.get(url).timeout(timeout).send().await {
            Ok(response) => {
                let code = response.status().as_u16();
                if code < 400 {
                    return ProbeResult::alive(url, code);
                }
                if code == 403 {
                    let headers_blocked = headers_suggest_blocking(response.headers());
                    let body = response.text().await.unwrap_or_default();
                    if headers_blocked || body_suggests_blocking(&body) {
                        return ProbeResult::blocked(url, 403);
                    }
                    return ProbeResult::dead(url, 403);
                }
                ProbeResult::dead(url, code)
            }
            Err(_) => ProbeResult::connection_error(url),
        }
    }
}

// Checks that the URL's host resolves via DNS - the cheapest way to rule
// out a dead domain before spending a full request on it
async fn resolve_host(url: &str) -> bool {
    let Ok(parsed) = Url::parse(url) else {
        return false;
    };
    let Some(host) = parsed.host_str() else {
        return false;
    };
    let port = parsed.port_or_known_default().unwrap_or(80);

    let resolved = match tokio::net::lookup_host((host, port)).await {
        Ok(mut addrs) => addrs.next().is_some(),
        Err(_) => false,
    };
    resolved
}

// Scans response headers for anti-bot machinery.
// Each header is checked as a "name: value" line, lowercased.
pub(crate) fn headers_suggest_blocking(headers: &HeaderMap) -> bool {
    for (name, value) in headers {
        let line = format!("{}: {}", name.as_str(), value.to_str().unwrap_or("")).to_lowercase();
        if BOT_HEADER_INDICATORS
            .iter()
            .any(|indicator| line.contains(indicator))
        {
            return true;
        }
    }
    false
}

// Scans a response body for blocking-page phrases
pub(crate) fn body_suggests_blocking(body: &str) -> bool {
    let lower = body.to_lowercase();
    BLOCKING_PHRASES.iter().any(|phrase| lower.contains(phrase))
}

// The fuller browser-like header set used by the escalation ladder when a
// plain request keeps bouncing
pub(crate) fn browser_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::ACCEPT,
        HeaderValue::from_static(
            "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8",
        ),
    );
    headers.insert(
        header::ACCEPT_LANGUAGE,
        HeaderValue::from_static("en-US,en;q=0.5"),
    );
    headers.insert(
        header::ACCEPT_ENCODING,
        HeaderValue::from_static("gzip, deflate"),
    );
    headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
    headers.insert(
        header::UPGRADE_INSECURE_REQUESTS,
        HeaderValue::from_static("1"),
    );
    headers
}

#[cfg(test)]
mod tests {
    use super::super::stub::{canned, serve};
    use super::*;

    const TIMEOUT: Duration = Duration::from_secs(5);

    #[tokio::test]
    async fn test_head_200_is_alive() {
        let base = serve(vec![("/", canned("200 OK", "", "hello"))]).await;
        let prober = Prober::new().unwrap();

        let result = prober.probe(&format!("{}/", base), TIMEOUT).await;
        assert_eq!(result.status, LinkStatus::Alive);
        assert_eq!(result.http_code, Some(200));
    }

    #[tokio::test]
    async fn test_404_on_head_and_get_is_dead() {
        let base = serve(vec![("/gone", canned("404 Not Found", "", "nope"))]).await;
        let prober = Prober::new().unwrap();

        let result = prober.probe(&format!("{}/gone", base), TIMEOUT).await;
        assert_eq!(result.status, LinkStatus::Dead);
        assert_eq!(result.http_code, Some(404));
    }

    #[tokio::test]
    async fn test_cloudflare_403_with_captcha_body_is_blocked() {
        let base = serve(vec![(
            "/walled",
            canned("403 Forbidden", "Server: cloudflare\r\n", "solve this captcha"),
        )])
        .await;
        let prober = Prober::new().unwrap();

        let result = prober.probe(&format!("{}/walled", base), TIMEOUT).await;
        assert_eq!(result.status, LinkStatus::Blocked);
        assert_eq!(result.http_code, Some(403));
    }

    #[tokio::test]
    async fn test_plain_403_without_evidence_is_dead() {
        let base = serve(vec![("/nope", canned("403 Forbidden", "", "members only page"))]).await;
        let prober = Prober::new().unwrap();

        let result = prober.probe(&format!("{}/nope", base), TIMEOUT).await;
        assert_eq!(result.status, LinkStatus::Dead);
        assert_eq!(result.http_code, Some(403));
    }

    #[tokio::test]
    async fn test_redirect_chain_to_200_is_alive() {
        let base = serve(vec![
            ("/old", canned("301 Moved Permanently", "Location: /new\r\n", "")),
            ("/new", canned("200 OK", "", "made it")),
        ])
        .await;
        let prober = Prober::new().unwrap();

        let result = prober.probe(&format!("{}/old", base), TIMEOUT).await;
        assert_eq!(result.status, LinkStatus::Alive);
        assert_eq!(result.http_code, Some(200));
    }

    #[tokio::test]
    async fn test_unresolvable_host_is_connection_error() {
        let prober = Prober::new().unwrap();

        let result = prober
            .probe("https://definitely-not-a-real-host.invalid/page", TIMEOUT)
            .await;
        assert_eq!(result.status, LinkStatus::ConnectionError);
        assert_eq!(result.http_code, None);
    }

    #[tokio::test]
    async fn test_archive_url_short_circuits_without_network() {
        let prober = Prober::new().unwrap();

        // The embedded host doesn't exist; if a network call were made
        // this would come back ConnectionError instead of Archived
        let result = prober
            .probe(
                "https://web.archive.org/web/20200101000000/https://no-such-host.invalid/x",
                TIMEOUT,
            )
            .await;
        assert_eq!(result.status, LinkStatus::Archived);
        assert_eq!(result.http_code, None);
    }

    #[test]
    fn test_header_blocking_detection() {
        let mut headers = HeaderMap::new();
        headers.insert("server", HeaderValue::from_static("cloudflare"));
        assert!(headers_suggest_blocking(&headers));

        let mut clean = HeaderMap::new();
        clean.insert("server", HeaderValue::from_static("nginx/1.24"));
        assert!(!headers_suggest_blocking(&clean));
    }

    #[test]
    fn test_body_blocking_detection() {
        assert!(body_suggests_blocking("You have been RATE LIMITED."));
        assert!(body_suggests_blocking("please complete the security check"));
        assert!(!body_suggests_blocking("<html><body>An ordinary article</body></html>"));
    }

    #[test]
    fn test_redirect_code_set() {
        for code in [301, 302, 303, 307, 308] {
            assert!(is_redirect_code(code));
        }
        for code in [200, 304, 400, 404, 500] {
            assert!(!is_redirect_code(code));
        }
    }
}
