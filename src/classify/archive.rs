// src/classify/archive.rs
// =============================================================================
// This module recognizes archive/snapshot service URLs.
//
// Key functionality:
// - Decide whether a URL points at a known snapshot service
// - Recover the original URL that a snapshot preserves, when the service
//   encodes it in the path (wayback-style services do, archive.today mostly
//   doesn't)
//
// Why this matters:
// - Archive links should never be probed over the network - a snapshot
//   existing IS the answer
// - A recovered original lets us pair an archive with the citation link
//   it supersedes
//
// Rust concepts:
// - &'static str slices: A fixed table compiled into the binary
// - Option<T> and the ? operator inside helper functions
// - String slicing with find/split_once instead of a regex dependency
// =============================================================================

use url::Url;

// Known snapshot-service domains.
//
// Matching is a substring check against the URL's *host* (not its path),
// so "https://example.com/archive.org-mirror" is not an archive link but
// "https://web.archive.org/web/..." is.
//
// This is a tunable allow-list: add entries here when a new snapshot
// service shows up in citations.
const ARCHIVE_DOMAINS: &[&str] = &[
    "web.archive.org",
    "archive.today",
    "archive.org",
    "archive.is",
    "archive.fo",
    "archive.md",
    "archive.ph",
    "archive.li",
    "archive.vn",
    "webcitation.org",
    "wayback.archive.org",
    "ghostarchive.org",
];

// Checks if a URL belongs to a known snapshot service
//
// We parse the URL properly when we can and match against the host.
// For schemeless strings (extracted originals often lack a scheme) we
// fall back to matching against everything before the first slash.
pub fn is_archive_url(url: &str) -> bool {
    let host_part = match Url::parse(url) {
        Ok(parsed) => match parsed.host_str() {
            Some(host) => host.to_string(),
            None => return false,
        },
        Err(_) => {
            // Schemeless input: the host is whatever comes before the
            // first slash
            url.split('/').next().unwrap_or("").to_string()
        }
    };

    let host_lower = host_part.to_lowercase();
    ARCHIVE_DOMAINS
        .iter()
        .any(|domain| host_lower.contains(domain))
}

// Recovers the original URL that an archive snapshot preserves.
//
// Returns an empty string when the service encodes the original opaquely
// (the caller treats "" as "cannot recover automatically").
//
// Patterns handled:
//   web.archive.org / wayback.archive.org: /web/<timestamp>/<original>
//   ghostarchive.org:                      /archive/<timestamp>/<original>
//   webcitation.org:                       /<snapshot-id>/<original>
//   archive.today / archive.is / archive.fo: best-effort path sniffing
//   archive.md / archive.ph / archive.li / archive.vn: opaque, always ""
pub fn extract_original_from_archive(archive_url: &str) -> String {
    if archive_url.contains("web.archive.org") || archive_url.contains("wayback.archive.org") {
        return extract_after_timestamp(archive_url, "/web/");
    }

    if archive_url.contains("ghostarchive.org") {
        return extract_after_timestamp(archive_url, "/archive/");
    }

    if archive_url.contains("webcitation.org") {
        // Pattern: https://webcitation.org/QUERY_ID/ORIGINAL_URL
        // The snapshot id is a single path segment, anything after it is
        // the original
        if let Some(rest) = path_after_host(archive_url) {
            if let Some((_id, original)) = rest.split_once('/') {
                if !original.is_empty() {
                    return original.to_string();
                }
            }
        }
        return String::new();
    }

    if archive_url.contains("archive.today")
        || archive_url.contains("archive.is")
        || archive_url.contains("archive.fo")
    {
        // These services usually use opaque short codes, but some older
        // links embed the original URL directly in the path. Accept the
        // path only when it at least looks like a hostname.
        if let Some(rest) = path_after_host(archive_url) {
            if !rest.is_empty() && rest.contains('.') {
                return rest.to_string();
            }
        }
        return String::new();
    }

    // archive.md, archive.ph, archive.li, archive.vn and anything else:
    // opaque snapshot ids, nothing to recover
    String::new()
}

// Extracts the original URL that follows "<marker><digits>/" in the path.
//
// Example: extract_after_timestamp(
//     "https://web.archive.org/web/20210101000000/https://example.com/x",
//     "/web/")
//   -> "https://example.com/x"
fn extract_after_timestamp(url: &str, marker: &str) -> String {
    let Some(idx) = url.find(marker) else {
        return String::new();
    };
    let rest = &url[idx + marker.len()..];

    let Some((timestamp, original)) = rest.split_once('/') else {
        return String::new();
    };

    // The segment between the marker and the original must be a numeric
    // timestamp - otherwise this is some other page on the archive site
    if timestamp.is_empty() || !timestamp.chars().all(|c| c.is_ascii_digit()) {
        return String::new();
    }

    if original.is_empty() {
        return String::new();
    }

    original.to_string()
}

// Returns the path portion after "scheme://host/", without a leading slash
fn path_after_host(url: &str) -> Option<&str> {
    let after_scheme = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))?;
    let (_host, path) = after_scheme.split_once('/')?;
    Some(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wayback_is_archive() {
        assert!(is_archive_url(
            "https://web.archive.org/web/20200101000000/https://example.com"
        ));
        assert!(is_archive_url("https://ghostarchive.org/archive/abc"));
        assert!(is_archive_url("https://archive.ph/Xyz1"));
    }

    #[test]
    fn test_plain_url_is_not_archive() {
        assert!(!is_archive_url("https://example.com/article"));
        assert!(!is_archive_url("https://news.bbc.co.uk/story"));
    }

    #[test]
    fn test_archive_domain_in_path_does_not_count() {
        // The table matches hosts, not paths
        assert!(!is_archive_url("https://example.com/web.archive.org/fake"));
    }

    #[test]
    fn test_extract_from_wayback() {
        let url = "https://web.archive.org/web/20210615000000/https://example.com/page";
        assert_eq!(
            extract_original_from_archive(url),
            "https://example.com/page"
        );
    }

    #[test]
    fn test_extract_from_wayback_http_scheme() {
        let url = "http://web.archive.org/web/20090101/http://old-site.com/";
        assert_eq!(extract_original_from_archive(url), "http://old-site.com/");
    }

    #[test]
    fn test_extract_from_ghostarchive() {
        let url = "https://ghostarchive.org/archive/20220301/https://example.org/story";
        assert_eq!(
            extract_original_from_archive(url),
            "https://example.org/story"
        );
    }

    #[test]
    fn test_extract_from_webcitation() {
        let url = "https://webcitation.org/5eWaHRbn4/http://example.com/cited";
        assert_eq!(
            extract_original_from_archive(url),
            "http://example.com/cited"
        );
    }

    #[test]
    fn test_extract_from_archive_today_with_embedded_url() {
        let url = "https://archive.today/https://example.com/page";
        assert_eq!(
            extract_original_from_archive(url),
            "https://example.com/page"
        );
    }

    #[test]
    fn test_opaque_archive_returns_empty() {
        // Short-code snapshots encode nothing recoverable
        assert_eq!(extract_original_from_archive("https://archive.ph/Xyz1"), "");
        assert_eq!(extract_original_from_archive("https://archive.md/abcd"), "");
    }

    #[test]
    fn test_non_numeric_timestamp_returns_empty() {
        let url = "https://web.archive.org/web/about/https://example.com";
        assert_eq!(extract_original_from_archive(url), "");
    }
}
