// src/classify/normalize.rs
// =============================================================================
// This module normalizes URLs for comparison.
//
// Key functionality:
// - Strip scheme and leading "www." so http/https/www mirrors compare equal
// - Fold country-code TLD variants (.co.uk -> .com) onto a canonical suffix
//   so cross-region mirrors of the same site compare equal
// - Decide whether two URLs are "equivalent" for archive-association
//   purposes
//
// The equivalence predicate is intentionally permissive: merging two URLs
// that are really distinct only causes one extra probe to be skipped, while
// failing to merge causes needless re-checking. It never affects dead/alive
// verdicts.
//
// Rust concepts:
// - const tables of tuples instead of a runtime map
// - Functions returning String vs &str (owned vs borrowed)
// - Iterator chains over string slices
// =============================================================================

// Country-code / commercial TLD variants folded onto a canonical suffix.
//
// This is a tunable allow-list, not a guaranteed-correct rule: two
// genuinely distinct sites sharing a brand name across regions will
// compare equal. In this domain that only merges their archive lists,
// which is an acceptable trade for catching real mirrors.
const DOMAIN_FOLDS: &[(&str, &str)] = &[
    (".co.uk", ".com"),
    (".co.za", ".com"),
    (".co.au", ".com"),
    (".co.nz", ".com"),
    (".co.in", ".com"),
    (".co.jp", ".com"),
    (".co.kr", ".com"),
    (".co.il", ".com"),
    (".com.au", ".com"),
    (".com.br", ".com"),
    (".com.mx", ".com"),
    (".com.sg", ".com"),
    (".com.hk", ".com"),
    (".com.tw", ".com"),
    (".com.my", ".com"),
    (".com.ph", ".com"),
    (".com.vn", ".com"),
    (".com.th", ".com"),
    (".com.id", ".com"),
];

// Normalizes a URL for comparison purposes.
//
// Steps:
// 1. Lowercase everything
// 2. Strip the scheme ("https://" / "http://") - repeatedly, so the
//    result is a fixed point
// 3. Strip leading "www." labels - also repeatedly
// 4. Fold the domain suffix via DOMAIN_FOLDS
// 5. Drop any trailing slash
//
// The repeated stripping matters: it makes the function idempotent
// (normalize(normalize(x)) == normalize(x)), which callers rely on when
// they compare already-normalized strings.
pub fn normalize_for_comparison(url: &str) -> String {
    let mut s = url.trim().to_lowercase();

    // Strip scheme(s). Looping handles degenerate inputs like
    // "http://https://example.com" that sometimes appear in citations.
    loop {
        if let Some(rest) = s.strip_prefix("https://") {
            s = rest.to_string();
        } else if let Some(rest) = s.strip_prefix("http://") {
            s = rest.to_string();
        } else {
            break;
        }
    }

    // Strip leading www. labels
    while let Some(rest) = s.strip_prefix("www.") {
        s = rest.to_string();
    }

    // Fold the domain suffix onto its canonical form
    let (domain, path) = match s.split_once('/') {
        Some((d, p)) => (d.to_string(), Some(p.to_string())),
        None => (s.clone(), None),
    };

    let mut folded = domain;
    for (variant, canonical) in DOMAIN_FOLDS {
        if folded.ends_with(variant) {
            folded.truncate(folded.len() - variant.len());
            folded.push_str(canonical);
            break;
        }
    }

    let mut result = match path {
        Some(p) => format!("{}/{}", folded, p),
        None => folded,
    };

    while result.ends_with('/') {
        result.pop();
    }

    result
}

// Returns the domain part of an already-normalized URL
// (everything before the first slash)
pub fn domain_of(normalized: &str) -> &str {
    normalized.split('/').next().unwrap_or(normalized)
}

// Checks if two URLs point at the same domain, ignoring protocol,
// www-prefix and regional TLD variations
pub fn same_domain(url_a: &str, url_b: &str) -> bool {
    let a = normalize_for_comparison(url_a);
    let b = normalize_for_comparison(url_b);
    domain_of(&a) == domain_of(&b)
}

// Checks if two URLs are equivalent for association purposes.
//
// True when:
// - they are exactly equal, or
// - their normalized forms are equal, or
// - they share a normalized domain and one path contains the other
//
// Permissive by design (see the module header).
pub fn are_equivalent(url_a: &str, url_b: &str) -> bool {
    if url_a.is_empty() || url_b.is_empty() {
        return false;
    }

    if url_a == url_b {
        return true;
    }

    let a = normalize_for_comparison(url_a);
    let b = normalize_for_comparison(url_b);

    if a == b {
        return true;
    }

    if domain_of(&a) == domain_of(&b) {
        let path_a = path_of(&a);
        let path_b = path_of(&b);

        if path_a == path_b {
            return true;
        }
        if !path_a.is_empty() && !path_b.is_empty() {
            return path_a.contains(path_b) || path_b.contains(path_a);
        }
    }

    false
}

// Picks the better representative of two equivalent URLs, preferring
// https over http. Used when http and https mirrors of the same link
// appear in one document and must be folded into one checkable unit.
pub fn prefer_https<'a>(url_a: &'a str, url_b: &'a str) -> &'a str {
    let a_https = url_a.starts_with("https://");
    let b_https = url_b.starts_with("https://");

    if a_https == b_https {
        // No protocol preference either way - keep the first
        url_a
    } else if a_https {
        url_a
    } else {
        url_b
    }
}

// Path part of an already-normalized URL ("" when there is none)
fn path_of(normalized: &str) -> &str {
    match normalized.split_once('/') {
        Some((_, path)) => path,
        None => "",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_strips_scheme_and_www() {
        assert_eq!(
            normalize_for_comparison("https://www.example.com/page"),
            "example.com/page"
        );
        assert_eq!(
            normalize_for_comparison("http://example.com/page"),
            "example.com/page"
        );
    }

    #[test]
    fn test_normalize_folds_regional_tld() {
        assert_eq!(
            normalize_for_comparison("https://www.example.co.uk/news"),
            "example.com/news"
        );
        assert_eq!(
            normalize_for_comparison("http://shop.example.com.au"),
            "shop.example.com"
        );
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let inputs = [
            "https://www.example.co.uk/a/b/",
            "http://www.www.example.com",
            "HTTPS://Example.COM/Path/",
            "example.com",
        ];
        for input in inputs {
            let once = normalize_for_comparison(input);
            let twice = normalize_for_comparison(&once);
            assert_eq!(once, twice, "not idempotent for {}", input);
        }
    }

    #[test]
    fn test_equivalence_is_reflexive_and_symmetric() {
        let urls = [
            "https://example.com/page",
            "http://www.example.co.uk/page",
            "https://other.org",
        ];
        for a in urls {
            assert!(are_equivalent(a, a));
            for b in urls {
                assert_eq!(are_equivalent(a, b), are_equivalent(b, a));
            }
        }
    }

    #[test]
    fn test_http_https_mirrors_are_equivalent() {
        assert!(are_equivalent(
            "http://example.com/article",
            "https://www.example.com/article"
        ));
    }

    #[test]
    fn test_path_containment_counts_as_equivalent() {
        assert!(are_equivalent(
            "https://example.com/2020/story",
            "https://example.com/2020/story/index.html"
        ));
    }

    #[test]
    fn test_different_domains_not_equivalent() {
        assert!(!are_equivalent("https://example.com/x", "https://other.com/x"));
    }

    #[test]
    fn test_empty_never_equivalent() {
        assert!(!are_equivalent("", "https://example.com"));
        assert!(!are_equivalent("", ""));
    }

    #[test]
    fn test_prefer_https() {
        assert_eq!(
            prefer_https("http://example.com", "https://example.com"),
            "https://example.com"
        );
        assert_eq!(
            prefer_https("https://example.com", "http://example.com"),
            "https://example.com"
        );
        // No preference - first wins
        assert_eq!(
            prefer_https("http://a.com", "http://b.com"),
            "http://a.com"
        );
    }

    #[test]
    fn test_same_domain_across_regions() {
        assert!(same_domain(
            "https://www.example.co.uk/a",
            "http://example.com/b"
        ));
        assert!(!same_domain("https://example.com", "https://sample.com"));
    }
}
