// src/classify/similarity.rs
// =============================================================================
// This module scores how similar two URLs are, on a 0.0..=1.0 scale.
//
// The score is a weighted combination:
// - 70% domain similarity (exact = 1.0, suffix containment = 0.9,
//   otherwise character-level Jaccard)
// - 30% path similarity (exact = 1.0, containment = 0.8,
//   otherwise character-level Jaccard)
//
// The associator only consults this when exact/normalized/structural
// matching has already failed, so the fallback tiers can afford to be
// rough: they just need to rank candidates sensibly.
//
// Rust concepts:
// - HashSet<char> for set arithmetic over strings
// - f64 arithmetic and const weights
// =============================================================================

use super::normalize::{domain_of, normalize_for_comparison};
use std::collections::HashSet;

const DOMAIN_WEIGHT: f64 = 0.7;
const PATH_WEIGHT: f64 = 0.3;

// Scores the similarity of two URLs in [0.0, 1.0].
//
// Identical non-empty inputs always score 1.0; anything involving an
// empty string scores 0.0.
pub fn similarity_score(url_a: &str, url_b: &str) -> f64 {
    if url_a.is_empty() || url_b.is_empty() {
        return 0.0;
    }

    let a = normalize_for_comparison(url_a);
    let b = normalize_for_comparison(url_b);

    let domain_score = domain_similarity(domain_of(&a), domain_of(&b));
    let path_score = path_similarity(path_of(&a), path_of(&b));

    DOMAIN_WEIGHT * domain_score + PATH_WEIGHT * path_score
}

// Domain tier: exact match, then suffix containment (so "news.example.com"
// vs "example.com" still scores high), then character Jaccard
fn domain_similarity(a: &str, b: &str) -> f64 {
    if a == b {
        1.0
    } else if a.ends_with(b) || b.ends_with(a) {
        0.9
    } else {
        char_jaccard(a, b)
    }
}

// Path tier: exact match (two empty paths are an exact match), then
// substring containment, then character Jaccard
fn path_similarity(a: &str, b: &str) -> f64 {
    if a == b {
        1.0
    } else if !a.is_empty() && !b.is_empty() && (a.contains(b) || b.contains(a)) {
        0.8
    } else {
        char_jaccard(a, b)
    }
}

// Jaccard index over the sets of characters in each string.
// Crude, but cheap and symmetric - exactly what a last-resort
// tiebreaker needs.
fn char_jaccard(a: &str, b: &str) -> f64 {
    let set_a: HashSet<char> = a.chars().collect();
    let set_b: HashSet<char> = b.chars().collect();

    if set_a.is_empty() && set_b.is_empty() {
        return 1.0;
    }

    let intersection = set_a.intersection(&set_b).count();
    let union = set_a.union(&set_b).count();

    intersection as f64 / union as f64
}

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
    fn test_identical_urls_score_one() {
        let urls = [
            "https://example.com/page",
            "http://a.org",
            "https://www.example.co.uk/x/y",
        ];
        for url in urls {
            let score = similarity_score(url, url);
            assert!((score - 1.0).abs() < f64::EPSILON, "score for {} was {}", url, score);
        }
    }

    #[test]
    fn test_empty_scores_zero() {
        assert_eq!(similarity_score("", "https://example.com"), 0.0);
        assert_eq!(similarity_score("https://example.com", ""), 0.0);
    }

    #[test]
    fn test_same_domain_different_path_scores_at_least_domain_weight() {
        let score = similarity_score("https://example.com/a", "https://example.com/b");
        assert!(score >= DOMAIN_WEIGHT);
        assert!(score < 1.0);
    }

    #[test]
    fn test_subdomain_scores_high() {
        let score = similarity_score("https://news.example.com/x", "https://example.com/x");
        // 0.9 domain tier + exact path
        assert!((score - (0.9 * DOMAIN_WEIGHT + PATH_WEIGHT)).abs() < 1e-9);
    }

    #[test]
    fn test_path_containment_tier() {
        let score = similarity_score(
            "https://example.com/2020/story",
            "https://example.com/2020/story/amp",
        );
        assert!((score - (DOMAIN_WEIGHT + 0.8 * PATH_WEIGHT)).abs() < 1e-9);
    }

    #[test]
    fn test_unrelated_urls_score_low() {
        let score = similarity_score("https://abc.de/xyz", "https://nop.qr/stuvw");
        assert!(score < 0.7);
    }

    #[test]
    fn test_score_is_symmetric() {
        let a = "https://example.com/some/long/path";
        let b = "https://sample.org/other";
        assert!((similarity_score(a, b) - similarity_score(b, a)).abs() < f64::EPSILON);
    }
}
