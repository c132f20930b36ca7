// src/escalate/mod.rs
// =============================================================================
// This module defines the boundary to an OPTIONAL browser-based validator.
//
// Some links only render for a full browser engine (JavaScript challenges,
// aggressive CDNs). Driving a browser is heavyweight and environment-
// dependent, so the engine never does it itself: it exposes a trait that a
// caller MAY implement and inject. When no gateway is present, the
// HTTP-level Dead/Blocked verdicts are final.
//
// Merging rule: escalation only ever upgrades. A Dead verdict becomes
// Alive when the browser positively reached the page; Blocked when the
// browser hit bot protection; everything else (timeout, browser error,
// confirmed dead) leaves the original verdict standing.
//
// Rust concepts:
// - #[async_trait]: async methods in an object-safe trait
// - Trait objects (&dyn) as an injected strategy
// - Send + Sync bounds so the gateway can cross task boundaries
// =============================================================================

use crate::checker::{LinkStatus, ProbeResult};
use async_trait::async_trait;
use std::collections::HashMap;

// What the external validator concluded about one URL
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EscalationVerdict {
    /// The browser reached real content
    Alive,
    /// The browser confirmed the resource is gone
    Dead,
    /// The browser hit bot protection (challenge page, CAPTCHA)
    Blocked,
    /// The page never finished loading
    Timeout,
    /// The browser itself failed
    Error,
}

// One URL's escalation result, with free-form diagnostic details
// (final URL after redirects, page title, error text - whatever the
// validator wants to report)
#[derive(Debug, Clone)]
pub struct EscalationOutcome {
    pub url: String,
    pub verdict: EscalationVerdict,
    pub details: HashMap<String, String>,
}

// The injected secondary validator.
//
// Input is every URL still Dead after all local strategies, paired with
// its HTTP code. Implementations are free to validate fewer URLs than
// they were given (e.g. to cap browser time); missing URLs keep their
// original verdict.
#[async_trait]
pub trait EscalationGateway: Send + Sync {
    async fn escalate(&self, dead_links: &[(String, Option<u16>)]) -> Vec<EscalationOutcome>;
}

// Folds escalation outcomes back into the result set.
//
// Only Dead results are eligible for escalation, and only positive
// evidence changes them: Alive upgrades (with the 200 the browser saw),
// Blocked reclassifies, anything else stands.
pub fn apply_escalation(
    results: Vec<ProbeResult>,
    outcomes: &[EscalationOutcome],
) -> Vec<ProbeResult> {
    let verdicts: HashMap<&str, EscalationVerdict> = outcomes
        .iter()
        .map(|outcome| (outcome.url.as_str(), outcome.verdict))
        .collect();

    results
        .into_iter()
        .map(|result| {
            if result.status != LinkStatus::Dead {
                return result;
            }
            match verdicts.get(result.url.as_str()) {
                Some(EscalationVerdict::Alive) => ProbeResult::alive(&result.url, 200),
                Some(EscalationVerdict::Blocked) => ProbeResult {
                    url: result.url.clone(),
                    status: LinkStatus::Blocked,
                    http_code: result.http_code,
                },
                _ => result,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(url: &str, verdict: EscalationVerdict) -> EscalationOutcome {
        EscalationOutcome {
            url: url.to_string(),
            verdict,
            details: HashMap::new(),
        }
    }

    #[test]
    fn test_dead_upgrades_to_alive_on_browser_evidence() {
        let results = vec![ProbeResult::dead("https://a.com/x", 301)];
        let outcomes = vec![outcome("https://a.com/x", EscalationVerdict::Alive)];

        let merged = apply_escalation(results, &outcomes);
        assert_eq!(merged[0].status, LinkStatus::Alive);
        assert_eq!(merged[0].http_code, Some(200));
    }

    #[test]
    fn test_dead_reclassifies_to_blocked() {
        let results = vec![ProbeResult::dead("https://a.com/x", 403)];
        let outcomes = vec![outcome("https://a.com/x", EscalationVerdict::Blocked)];

        let merged = apply_escalation(results, &outcomes);
        assert_eq!(merged[0].status, LinkStatus::Blocked);
        assert_eq!(merged[0].http_code, Some(403));
    }

    #[test]
    fn test_timeout_and_error_keep_original_verdict() {
        let results = vec![
            ProbeResult::dead("https://a.com/t", 404),
            ProbeResult::dead("https://a.com/e", 500),
        ];
        let outcomes = vec![
            outcome("https://a.com/t", EscalationVerdict::Timeout),
            outcome("https://a.com/e", EscalationVerdict::Error),
        ];

        let merged = apply_escalation(results, &outcomes);
        assert_eq!(merged[0].status, LinkStatus::Dead);
        assert_eq!(merged[1].status, LinkStatus::Dead);
    }

    #[test]
    fn test_non_dead_results_are_never_touched() {
        // Even a (nonsensical) Alive escalation verdict must not alter a
        // non-Dead result - escalation only applies to Dead
        let results = vec![
            ProbeResult::alive("https://a.com/ok", 200),
            ProbeResult::blocked("https://a.com/wall", 403),
        ];
        let outcomes = vec![outcome("https://a.com/wall", EscalationVerdict::Alive)];

        let merged = apply_escalation(results, &outcomes);
        assert_eq!(merged[0].status, LinkStatus::Alive);
        assert_eq!(merged[1].status, LinkStatus::Blocked);
    }

    #[test]
    fn test_urls_missing_from_outcomes_stand() {
        let results = vec![ProbeResult::dead("https://a.com/skipped", 404)];
        let merged = apply_escalation(results, &[]);
        assert_eq!(merged[0].status, LinkStatus::Dead);
    }
}
