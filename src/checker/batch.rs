// src/checker/batch.rs
// =============================================================================
// This module fans probes out across many URLs with bounded concurrency.
//
// How a batch runs:
// 1. URLs that already have an associated archive are emitted as Archived
//    without any network traffic
// 2. The remainder is split into chunks; a chunk's results are fully
//    collected before the next chunk starts, which bounds both peak
//    outstanding requests and memory
// 3. Within a chunk, up to `concurrency` probes run at once via
//    buffer_unordered, all sharing one connection-pooled client
// 4. A panicking worker costs ConnectionError for its URL, never the batch
// 5. Still-Dead results optionally get a secondary validation pass, and
//    then an optional browser-escalation pass
//
// Cancellation stops new probes from being issued; whatever completed
// before the cancel is returned. Progress (completed / total) is readable
// at any time without touching the worker pool.
//
// Rust concepts:
// - Streams: buffer_unordered() is like Promise.all() with a concurrency cap
// - AtomicUsize: lock-free shared counters
// - tokio::spawn + JoinError: panic isolation per task
// =============================================================================

use super::probe::{LinkStatus, ProbeResult, Prober};
use super::retry::{probe_with_retry, validate_secondary};
use crate::associate::AssociationOutcome;
use crate::escalate::{apply_escalation, EscalationGateway};
use futures::stream::{self, StreamExt};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

// Tuning for one batch run. A batch carries no state beyond these knobs -
// it is created per document (or per run) and discarded with its results.
#[derive(Debug, Clone)]
pub struct BatchConfig {
    /// How many probes may be in flight at once within a chunk
    pub concurrency: usize,
    /// How many URLs per chunk (chunk boundaries are sync points)
    pub chunk_size: usize,
    /// Base per-request timeout
    pub timeout: Duration,
    /// Retry attempts for plausibly-false Dead verdicts
    pub max_retries: usize,
    /// Whether to run the secondary validation pass over Dead results
    pub secondary_validation: bool,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            concurrency: 20,
            chunk_size: 100,
            timeout: Duration::from_secs(5),
            max_retries: 1,
            secondary_validation: true,
        }
    }
}

// Observable batch progress. Workers bump `completed`; any other task can
// read both counters at will - no locks, no blocking the pool.
#[derive(Debug, Default)]
pub struct Progress {
    completed: AtomicUsize,
    total: AtomicUsize,
}

impl Progress {
    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::Relaxed)
    }

    pub fn total(&self) -> usize {
        self.total.load(Ordering::Relaxed)
    }

    fn set_total(&self, total: usize) {
        self.total.store(total, Ordering::Relaxed);
    }

    fn bump(&self) {
        self.completed.fetch_add(1, Ordering::Relaxed);
    }
}

// Runs the retry policy over a set of URLs with bounded parallelism.
//
// Results come back in completion order, not input order. Absent
// cancellation, every input URL yields exactly one result; after a
// cancel, only the already-completed portion is returned.
pub async fn run_batch(
    prober: &Prober,
    urls: Vec<String>,
    associations: &AssociationOutcome,
    config: &BatchConfig,
    cancel: &CancellationToken,
    progress: &Arc<Progress>,
    gateway: Option<&dyn EscalationGateway>,
) -> Vec<ProbeResult> {
    progress.set_total(urls.len());

    if urls.is_empty() {
        return Vec::new();
    }

    let mut results = Vec::with_capacity(urls.len());
    let mut checkable = Vec::new();

    // Anything with an archive on file is answered for free
    for url in urls {
        if associations.has_archive(&url) {
            results.push(ProbeResult::archived(&url));
            progress.bump();
        } else {
            checkable.push(url);
        }
    }

    for chunk in checkable.chunks(config.chunk_size.max(1)) {
        if cancel.is_cancelled() {
            break;
        }

        // One future per URL in the chunk; each clones the prober (cheap,
        // it's a reference-counted client underneath)
        let chunk_futures = chunk.iter().cloned().map(|url| {
            let prober = prober.clone();
            let cancel = cancel.clone();
            let progress = Arc::clone(progress);
            let timeout = config.timeout;
            let max_retries = config.max_retries;

            async move {
                // A probe that hasn't started yet is a probe we can skip
                if cancel.is_cancelled() {
                    return None;
                }

                // spawn() isolates panics: a crashing worker becomes a
                // JoinError here instead of taking down the batch
                let handle = tokio::spawn({
                    let url = url.clone();
                    async move { probe_with_retry(&prober, &url, timeout, max_retries).await }
                });

                let result = match handle.await {
                    Ok(result) => result,
                    Err(_) => ProbeResult::connection_error(&url),
                };

                progress.bump();
                Some(result)
            }
        });

        let chunk_results: Vec<Option<ProbeResult>> = stream::iter(chunk_futures)
            .buffer_unordered(config.concurrency.max(1))
            .collect()
            .await;

        results.extend(chunk_results.into_iter().flatten());
    }

    // Secondary pass: one more chance for Dead results that look like
    // false positives. Sequential on purpose - there are few of them and
    // the ladder is already request-heavy.
    if config.secondary_validation {
        let mut validated = Vec::with_capacity(results.len());
        for result in results {
            if result.status == LinkStatus::Dead && !cancel.is_cancelled() {
                let url = result.url.clone();
                validated.push(validate_secondary(&url, result, config.timeout).await);
            } else {
                validated.push(result);
            }
        }
        results = validated;
    }

    // Escalation pass: hand whatever is STILL dead to the injected
    // browser validator, if the caller provided one
    if let Some(gateway) = gateway {
        let dead: Vec<(String, Option<u16>)> = results
            .iter()
            .filter(|result| result.status == LinkStatus::Dead)
            .map(|result| (result.url.clone(), result.http_code))
            .collect();

        if !dead.is_empty() && !cancel.is_cancelled() {
            let outcomes = gateway.escalate(&dead).await;
            results = apply_escalation(results, &outcomes);
        }
    }

    results
}
