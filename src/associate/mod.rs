// src/associate/mod.rs
// =============================================================================
// This module pairs original citation links with their archived snapshots.
//
// The unit of association is a ReferenceGroup: all the links found inside
// one citation (one footnote). Links in different references are never
// paired with each other - except through the explicitly cross-group fuzzy
// pass at the end, which only runs for originals that found nothing inside
// their own reference.
//
// Pairing strategies, per original, first hit wins:
// 1. An archive under the same immediate parent element
// 2. An archive in a sibling element (same grandparent)
// 3. An archive within a small ordinal distance in document order
// 4. An archive whose recoverable original URL is equivalent to this one
// A matched archive leaves the candidate pool so it can't be reused.
//
// Rust concepts:
// - Owned value types flowing between components (no shared DOM handles)
// - HashMap + a parallel Vec to keep deterministic output order
// - Iterator adapters (partition, position, filter_map)
// =============================================================================

use crate::classify::{
    are_equivalent, extract_original_from_archive, is_archive_url, normalize_for_comparison,
    prefer_https, similarity_score,
};
use std::collections::HashMap;

// One link as it appeared inside a reference, with just enough structural
// context to run the proximity strategies. The ids are opaque: equal ids
// mean "same element", nothing more. This keeps the associator decoupled
// from any particular HTML parser.
#[derive(Debug, Clone)]
pub struct RefLink {
    /// The href value, as found in the document
    pub href: String,
    /// Opaque id of the link's immediate parent element
    pub parent: usize,
    /// Opaque id of the parent's parent (for sibling detection)
    pub grandparent: usize,
    /// Ordinal position of this link within the reference, document order
    pub position: usize,
}

// One citation's worth of links. The group boundary is the association
// boundary.
#[derive(Debug, Clone, Default)]
pub struct ReferenceGroup {
    pub links: Vec<RefLink>,
}

// Tuning knobs for the associator. Both defaults are empirically chosen
// values carried over from the data this tool was tuned on; treat them as
// adjustable, not derived.
#[derive(Debug, Clone)]
pub struct AssociatorConfig {
    /// Minimum similarity score for the cross-group fuzzy pass
    pub fuzzy_threshold: f64,
    /// Maximum sibling distance for the ordinal-proximity strategy
    pub max_sibling_distance: usize,
}

impl Default for AssociatorConfig {
    fn default() -> Self {
        Self {
            fuzzy_threshold: 0.7,
            max_sibling_distance: 3,
        }
    }
}

// The associator's output:
// - to_check: every original that ended up with no archive (these need
//   network probing)
// - associations: every original mapped to its (possibly empty) ordered
//   archive list, for downstream reporting
#[derive(Debug, Clone, Default)]
pub struct AssociationOutcome {
    pub to_check: Vec<String>,
    pub associations: HashMap<String, Vec<String>>,
}

impl AssociationOutcome {
    /// True if the given original has at least one associated archive
    pub fn has_archive(&self, url: &str) -> bool {
        self.associations
            .get(url)
            .map(|archives| !archives.is_empty())
            .unwrap_or(false)
    }
}

// An archive that found no partner inside its own reference, waiting for
// the fuzzy pass or archive-only recovery
#[derive(Debug, Clone)]
struct StrayArchive {
    url: String,
    extracted_original: String,
}

// Associations under construction. The map holds the data; the Vec holds
// insertion order so the output (and the fuzzy pass) are deterministic.
#[derive(Default)]
struct Ledger {
    archives_by_original: HashMap<String, Vec<String>>,
    order: Vec<String>,
}

impl Ledger {
    fn entry(&mut self, original: &str) -> &mut Vec<String> {
        if !self.archives_by_original.contains_key(original) {
            self.order.push(original.to_string());
        }
        self.archives_by_original
            .entry(original.to_string())
            .or_default()
    }
}

// Associates originals with archives across all of a document's
// reference groups.
pub fn associate(groups: &[ReferenceGroup], config: &AssociatorConfig) -> AssociationOutcome {
    let mut ledger = Ledger::default();
    let mut strays: Vec<StrayArchive> = Vec::new();

    // Step 1+2: per-group partition and structural pairing
    for group in groups {
        let (originals, mut archives): (Vec<&RefLink>, Vec<&RefLink>) = group
            .links
            .iter()
            .partition(|link| !is_archive_url(&link.href));

        for original in &originals {
            match find_structural_match(original, &archives, config) {
                Some(idx) => {
                    let archive = archives.remove(idx);
                    ledger.entry(&original.href).push(archive.href.clone());
                }
                None => {
                    // Emitted with an empty archive list; may still pick
                    // one up in the fuzzy pass
                    ledger.entry(&original.href);
                }
            }
        }

        // Archives nobody claimed stay in play document-wide
        strays.extend(archives.into_iter().map(|link| StrayArchive {
            extracted_original: extract_original_from_archive(&link.href),
            url: link.href.clone(),
        }));
    }

    // Step 3: fold originals whose normalized forms collide (http vs
    // https mirrors of the same link) into a single checkable unit
    fold_normalized_collisions(&mut ledger);

    // Step 4: cross-group fuzzy pass for originals still without an
    // archive, scored against the recoverable originals of stray archives
    run_fuzzy_pass(&mut ledger, &mut strays, config);

    // Archive-only recovery: a stray whose original we can recover becomes
    // an association for that recovered URL, even though the original was
    // never cited directly
    for stray in &strays {
        if !stray.extracted_original.is_empty() {
            ledger
                .entry(&stray.extracted_original)
                .push(stray.url.clone());
        }
    }

    // to_check is every original left with an empty archive list
    let to_check: Vec<String> = ledger
        .order
        .iter()
        .filter(|url| {
            ledger
                .archives_by_original
                .get(*url)
                .map(|archives| archives.is_empty())
                .unwrap_or(false)
        })
        .cloned()
        .collect();

    AssociationOutcome {
        to_check,
        associations: ledger.archives_by_original,
    }
}

// Runs the four structural strategies in order against the remaining
// candidate archives; returns the index of the first match
fn find_structural_match(
    original: &RefLink,
    archives: &[&RefLink],
    config: &AssociatorConfig,
) -> Option<usize> {
    // Strategy 1: same immediate parent element
    if let Some(idx) = archives.iter().position(|a| a.parent == original.parent) {
        return Some(idx);
    }

    // Strategy 2: sibling elements (parents share a parent)
    if let Some(idx) = archives
        .iter()
        .position(|a| a.grandparent == original.grandparent)
    {
        return Some(idx);
    }

    // Strategy 3: close in document order
    if let Some(idx) = archives
        .iter()
        .position(|a| a.position.abs_diff(original.position) <= config.max_sibling_distance)
    {
        return Some(idx);
    }

    // Strategy 4: the archive's recoverable original matches this URL
    archives.iter().position(|a| {
        let extracted = extract_original_from_archive(&a.href);
        !extracted.is_empty() && are_equivalent(&original.href, &extracted)
    })
}

// Folds originals that normalize to the same string into one
// representative (https preferred), merging their archive lists
fn fold_normalized_collisions(ledger: &mut Ledger) {
    let mut representative: HashMap<String, String> = HashMap::new();
    let mut new_order: Vec<String> = Vec::new();
    let mut merged: HashMap<String, Vec<String>> = HashMap::new();

    for url in &ledger.order {
        let key = normalize_for_comparison(url);

        match representative.get(&key).cloned() {
            None => {
                representative.insert(key, url.clone());
                new_order.push(url.clone());
                merged.insert(
                    url.clone(),
                    ledger
                        .archives_by_original
                        .get(url)
                        .cloned()
                        .unwrap_or_default(),
                );
            }
            Some(existing) => {
                let winner = prefer_https(&existing, url).to_string();
                let mut archives = merged.remove(&existing).unwrap_or_default();
                if let Some(extra) = ledger.archives_by_original.get(url) {
                    archives.extend(extra.iter().cloned());
                }

                if winner != existing {
                    // Promote the https variant, keep its slot in order
                    if let Some(slot) = new_order.iter_mut().find(|u| **u == existing) {
                        *slot = winner.clone();
                    }
                    representative.insert(key, winner.clone());
                }
                merged.insert(winner, archives);
            }
        }
    }

    ledger.order = new_order;
    ledger.archives_by_original = merged;
}

// For each original still without an archive, takes the best-scoring
// stray archive at or above the threshold. Accepted strays leave the
// pool so they cannot be assigned twice.
fn run_fuzzy_pass(ledger: &mut Ledger, strays: &mut Vec<StrayArchive>, config: &AssociatorConfig) {
    let unmatched: Vec<String> = ledger
        .order
        .iter()
        .filter(|url| {
            ledger
                .archives_by_original
                .get(*url)
                .map(|archives| archives.is_empty())
                .unwrap_or(false)
        })
        .cloned()
        .collect();

    for original in unmatched {
        let mut best: Option<(usize, f64)> = None;

        for (idx, stray) in strays.iter().enumerate() {
            if stray.extracted_original.is_empty() {
                continue;
            }
            let score = similarity_score(&original, &stray.extracted_original);
            if score >= config.fuzzy_threshold {
                let better = match best {
                    Some((_, best_score)) => score > best_score,
                    None => true,
                };
                if better {
                    best = Some((idx, score));
                }
            }
        }

        if let Some((idx, _)) = best {
            let stray = strays.remove(idx);
            ledger.entry(&original).push(stray.url);
        }
    }
}
