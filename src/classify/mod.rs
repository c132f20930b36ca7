// src/classify/mod.rs
// =============================================================================
// This module contains all URL classification logic.
//
// Submodules:
// - archive: Recognizes archive/snapshot service URLs and recovers originals
// - normalize: Normalizes URLs so cross-region mirrors compare equal
// - similarity: Fuzzy similarity scoring between two URLs
//
// Everything in here is pure functions over strings - no network I/O.
// That keeps the classifier trivially testable and lets the prober and
// associator share it freely.
//
// This file (mod.rs) is the module root - it ties everything together and
// exports the public API that other parts of our application can use.
// =============================================================================

// Declare submodules (tells Rust to include these files)
mod archive;
mod normalize;
mod similarity;

// Re-export public items from submodules
// This lets users write `classify::is_archive_url()` instead of
// `classify::archive::is_archive_url()`
pub use archive::{extract_original_from_archive, is_archive_url};
pub use normalize::{are_equivalent, domain_of, normalize_for_comparison, prefer_https, same_domain};
pub use similarity::similarity_score;
