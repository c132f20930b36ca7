// src/extract/mod.rs
// =============================================================================
// This module turns raw document HTML into reference groups.
//
// It sits at the boundary of the engine: the associator and the batch
// runner never touch HTML themselves, they consume the plain-value
// ReferenceGroup structures produced here.
//
// Submodules:
// - html: scraper-based extraction of citation links from saved article HTML
// =============================================================================

mod html;

// Re-export the main extraction function
pub use html::extract_reference_groups;
