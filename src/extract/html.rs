// src/extract/html.rs
// =============================================================================
// This module extracts citation links from document HTML.
//
// We use the `scraper` crate which:
// - Parses HTML into a DOM (Document Object Model)
// - Supports CSS selectors for finding elements
// - Is built on html5ever (Mozilla's HTML parser)
//
// What we extract:
// - Each <li> inside an <ol class="references"> becomes one ReferenceGroup
// - Each <ref> element becomes one ReferenceGroup (raw citation markup)
// - Within a group we keep every external (http/https) link, together
//   with opaque structural ids so the associator can reason about
//   parent/sibling proximity without ever seeing the DOM
//
// Rust concepts:
// - HashMap as an interner (DOM node id -> small dense usize)
// - Iterator chains with filter_map
// - Closures capturing mutable state
// =============================================================================

use crate::associate::{RefLink, ReferenceGroup};
use scraper::{ElementRef, Html, Selector};
use std::collections::HashMap;

// Extracts all reference groups from a document.
//
// Returns one group per citation element, each holding its external links
// in document order. Groups without any external link are dropped - they
// carry nothing to check or associate.
pub fn extract_reference_groups(html: &str) -> Vec<ReferenceGroup> {
    if html.is_empty() {
        return Vec::new();
    }

    let document = Html::parse_document(html);

    // Selector::parse returns Result, so we use .unwrap() which panics on
    // error. This is OK here because our selectors are constants and known
    // to be valid.
    let list_selector = Selector::parse("ol.references > li").unwrap();
    let ref_selector = Selector::parse("ref").unwrap();
    let anchor_selector = Selector::parse("a[href]").unwrap();

    // Interner: DOM node ids are opaque handles, the associator wants
    // small comparable integers. Shared across groups so ids stay unique
    // document-wide.
    let mut interner: HashMap<ego_tree::NodeId, usize> = HashMap::new();

    let mut groups = Vec::new();

    // Each <li> in a references list is one citation
    for item in document.select(&list_selector) {
        let group = collect_group(item, &anchor_selector, &mut interner);
        if !group.links.is_empty() {
            groups.push(group);
        }
    }

    // Raw wiki markup sometimes survives as literal <ref> elements
    for item in document.select(&ref_selector) {
        let group = collect_group(item, &anchor_selector, &mut interner);
        if !group.links.is_empty() {
            groups.push(group);
        }
    }

    groups
}

// Collects the external links of one citation element into a group
fn collect_group(
    scope: ElementRef,
    anchor_selector: &Selector,
    interner: &mut HashMap<ego_tree::NodeId, usize>,
) -> ReferenceGroup {
    let mut links = Vec::new();

    for (position, anchor) in scope.select(anchor_selector).enumerate() {
        let Some(href) = anchor.value().attr("href") else {
            continue;
        };

        // Only external links are citations worth triaging; internal
        // anchors, relative paths and special schemes are navigation
        if !is_external_url(href) {
            continue;
        }

        let parent_id = anchor
            .parent()
            .map(|node| intern(interner, node.id()))
            .unwrap_or_else(|| intern(interner, scope.id()));

        let grandparent_id = anchor
            .parent()
            .and_then(|node| node.parent())
            .map(|node| intern(interner, node.id()))
            .unwrap_or_else(|| intern(interner, scope.id()));

        links.push(RefLink {
            href: href.to_string(),
            parent: parent_id,
            grandparent: grandparent_id,
            position,
        });
    }

    ReferenceGroup { links }
}

// Checks if a URL is external (starts with http or https)
fn is_external_url(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

// Maps a DOM node id onto a small dense integer, stable within one document
fn intern(interner: &mut HashMap<ego_tree::NodeId, usize>, id: ego_tree::NodeId) -> usize {
    let next = interner.len();
    *interner.entry(id).or_insert(next)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_each_list_item_is_one_group() {
        let html = r#"
            <ol class="references">
                <li><a href="https://example.com/a">A</a></li>
                <li><a href="https://example.com/b">B</a></li>
            </ol>
        "#;
        let groups = extract_reference_groups(html);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].links[0].href, "https://example.com/a");
        assert_eq!(groups[1].links[0].href, "https://example.com/b");
    }

    #[test]
    fn test_internal_links_are_skipped() {
        let html = r##"
            <ol class="references">
                <li>
                    <a href="/wiki/Internal">internal</a>
                    <a href="#cite_note-1">anchor</a>
                    <a href="https://example.com/real">real</a>
                </li>
            </ol>
        "##;
        let groups = extract_reference_groups(html);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].links.len(), 1);
        assert_eq!(groups[0].links[0].href, "https://example.com/real");
    }

    #[test]
    fn test_original_and_archive_share_parent_ids() {
        let html = r#"
            <ol class="references">
                <li><span>
                    <a href="https://example.com/story">orig</a>
                    <a href="https://web.archive.org/web/20200101000000/https://example.com/story">arch</a>
                </span></li>
            </ol>
        "#;
        let groups = extract_reference_groups(html);
        assert_eq!(groups.len(), 1);
        let links = &groups[0].links;
        assert_eq!(links.len(), 2);
        assert_eq!(links[0].parent, links[1].parent);
        assert_eq!(links[0].position, 0);
        assert_eq!(links[1].position, 1);
    }

    #[test]
    fn test_sibling_elements_share_grandparent() {
        let html = r#"
            <ol class="references">
                <li>
                    <span><a href="https://example.com/story">orig</a></span>
                    <span><a href="https://archive.ph/Xyz1">arch</a></span>
                </li>
            </ol>
        "#;
        let groups = extract_reference_groups(html);
        let links = &groups[0].links;
        assert_ne!(links[0].parent, links[1].parent);
        assert_eq!(links[0].grandparent, links[1].grandparent);
    }

    #[test]
    fn test_ref_tags_become_groups() {
        let html = r#"<ref><a href="https://example.com/cited">cited</a></ref>"#;
        let groups = extract_reference_groups(html);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].links[0].href, "https://example.com/cited");
    }

    #[test]
    fn test_empty_and_linkless_html() {
        assert!(extract_reference_groups("").is_empty());
        assert!(extract_reference_groups("<p>No references here</p>").is_empty());
        assert!(extract_reference_groups(
            r#"<ol class="references"><li>bare text</li></ol>"#
        )
        .is_empty());
    }
}
