//! Watch-list discovery from an index page.
//!
//! The index page is a regular page whose child pages, page links and inline
//! hyperlinks name the pages to monitor.

use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;
use tracing::{debug, info, warn};

use crate::adapters::notion::{BlockKind, DocumentClient};

static HEX_RUN: OnceLock<Regex> = OnceLock::new();
static UUID_ID: OnceLock<Regex> = OnceLock::new();

fn hex_run_regex() -> &'static Regex {
    HEX_RUN.get_or_init(|| Regex::new(r"[0-9a-fA-F]+").expect("valid hex regex"))
}

fn uuid_regex() -> &'static Regex {
    UUID_ID.get_or_init(|| {
        Regex::new(
            r"[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}",
        )
        .expect("valid uuid regex")
    })
}

/// Insertion-ordered set of page ids.
#[derive(Debug, Default)]
struct DiscoveredPages {
    order: Vec<String>,
    seen: HashSet<String>,
}

impl DiscoveredPages {
    fn push(&mut self, id: String) {
        if self.seen.insert(id.clone()) {
            self.order.push(id);
        }
    }

    fn into_vec(self) -> Vec<String> {
        self.order
    }
}

/// Format 32 hex digits as `8-4-4-4-12`, lower-cased.
pub fn hyphenate_hex_id(hex: &str) -> Option<String> {
    if hex.len() != 32 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let hex = hex.to_ascii_lowercase();
    Some(format!(
        "{}-{}-{}-{}-{}",
        &hex[0..8],
        &hex[8..12],
        &hex[12..16],
        &hex[16..20],
        &hex[20..32]
    ))
}

/// Canonical form of a configured page id: bare hex is hyphenated, anything
/// else is trimmed and lower-cased when it already looks like a UUID.
pub fn canonical_page_id(raw: &str) -> String {
    let trimmed = raw.trim();
    if let Some(id) = hyphenate_hex_id(trimmed) {
        return id;
    }
    if trimmed.len() == 36 && uuid_regex().is_match(trimmed) {
        return trimmed.to_ascii_lowercase();
    }
    trimmed.to_string()
}

/// Extract page identifiers from a hyperlink.
///
/// The query string and fragment are ignored. The last 32-digit hex run and
/// the last hyphenated UUID are tried independently, so one URL may yield
/// two ids.
pub fn extract_page_ids_from_url(url: &str) -> Vec<String> {
    let path = url
        .split(['?', '#'])
        .next()
        .unwrap_or_default();

    let mut ids = Vec::new();

    if let Some(id) = hex_run_regex()
        .find_iter(path)
        .filter(|m| m.as_str().len() == 32)
        .last()
        .and_then(|m| hyphenate_hex_id(m.as_str()))
    {
        ids.push(id);
    }

    if let Some(m) = uuid_regex().find_iter(path).last() {
        let id = m.as_str().to_ascii_lowercase();
        if !ids.contains(&id) {
            ids.push(id);
        }
    }

    ids
}

/// Walk the index page and return the pages it references, first occurrence
/// first. An unreachable or empty index page yields an empty list.
pub fn resolve_watched_pages(client: &dyn DocumentClient, index_page_id: &str) -> Vec<String> {
    let blocks = match client.list_all_block_children(index_page_id) {
        Ok(blocks) => blocks,
        Err(e) => {
            warn!("Failed to read index page {}: {}", index_page_id, e);
            return Vec::new();
        }
    };

    let mut pages = DiscoveredPages::default();
    for block in blocks {
        match block.kind {
            BlockKind::ChildPage { .. } => pages.push(block.id),
            BlockKind::LinkToPage {
                page_id: Some(page_id),
            } => pages.push(canonical_page_id(&page_id)),
            BlockKind::LinkToPage { page_id: None } | BlockKind::ChildDatabase => {}
            BlockKind::Text { rich_text } => {
                for url in rich_text.iter().filter_map(|run| run.link_url()) {
                    for id in extract_page_ids_from_url(url) {
                        pages.push(id);
                    }
                }
            }
            BlockKind::Unsupported | BlockKind::Other(_) => {}
        }
    }

    let pages = pages.into_vec();
    debug!(
        "Index page {} references {} page(s)",
        index_page_id,
        pages.len()
    );
    pages
}

/// Pages to poll this cycle: the index page's references when it has any,
/// otherwise the static list.
pub fn resolve_watch_list(
    client: &dyn DocumentClient,
    index_page: Option<&str>,
    watched_pages: &[String],
) -> Vec<String> {
    if let Some(index_page_id) = index_page {
        let discovered = resolve_watched_pages(client, index_page_id);
        if !discovered.is_empty() {
            info!(
                "Watching {} page(s) discovered from index {}",
                discovered.len(),
                index_page_id
            );
            return discovered;
        }
        info!(
            "Index page {} yielded no pages; using {} configured page(s)",
            index_page_id,
            watched_pages.len()
        );
    }

    let mut pages = DiscoveredPages::default();
    for page in watched_pages {
        pages.push(canonical_page_id(page));
    }
    pages.into_vec()
}
