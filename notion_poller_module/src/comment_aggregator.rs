//! Collects page-level and inline comments for one page.

use std::collections::HashMap;
use tracing::{debug, warn};

use crate::adapters::notion::{AdapterError, Comment, DocumentClient};

/// Plain text of the block an inline discussion is anchored to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuotedContext {
    pub block_id: String,
    pub text: String,
}

/// A comment together with the passage it was left on, if any.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregatedComment {
    pub comment: Comment,
    pub quote: Option<QuotedContext>,
}

/// Gather every comment on a page: page-level discussions first, then the
/// inline discussions of each block in document order.
///
/// Failing to list the page's own comments or its blocks is an error for the
/// whole page. A failure on a single block is logged and that block skipped.
pub fn aggregate_comments(
    client: &dyn DocumentClient,
    page_id: &str,
) -> Result<Vec<AggregatedComment>, AdapterError> {
    let mut aggregated: Vec<AggregatedComment> = client
        .list_all_comments(page_id)?
        .into_iter()
        .map(|comment| AggregatedComment {
            comment,
            quote: None,
        })
        .collect();

    let blocks = client.list_all_block_children(page_id)?;
    debug!(
        "Page {} has {} page-level comment(s) and {} block(s)",
        page_id,
        aggregated.len(),
        blocks.len()
    );

    for block in blocks.iter().filter(|b| b.accepts_inline_comments()) {
        let comments = match client.list_all_comments(&block.id) {
            Ok(comments) => comments,
            Err(e) if e.is_block_not_found() => {
                debug!("Block {} on page {} has no comments", block.id, page_id);
                continue;
            }
            Err(e) => {
                warn!(
                    "Failed to list comments for block {} on page {}: {}",
                    block.id, page_id, e
                );
                continue;
            }
        };

        if comments.is_empty() {
            continue;
        }

        let text = block.plain_text();
        let quote = (!text.trim().is_empty()).then(|| QuotedContext {
            block_id: block.id.clone(),
            text,
        });

        aggregated.extend(comments.into_iter().map(|comment| AggregatedComment {
            comment,
            quote: quote.clone(),
        }));
    }

    Ok(aggregated)
}

/// Map each discussion to the passage its comments quote; the first quote
/// seen for a discussion wins.
pub fn quote_map(comments: &[AggregatedComment]) -> HashMap<String, QuotedContext> {
    let mut quotes = HashMap::new();
    for item in comments {
        if let Some(quote) = &item.quote {
            quotes
                .entry(item.comment.discussion_id.clone())
                .or_insert_with(|| quote.clone());
        }
    }
    quotes
}
