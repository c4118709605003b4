use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use super::errors::AdapterError;
use super::models::{Block, Comment, PageInfo, PaginatedList, RawPage, RawUser};

pub const NOTION_API_BASE_URL: &str = "https://api.notion.com";
pub const NOTION_VERSION: &str = "2022-06-28";
/// Largest `page_size` the list endpoints accept.
pub const MAX_PAGE_SIZE: u32 = 100;
/// Notion rejects rich-text runs longer than this many characters.
const MAX_RICH_TEXT_CHARS: usize = 2000;

/// Operations the poller needs from the document service.
pub trait DocumentClient: Send + Sync {
    /// List one page of child blocks of a page or block.
    fn list_block_children(
        &self,
        block_id: &str,
        start_cursor: Option<&str>,
    ) -> Result<PaginatedList<Block>, AdapterError>;

    /// List one page of comments anchored to a page or block.
    fn list_comments(
        &self,
        block_id: &str,
        start_cursor: Option<&str>,
    ) -> Result<PaginatedList<Comment>, AdapterError>;

    /// Post a comment into an existing discussion.
    fn create_comment(&self, discussion_id: &str, text: &str) -> Result<Comment, AdapterError>;

    fn get_page(&self, page_id: &str) -> Result<PageInfo, AdapterError>;

    /// User id the service assigns to this integration.
    fn current_user_id(&self) -> Result<String, AdapterError>;

    fn list_all_block_children(&self, block_id: &str) -> Result<Vec<Block>, AdapterError> {
        collect_all_pages(block_id, |cursor| self.list_block_children(block_id, cursor))
    }

    fn list_all_comments(&self, block_id: &str) -> Result<Vec<Comment>, AdapterError> {
        collect_all_pages(block_id, |cursor| self.list_comments(block_id, cursor))
    }
}

/// Follow `next_cursor` until the service reports no more results.
fn collect_all_pages<T, F>(resource_id: &str, mut fetch: F) -> Result<Vec<T>, AdapterError>
where
    F: FnMut(Option<&str>) -> Result<PaginatedList<T>, AdapterError>,
{
    let mut results = Vec::new();
    let mut cursor: Option<String> = None;

    loop {
        let page = fetch(cursor.as_deref())?;
        results.extend(page.results);

        match (page.has_more, page.next_cursor) {
            (true, Some(next)) => {
                if cursor.as_deref() == Some(next.as_str()) {
                    warn!(
                        "Pagination for {} returned the same cursor twice; stopping",
                        resource_id
                    );
                    break;
                }
                debug!("Fetching next page for {} (cursor {})", resource_id, next);
                cursor = Some(next);
            }
            _ => break,
        }
    }

    Ok(results)
}

/// Blocking client for the Notion REST API.
#[derive(Debug, Clone)]
pub struct NotionClient {
    client: reqwest::blocking::Client,
    token: String,
    base_url: String,
    page_size: u32,
}

impl NotionClient {
    pub fn new(token: impl Into<String>) -> Self {
        Self::with_base_url(token, NOTION_API_BASE_URL)
    }

    pub fn with_base_url(token: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::blocking::Client::new(),
            token: token.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            page_size: MAX_PAGE_SIZE,
        }
    }

    /// Override the list page size; values are clamped to `1..=MAX_PAGE_SIZE`.
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.clamp(1, MAX_PAGE_SIZE);
        self
    }

    fn paged_url(&self, base: String, start_cursor: Option<&str>) -> String {
        let separator = if base.contains('?') { '&' } else { '?' };
        let mut url = format!("{}{}page_size={}", base, separator, self.page_size);
        if let Some(cursor) = start_cursor {
            url.push_str("&start_cursor=");
            url.push_str(&urlencoding::encode(cursor));
        }
        url
    }

    fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, AdapterError> {
        let response = self
            .client
            .get(url)
            .header("Authorization", format!("Bearer {}", self.token))
            .header("Notion-Version", NOTION_VERSION)
            .send()
            .map_err(|e| AdapterError::SendError(e.to_string()))?;
        read_json(response)
    }
}

fn read_json<T: DeserializeOwned>(
    response: reqwest::blocking::Response,
) -> Result<T, AdapterError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().unwrap_or_default();
        debug!("Notion request failed: {} - {}", status, body);
        return Err(AdapterError::from_response(status.as_u16(), &body));
    }

    response
        .json()
        .map_err(|e| AdapterError::ParseError(e.to_string()))
}

/// Split reply text into runs that fit the per-run length limit.
fn rich_text_chunks(text: &str) -> Vec<serde_json::Value> {
    let chars: Vec<char> = text.chars().collect();
    if chars.is_empty() {
        return vec![serde_json::json!({ "type": "text", "text": { "content": "" } })];
    }
    chars
        .chunks(MAX_RICH_TEXT_CHARS)
        .map(|chunk| {
            let content: String = chunk.iter().collect();
            serde_json::json!({ "type": "text", "text": { "content": content } })
        })
        .collect()
}

impl DocumentClient for NotionClient {
    fn list_block_children(
        &self,
        block_id: &str,
        start_cursor: Option<&str>,
    ) -> Result<PaginatedList<Block>, AdapterError> {
        let url = self.paged_url(
            format!("{}/v1/blocks/{}/children", self.base_url, block_id),
            start_cursor,
        );
        self.get_json(&url)
    }

    fn list_comments(
        &self,
        block_id: &str,
        start_cursor: Option<&str>,
    ) -> Result<PaginatedList<Comment>, AdapterError> {
        let url = self.paged_url(
            format!(
                "{}/v1/comments?block_id={}",
                self.base_url,
                urlencoding::encode(block_id)
            ),
            start_cursor,
        );
        self.get_json(&url)
    }

    fn create_comment(&self, discussion_id: &str, text: &str) -> Result<Comment, AdapterError> {
        let payload = serde_json::json!({
            "discussion_id": discussion_id,
            "rich_text": rich_text_chunks(text),
        });

        let response = self
            .client
            .post(format!("{}/v1/comments", self.base_url))
            .header("Authorization", format!("Bearer {}", self.token))
            .header("Notion-Version", NOTION_VERSION)
            .header("Content-Type", "application/json")
            .json(&payload)
            .send()
            .map_err(|e| AdapterError::SendError(e.to_string()))?;

        let comment: Comment = read_json(response)?;
        info!(
            "Posted comment {} to discussion {}",
            comment.id, discussion_id
        );
        Ok(comment)
    }

    fn get_page(&self, page_id: &str) -> Result<PageInfo, AdapterError> {
        let raw: RawPage = self.get_json(&format!("{}/v1/pages/{}", self.base_url, page_id))?;
        Ok(raw.into())
    }

    fn current_user_id(&self) -> Result<String, AdapterError> {
        let user: RawUser = self.get_json(&format!("{}/v1/users/me", self.base_url))?;
        Ok(user.id)
    }
}
