use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One formatted run inside a rich-text array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RichText {
    /// Plain text rendering of the run
    #[serde(default)]
    pub plain_text: String,
    /// Resolved hyperlink (set for links and mentions)
    #[serde(default)]
    pub href: Option<String>,
    /// Text payload for `type = "text"` runs
    #[serde(default)]
    pub text: Option<TextContent>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextContent {
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub link: Option<RichTextLink>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RichTextLink {
    pub url: String,
}

impl RichText {
    /// Hyperlink carried by this run, preferring the resolved `href`.
    pub fn link_url(&self) -> Option<&str> {
        self.href
            .as_deref()
            .or_else(|| {
                self.text
                    .as_ref()
                    .and_then(|t| t.link.as_ref())
                    .map(|l| l.url.as_str())
            })
            .filter(|url| !url.is_empty())
    }
}

/// Concatenate the plain text of a sequence of runs.
pub fn plain_text(runs: &[RichText]) -> String {
    runs.iter().map(|run| run.plain_text.as_str()).collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthorKind {
    Person,
    Bot,
    #[default]
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommentAuthor {
    pub id: String,
    #[serde(rename = "type", default)]
    pub kind: AuthorKind,
}

/// Where a comment is anchored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CommentParent {
    PageId { page_id: String },
    BlockId { block_id: String },
}

/// A comment from the Notion comments API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: String,
    pub discussion_id: String,
    pub created_time: DateTime<Utc>,
    pub parent: CommentParent,
    #[serde(default)]
    pub rich_text: Vec<RichText>,
    pub created_by: CommentAuthor,
}

impl Comment {
    pub fn plain_text(&self) -> String {
        plain_text(&self.rich_text)
    }
}

/// Content block, decoded from Notion's `type`-keyed payload.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "RawBlock")]
pub struct Block {
    pub id: String,
    pub has_children: bool,
    pub kind: BlockKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum BlockKind {
    ChildPage { title: String },
    /// `page_id` is `None` when the link targets a database.
    LinkToPage { page_id: Option<String> },
    ChildDatabase,
    /// Any block type whose payload carries a `rich_text` array.
    Text { rich_text: Vec<RichText> },
    Unsupported,
    Other(String),
}

impl Block {
    /// Plain text of a text-bearing block; empty for every other kind.
    pub fn plain_text(&self) -> String {
        match &self.kind {
            BlockKind::Text { rich_text } => plain_text(rich_text),
            _ => String::new(),
        }
    }

    /// Whether comments can be anchored to this block.
    pub fn accepts_inline_comments(&self) -> bool {
        !matches!(
            self.kind,
            BlockKind::ChildPage { .. } | BlockKind::ChildDatabase | BlockKind::Unsupported
        )
    }
}

#[derive(Debug, Deserialize)]
struct RawBlock {
    id: String,
    #[serde(rename = "type")]
    block_type: String,
    #[serde(default)]
    has_children: bool,
    #[serde(flatten)]
    payload: Map<String, Value>,
}

impl From<RawBlock> for Block {
    fn from(raw: RawBlock) -> Self {
        let body = raw.payload.get(&raw.block_type);
        let kind = match raw.block_type.as_str() {
            "child_page" => BlockKind::ChildPage {
                title: body
                    .and_then(|b| b.get("title"))
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
            },
            "link_to_page" => BlockKind::LinkToPage {
                page_id: body
                    .filter(|b| b.get("type").and_then(Value::as_str) == Some("page_id"))
                    .and_then(|b| b.get("page_id"))
                    .and_then(Value::as_str)
                    .map(str::to_string),
            },
            "child_database" => BlockKind::ChildDatabase,
            "unsupported" => BlockKind::Unsupported,
            other => match body.and_then(|b| b.get("rich_text")) {
                Some(runs) if runs.is_array() => {
                    match serde_json::from_value::<Vec<RichText>>(runs.clone()) {
                        Ok(rich_text) => BlockKind::Text { rich_text },
                        Err(_) => BlockKind::Other(other.to_string()),
                    }
                }
                _ => BlockKind::Other(other.to_string()),
            },
        };

        Block {
            id: raw.id,
            has_children: raw.has_children,
            kind,
        }
    }
}

/// One page of a cursor-paginated list response.
#[derive(Debug, Clone, Deserialize)]
pub struct PaginatedList<T> {
    pub results: Vec<T>,
    #[serde(default)]
    pub has_more: bool,
    #[serde(default)]
    pub next_cursor: Option<String>,
}

impl<T> PaginatedList<T> {
    pub fn complete(results: Vec<T>) -> Self {
        Self {
            results,
            has_more: false,
            next_cursor: None,
        }
    }
}

/// Page metadata relevant to prompting.
#[derive(Debug, Clone, PartialEq)]
pub struct PageInfo {
    pub id: String,
    pub title: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct RawPage {
    pub id: String,
    #[serde(default)]
    pub properties: Map<String, Value>,
}

impl From<RawPage> for PageInfo {
    fn from(raw: RawPage) -> Self {
        let title = raw
            .properties
            .values()
            .find(|prop| prop.get("type").and_then(Value::as_str) == Some("title"))
            .and_then(|prop| prop.get("title"))
            .and_then(|runs| serde_json::from_value::<Vec<RichText>>(runs.clone()).ok())
            .map(|runs| plain_text(&runs).trim().to_string())
            .filter(|title| !title.is_empty());

        PageInfo { id: raw.id, title }
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct RawUser {
    pub id: String,
}
