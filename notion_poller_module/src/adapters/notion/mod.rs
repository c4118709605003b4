//! Notion adapter for comment discussions.
//!
//! - `DocumentClient`: the paginated list/create operations the poller needs
//! - `NotionClient`: blocking HTTP implementation against the Notion REST API
//! - `models`: typed comment, block and rich-text payloads

mod client;
mod errors;
mod models;

pub use client::{
    DocumentClient, NotionClient, MAX_PAGE_SIZE, NOTION_API_BASE_URL, NOTION_VERSION,
};
pub use errors::AdapterError;
pub use models::{
    plain_text, AuthorKind, Block, BlockKind, Comment, CommentAuthor, CommentParent, PageInfo,
    PaginatedList, RichText, RichTextLink, TextContent,
};
