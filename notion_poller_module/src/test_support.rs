//! In-memory document service and responder used by the unit tests.

use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use responder_module::{Responder, ResponderError};

use crate::adapters::notion::{
    AdapterError, Block, Comment, DocumentClient, PageInfo, PaginatedList, RichText,
};

pub(crate) const BOT_USER_ID: &str = "bot-user";

/// Build a comment the way the comments API returns it.
pub(crate) fn comment(
    id: &str,
    discussion_id: &str,
    created_time: &str,
    parent_block: Option<&str>,
    author_id: &str,
    text: &str,
) -> Comment {
    let parent = match parent_block {
        Some(block_id) => json!({ "type": "block_id", "block_id": block_id }),
        None => json!({ "type": "page_id", "page_id": "page" }),
    };
    serde_json::from_value(json!({
        "object": "comment",
        "id": id,
        "discussion_id": discussion_id,
        "created_time": created_time,
        "parent": parent,
        "created_by": { "object": "user", "id": author_id },
        "rich_text": [{ "type": "text", "plain_text": text, "text": { "content": text } }]
    }))
    .expect("valid comment fixture")
}

pub(crate) fn paragraph(id: &str, text: &str) -> Value {
    json!({
        "object": "block",
        "id": id,
        "type": "paragraph",
        "paragraph": { "rich_text": [{ "type": "text", "plain_text": text, "text": { "content": text } }] }
    })
}

#[derive(Default)]
struct FakeState {
    blocks: HashMap<String, Vec<Block>>,
    comments: HashMap<String, Vec<Comment>>,
    block_failures: HashMap<String, (u16, String)>,
    comment_failures: HashMap<String, (u16, String)>,
    page_titles: HashMap<String, String>,
    failing_discussions: HashSet<String>,
    posted: Vec<(String, String)>,
    list_comment_calls: Vec<String>,
    next_reply: u32,
    current_user_unavailable: bool,
}

/// Document service double with cursor pagination.
#[derive(Default)]
pub(crate) struct FakeDocumentClient {
    state: Mutex<FakeState>,
    page_size: Option<usize>,
}

impl FakeDocumentClient {
    pub(crate) fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = Some(page_size.max(1));
        self
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(|poison| poison.into_inner())
    }

    pub(crate) fn add_blocks(&self, parent_id: &str, blocks: Vec<Value>) {
        let blocks = blocks
            .into_iter()
            .map(|b| serde_json::from_value::<Block>(b).expect("valid block fixture"))
            .collect();
        self.lock().blocks.insert(parent_id.to_string(), blocks);
    }

    pub(crate) fn add_comments(&self, block_id: &str, comments: Vec<Comment>) {
        self.lock()
            .comments
            .entry(block_id.to_string())
            .or_default()
            .extend(comments);
    }

    pub(crate) fn fail_block_children(&self, block_id: &str, status: u16, code: &str) {
        self.lock()
            .block_failures
            .insert(block_id.to_string(), (status, code.to_string()));
    }

    pub(crate) fn fail_comments(&self, block_id: &str, status: u16, code: &str) {
        self.lock()
            .comment_failures
            .insert(block_id.to_string(), (status, code.to_string()));
    }

    pub(crate) fn set_page_title(&self, page_id: &str, title: &str) {
        self.lock()
            .page_titles
            .insert(page_id.to_string(), title.to_string());
    }

    pub(crate) fn fail_posts_to(&self, discussion_id: &str) {
        self.lock()
            .failing_discussions
            .insert(discussion_id.to_string());
    }

    pub(crate) fn allow_posts_to(&self, discussion_id: &str) {
        self.lock().failing_discussions.remove(discussion_id);
    }

    pub(crate) fn fail_current_user(&self) {
        self.lock().current_user_unavailable = true;
    }

    /// Replies posted so far as `(discussion_id, text)`.
    pub(crate) fn posted(&self) -> Vec<(String, String)> {
        self.lock().posted.clone()
    }

    pub(crate) fn list_comment_calls(&self) -> Vec<String> {
        self.lock().list_comment_calls.clone()
    }

    fn paginate<T: Clone>(&self, items: &[T], start_cursor: Option<&str>) -> PaginatedList<T> {
        let start = start_cursor
            .and_then(|c| c.parse::<usize>().ok())
            .unwrap_or(0);
        let size = self.page_size.unwrap_or(usize::MAX);
        let end = start.saturating_add(size).min(items.len());
        let has_more = end < items.len();
        PaginatedList {
            results: items[start.min(end)..end].to_vec(),
            has_more,
            next_cursor: has_more.then(|| end.to_string()),
        }
    }
}

fn api_error(status: u16, code: &str) -> AdapterError {
    AdapterError::Api {
        status,
        code: code.to_string(),
        message: format!("simulated {}", code),
    }
}

impl DocumentClient for FakeDocumentClient {
    fn list_block_children(
        &self,
        block_id: &str,
        start_cursor: Option<&str>,
    ) -> Result<PaginatedList<Block>, AdapterError> {
        let blocks = {
            let state = self.lock();
            if let Some((status, code)) = state.block_failures.get(block_id) {
                return Err(api_error(*status, code));
            }
            state.blocks.get(block_id).cloned().unwrap_or_default()
        };
        Ok(self.paginate(&blocks, start_cursor))
    }

    fn list_comments(
        &self,
        block_id: &str,
        start_cursor: Option<&str>,
    ) -> Result<PaginatedList<Comment>, AdapterError> {
        let comments = {
            let mut state = self.lock();
            state.list_comment_calls.push(block_id.to_string());
            if let Some((status, code)) = state.comment_failures.get(block_id) {
                return Err(api_error(*status, code));
            }
            state.comments.get(block_id).cloned().unwrap_or_default()
        };
        Ok(self.paginate(&comments, start_cursor))
    }

    fn create_comment(&self, discussion_id: &str, text: &str) -> Result<Comment, AdapterError> {
        let mut state = self.lock();
        if state.failing_discussions.contains(discussion_id) {
            return Err(AdapterError::SendError("simulated outage".to_string()));
        }
        state.next_reply += 1;
        state
            .posted
            .push((discussion_id.to_string(), text.to_string()));
        let reply_id = format!("reply-{}", state.next_reply);

        // The reply joins its discussion one minute after the newest comment.
        let thread = state.comments.iter_mut().find_map(|(_, comments)| {
            comments
                .iter()
                .filter(|c| c.discussion_id == discussion_id)
                .max_by_key(|c| c.created_time)
                .cloned()
                .map(|newest| (comments, newest))
        });
        let Some((comments, newest)) = thread else {
            return Ok(comment(
                &reply_id,
                discussion_id,
                "2030-01-01T00:00:00Z",
                None,
                BOT_USER_ID,
                text,
            ));
        };

        let mut reply = newest;
        reply.id = reply_id;
        reply.created_time += chrono::Duration::minutes(1);
        reply.created_by.id = BOT_USER_ID.to_string();
        reply.rich_text = vec![RichText {
            plain_text: text.to_string(),
            href: None,
            text: None,
        }];
        comments.push(reply.clone());
        Ok(reply)
    }

    fn get_page(&self, page_id: &str) -> Result<PageInfo, AdapterError> {
        Ok(PageInfo {
            id: page_id.to_string(),
            title: self.lock().page_titles.get(page_id).cloned(),
        })
    }

    fn current_user_id(&self) -> Result<String, AdapterError> {
        if self.lock().current_user_unavailable {
            return Err(api_error(401, "unauthorized"));
        }
        Ok(BOT_USER_ID.to_string())
    }
}

/// Responder double that records prompts and replays a fixed answer.
#[derive(Default)]
pub(crate) struct FakeResponder {
    prompts: Mutex<Vec<String>>,
    failing: std::sync::atomic::AtomicBool,
}

pub(crate) const FAKE_REPLY: &str = "Here is the clarification you asked for.";

impl FakeResponder {
    pub(crate) fn failing() -> Self {
        let responder = Self::default();
        responder.set_failing(true);
        responder
    }

    pub(crate) fn set_failing(&self, failing: bool) {
        self.failing
            .store(failing, std::sync::atomic::Ordering::SeqCst);
    }

    pub(crate) fn prompts(&self) -> Vec<String> {
        self.prompts
            .lock()
            .unwrap_or_else(|poison| poison.into_inner())
            .clone()
    }
}

impl Responder for FakeResponder {
    fn respond(&self, prompt: &str) -> Result<String, ResponderError> {
        self.prompts
            .lock()
            .unwrap_or_else(|poison| poison.into_inner())
            .push(prompt.to_string());
        if self.failing.load(std::sync::atomic::Ordering::SeqCst) {
            return Err(ResponderError::AllEndpointsFailed(vec![
                "simulated outage".to_string()
            ]));
        }
        Ok(FAKE_REPLY.to_string())
    }
}
