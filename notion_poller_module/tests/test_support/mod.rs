#![allow(dead_code)]

use serde_json::{json, Value};

pub fn start_mockito_server(test_name: &str) -> Option<mockito::ServerGuard> {
    let server = std::panic::catch_unwind(|| mockito::Server::new());
    match server {
        Ok(server) => Some(server),
        Err(_) => {
            eprintln!(
                "Skipping {test_name}; unable to start mockito server in this environment."
            );
            None
        }
    }
}

pub fn rich_text(text: &str) -> Value {
    json!([{ "type": "text", "plain_text": text, "text": { "content": text, "link": null }, "href": null }])
}

pub fn comment_json(
    id: &str,
    discussion_id: &str,
    created_time: &str,
    parent: Value,
    author_id: &str,
    text: &str,
) -> Value {
    json!({
        "object": "comment",
        "id": id,
        "discussion_id": discussion_id,
        "created_time": created_time,
        "last_edited_time": created_time,
        "parent": parent,
        "created_by": { "object": "user", "id": author_id },
        "rich_text": rich_text(text)
    })
}

pub fn page_parent(page_id: &str) -> Value {
    json!({ "type": "page_id", "page_id": page_id })
}

pub fn block_parent(block_id: &str) -> Value {
    json!({ "type": "block_id", "block_id": block_id })
}

pub fn paragraph_json(id: &str, text: &str) -> Value {
    json!({
        "object": "block",
        "id": id,
        "type": "paragraph",
        "has_children": false,
        "paragraph": { "rich_text": rich_text(text), "color": "default" }
    })
}

pub fn list_body(results: Vec<Value>, next_cursor: Option<&str>) -> String {
    json!({
        "object": "list",
        "results": results,
        "has_more": next_cursor.is_some(),
        "next_cursor": next_cursor
    })
    .to_string()
}

pub fn completion_body(content: &str) -> String {
    json!({
        "choices": [{ "message": { "role": "assistant", "content": content } }]
    })
    .to_string()
}
