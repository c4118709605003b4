//! Prompt construction and reply posting.

use serde::Deserialize;
use tracing::{error, info, warn};

use responder_module::Responder;

use crate::adapters::notion::DocumentClient;

/// Posted in place of a generated answer when the responder is unavailable.
pub const APOLOGY_MESSAGE: &str = "Sorry, I couldn't put together an answer to this comment \
right now. Please try again a little later.";

/// What to do with a discussion when the responder fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponderFailurePolicy {
    /// Post the apology and treat the comment as answered.
    #[default]
    Apologize,
    /// Post nothing and leave the comment for the next cycle.
    RetryNextCycle,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// A reply was posted; carries the id of the new comment.
    Replied { reply_id: String },
    /// The reply could not be posted; the comment stays unprocessed.
    PostFailed,
    /// The responder failed and the policy defers the comment.
    Deferred,
}

/// Build the responder prompt for a comment.
pub fn build_prompt(page_title: Option<&str>, comment_text: &str, quote: Option<&str>) -> String {
    match (page_title, quote) {
        (Some(title), Some(quote)) => format!(
            "A user left an inline comment on the document \"{title}\". \
They commented on the following excerpt:\n\n\"{quote}\"\n\n\
Their comment:\n{comment_text}\n\n\
Write a reply that answers the comment, taking the excerpt into account."
        ),
        (None, Some(quote)) => format!(
            "A user left an inline comment on a document. \
They commented on the following excerpt:\n\n\"{quote}\"\n\n\
Their comment:\n{comment_text}\n\n\
Write a reply that answers the comment, taking the excerpt into account."
        ),
        (Some(title), None) => format!(
            "A user left a comment on the document \"{title}\" as a whole.\n\n\
Their comment:\n{comment_text}\n\n\
Write a reply that answers the comment."
        ),
        (None, None) => format!(
            "A user left a comment on a document as a whole.\n\n\
Their comment:\n{comment_text}\n\n\
Write a reply that answers the comment."
        ),
    }
}

/// Sends prompts to the responder and posts the answers back.
pub struct ResponseDispatcher<'a> {
    client: &'a dyn DocumentClient,
    responder: &'a dyn Responder,
    policy: ResponderFailurePolicy,
}

impl<'a> ResponseDispatcher<'a> {
    pub fn new(
        client: &'a dyn DocumentClient,
        responder: &'a dyn Responder,
        policy: ResponderFailurePolicy,
    ) -> Self {
        Self {
            client,
            responder,
            policy,
        }
    }

    /// Ask the responder for a reply. Returns `None` only when the responder
    /// failed and the policy defers the comment.
    pub fn dispatch(
        &self,
        page_title: Option<&str>,
        comment_text: &str,
        quote: Option<&str>,
    ) -> Option<String> {
        let prompt = build_prompt(page_title, comment_text, quote);
        match self.responder.respond(&prompt) {
            Ok(reply) => Some(reply),
            Err(e) => match self.policy {
                ResponderFailurePolicy::Apologize => {
                    warn!("Responder failed, posting apology instead: {}", e);
                    Some(APOLOGY_MESSAGE.to_string())
                }
                ResponderFailurePolicy::RetryNextCycle => {
                    warn!("Responder failed, deferring comment to next cycle: {}", e);
                    None
                }
            },
        }
    }

    /// Post a reply into a discussion, returning the new comment's id.
    pub fn post_reply(&self, discussion_id: &str, reply: &str) -> Option<String> {
        match self.client.create_comment(discussion_id, reply) {
            Ok(comment) => Some(comment.id),
            Err(e) => {
                error!("Failed to post reply to discussion {}: {}", discussion_id, e);
                None
            }
        }
    }

    /// Generate and post an answer for one discussion.
    pub fn answer(
        &self,
        page_title: Option<&str>,
        discussion_id: &str,
        comment_id: &str,
        comment_text: &str,
        quote: Option<&str>,
    ) -> DispatchOutcome {
        let Some(reply) = self.dispatch(page_title, comment_text, quote) else {
            return DispatchOutcome::Deferred;
        };

        match self.post_reply(discussion_id, &reply) {
            Some(reply_id) => {
                info!(
                    "Answered comment {} in discussion {} with reply {}",
                    comment_id, discussion_id, reply_id
                );
                DispatchOutcome::Replied { reply_id }
            }
            None => DispatchOutcome::PostFailed,
        }
    }
}
