//! Groups comments into discussions and decides which ones need an answer.
//!
//! Only the most recent comment of a discussion drives the decision. Once that
//! comment is recorded as processed the discussion stays quiet until someone
//! adds a newer comment. Comments from this integration, or from any user the
//! service types as a bot, are never answered.

use std::collections::{BTreeSet, HashMap};

use crate::adapters::notion::{AuthorKind, Comment};
use crate::comment_aggregator::QuotedContext;

/// Comments sharing a discussion id, oldest first.
#[derive(Debug, Clone, PartialEq)]
pub struct DiscussionThread {
    pub discussion_id: String,
    pub comments: Vec<Comment>,
}

impl DiscussionThread {
    pub fn latest(&self) -> Option<&Comment> {
        self.comments.last()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The latest comment was written by this integration.
    SelfAuthored,
    /// The latest comment was written by another bot user.
    BotAuthored,
    /// The latest comment has no text to answer.
    EmptyText,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ThreadAction {
    Answer {
        thread: DiscussionThread,
        latest: Comment,
        text: String,
        quote: Option<QuotedContext>,
    },
    /// Record the comment as processed without replying.
    Skip {
        comment_id: String,
        reason: SkipReason,
    },
}

/// Group comments by discussion, keeping first-seen discussion order and
/// sorting each discussion by creation time (ties keep input order).
pub fn group_threads(comments: &[Comment]) -> Vec<DiscussionThread> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut threads: Vec<DiscussionThread> = Vec::new();

    for comment in comments {
        match index.get(comment.discussion_id.as_str()) {
            Some(&slot) => threads[slot].comments.push(comment.clone()),
            None => {
                index.insert(comment.discussion_id.as_str(), threads.len());
                threads.push(DiscussionThread {
                    discussion_id: comment.discussion_id.clone(),
                    comments: vec![comment.clone()],
                });
            }
        }
    }

    for thread in &mut threads {
        thread.comments.sort_by_key(|c| c.created_time);
    }

    threads
}

/// Decide what to do with every discussion on a page.
///
/// Discussions whose latest comment is already in `processed_ids` produce no
/// action.
pub fn resolve_threads(
    comments: &[Comment],
    quotes: &HashMap<String, QuotedContext>,
    processed_ids: &BTreeSet<String>,
    bot_user_id: Option<&str>,
) -> Vec<ThreadAction> {
    let mut actions = Vec::new();

    for thread in group_threads(comments) {
        let Some(latest) = thread.latest().cloned() else {
            continue;
        };

        if processed_ids.contains(&latest.id) {
            continue;
        }

        if bot_user_id.is_some_and(|bot| bot == latest.created_by.id) {
            actions.push(ThreadAction::Skip {
                comment_id: latest.id,
                reason: SkipReason::SelfAuthored,
            });
            continue;
        }

        if latest.created_by.kind == AuthorKind::Bot {
            actions.push(ThreadAction::Skip {
                comment_id: latest.id,
                reason: SkipReason::BotAuthored,
            });
            continue;
        }

        let text = latest.plain_text().trim().to_string();
        if text.is_empty() {
            actions.push(ThreadAction::Skip {
                comment_id: latest.id,
                reason: SkipReason::EmptyText,
            });
            continue;
        }

        let quote = quotes.get(&thread.discussion_id).cloned();
        actions.push(ThreadAction::Answer {
            thread,
            latest,
            text,
            quote,
        });
    }

    actions
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{comment, BOT_USER_ID};

    fn processed(ids: &[&str]) -> BTreeSet<String> {
        ids.iter().map(|id| id.to_string()).collect()
    }

    fn answered_ids(actions: &[ThreadAction]) -> Vec<&str> {
        actions
            .iter()
            .filter_map(|a| match a {
                ThreadAction::Answer { latest, .. } => Some(latest.id.as_str()),
                ThreadAction::Skip { .. } => None,
            })
            .collect()
    }

    #[test]
    fn groups_by_discussion_and_sorts_by_time() {
        let comments = vec![
            comment("c3", "d1", "2024-01-01T00:03:00Z", None, "u1", "third"),
            comment("x1", "d2", "2024-01-01T00:00:00Z", None, "u1", "other"),
            comment("c1", "d1", "2024-01-01T00:01:00Z", None, "u1", "first"),
        ];
        let threads = group_threads(&comments);
        assert_eq!(threads.len(), 2);
        assert_eq!(threads[0].discussion_id, "d1");
        let ids: Vec<_> = threads[0].comments.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["c1", "c3"]);
        assert_eq!(threads[0].latest().map(|c| c.id.as_str()), Some("c3"));
    }

    #[test]
    fn equal_timestamps_keep_input_order() {
        let comments = vec![
            comment("a", "d1", "2024-01-01T00:00:00Z", None, "u1", "a"),
            comment("b", "d1", "2024-01-01T00:00:00Z", None, "u1", "b"),
        ];
        let threads = group_threads(&comments);
        assert_eq!(threads[0].latest().map(|c| c.id.as_str()), Some("b"));
    }

    #[test]
    fn only_the_newer_comment_triggers_an_answer() {
        let comments = vec![
            comment("c1", "d1", "2024-01-01T00:00:00Z", None, "u1", "first question"),
            comment("r1", "d1", "2024-01-01T00:01:00Z", None, BOT_USER_ID, "answer"),
            comment("c2", "d1", "2024-01-01T00:02:00Z", None, "u1", "follow-up"),
        ];
        let actions = resolve_threads(
            &comments,
            &HashMap::new(),
            &processed(&["c1", "r1"]),
            Some(BOT_USER_ID),
        );
        assert_eq!(answered_ids(&actions), vec!["c2"]);
        match &actions[0] {
            ThreadAction::Answer { text, thread, .. } => {
                assert_eq!(text, "follow-up");
                assert_eq!(thread.comments.len(), 3);
            }
            other => panic!("unexpected action {:?}", other),
        }
    }

    #[test]
    fn processed_latest_produces_nothing() {
        let comments = vec![comment("c1", "d1", "2024-01-01T00:00:00Z", None, "u1", "q")];
        let actions = resolve_threads(&comments, &HashMap::new(), &processed(&["c1"]), None);
        assert!(actions.is_empty());
    }

    #[test]
    fn self_authored_latest_is_skipped() {
        let comments = vec![
            comment("c1", "d1", "2024-01-01T00:00:00Z", None, "u1", "q"),
            comment("r1", "d1", "2024-01-01T00:01:00Z", None, BOT_USER_ID, "a"),
        ];
        let actions = resolve_threads(&comments, &HashMap::new(), &processed(&[]), Some(BOT_USER_ID));
        assert_eq!(
            actions,
            vec![ThreadAction::Skip {
                comment_id: "r1".to_string(),
                reason: SkipReason::SelfAuthored,
            }]
        );
    }

    #[test]
    fn bot_typed_author_is_skipped_without_bot_id() {
        let mut latest = comment("r1", "d1", "2024-01-01T00:01:00Z", None, "other-bot", "Done");
        latest.created_by.kind = AuthorKind::Bot;
        let comments = vec![
            comment("c1", "d1", "2024-01-01T00:00:00Z", None, "u1", "q"),
            latest,
        ];
        let actions = resolve_threads(&comments, &HashMap::new(), &processed(&[]), None);
        assert_eq!(
            actions,
            vec![ThreadAction::Skip {
                comment_id: "r1".to_string(),
                reason: SkipReason::BotAuthored,
            }]
        );
    }

    #[test]
    fn blank_latest_is_skipped() {
        let comments = vec![comment("c1", "d1", "2024-01-01T00:00:00Z", None, "u1", "   ")];
        let actions = resolve_threads(&comments, &HashMap::new(), &processed(&[]), None);
        assert_eq!(
            actions,
            vec![ThreadAction::Skip {
                comment_id: "c1".to_string(),
                reason: SkipReason::EmptyText,
            }]
        );
    }

    #[test]
    fn answer_carries_the_discussion_quote() {
        let comments = vec![comment("c1", "d1", "2024-01-01T00:00:00Z", Some("b1"), "u1", " Why? ")];
        let mut quotes = HashMap::new();
        quotes.insert(
            "d1".to_string(),
            QuotedContext {
                block_id: "b1".to_string(),
                text: "Revenue grew 12%".to_string(),
            },
        );
        let actions = resolve_threads(&comments, &quotes, &processed(&[]), None);
        match &actions[0] {
            ThreadAction::Answer { text, quote, .. } => {
                assert_eq!(text, "Why?");
                assert_eq!(quote.as_ref().map(|q| q.text.as_str()), Some("Revenue grew 12%"));
            }
            other => panic!("unexpected action {:?}", other),
        }
    }

    #[test]
    fn without_bot_id_a_bot_comment_is_answerable() {
        let comments = vec![comment("r1", "d1", "2024-01-01T00:00:00Z", None, BOT_USER_ID, "a")];
        let actions = resolve_threads(&comments, &HashMap::new(), &processed(&[]), None);
        assert_eq!(answered_ids(&actions), vec!["r1"]);
    }
}
