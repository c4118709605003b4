//! Polls Notion pages for new comments and answers them with a language model.
//!
//! One poll cycle: resolve the watch list, then per page aggregate comments,
//! group them into discussions, answer the ones with a new human comment and
//! record what was handled.

pub mod adapters;
pub mod comment_aggregator;
pub mod config;
pub mod dispatcher;
pub mod index_resolver;
pub mod notion_poller;
pub mod plugin;
pub mod state_store;
pub mod thread_resolver;

#[cfg(test)]
mod test_support;

pub use notion_poller::{
    start_poller_thread, start_poller_thread_with, CycleOutcome, CycleReport, NotionPoller,
    PollerControl, PollerError,
};
pub use plugin::{NotionCommentsPlugin, PluginDescriptor};
