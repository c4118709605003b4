//! Adapters for the external document service.
//!
//! The poller talks to the service only through the `DocumentClient` trait;
//! `NotionClient` is the HTTP implementation.

pub mod notion;

pub use notion::{
    AdapterError, Block, BlockKind, Comment, DocumentClient, NotionClient, PageInfo,
};
