//! Language-model responder used to answer document comments.
//!
//! The poller only sees the `Responder` trait: a prompt goes in, reply text
//! comes out. `RoutedResponder` is the production implementation that walks a
//! primary and an optional fallback chat-completions endpoint.

mod endpoint;
mod errors;
mod router;

pub use endpoint::ChatEndpoint;
pub use errors::ResponderError;
pub use router::{RoutedResponder, DEFAULT_MAX_ATTEMPTS};

/// Turns a prompt into reply text.
pub trait Responder: Send + Sync {
    fn respond(&self, prompt: &str) -> Result<String, ResponderError>;
}

impl<R: Responder + ?Sized> Responder for std::sync::Arc<R> {
    fn respond(&self, prompt: &str) -> Result<String, ResponderError> {
        (**self).respond(prompt)
    }
}

impl<R: Responder + ?Sized> Responder for Box<R> {
    fn respond(&self, prompt: &str) -> Result<String, ResponderError> {
        (**self).respond(prompt)
    }
}
