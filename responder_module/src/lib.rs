pub mod responder;

pub use responder::{
    ChatEndpoint, Responder, ResponderError, RoutedResponder, DEFAULT_MAX_ATTEMPTS,
};
