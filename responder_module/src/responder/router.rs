use std::time::Duration;
use tracing::{info, warn};

use super::endpoint::ChatEndpoint;
use super::errors::ResponderError;
use super::Responder;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 2;
const RETRY_BACKOFF_MS: u64 = 500;

/// Responder that tries its endpoints in order until one answers.
#[derive(Debug, Clone)]
pub struct RoutedResponder {
    endpoints: Vec<ChatEndpoint>,
    max_attempts: u32,
    backoff: Duration,
}

impl RoutedResponder {
    /// Build the routing order from a primary and an optional fallback.
    ///
    /// With `prefer_primary` the primary is attempted first; otherwise the
    /// fallback leads and the primary is the last resort.
    pub fn new(
        primary: Option<ChatEndpoint>,
        fallback: Option<ChatEndpoint>,
        prefer_primary: bool,
    ) -> Self {
        let endpoints = if prefer_primary {
            primary.into_iter().chain(fallback).collect()
        } else {
            fallback.into_iter().chain(primary).collect()
        };
        Self {
            endpoints,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff: Duration::from_millis(RETRY_BACKOFF_MS),
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn endpoints(&self) -> &[ChatEndpoint] {
        &self.endpoints
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }
}

impl Responder for RoutedResponder {
    fn respond(&self, prompt: &str) -> Result<String, ResponderError> {
        if self.endpoints.is_empty() {
            return Err(ResponderError::NoEndpoints);
        }

        let mut failures = Vec::new();
        for endpoint in &self.endpoints {
            for attempt in 1..=self.max_attempts {
                match endpoint.complete(prompt) {
                    Ok(text) => {
                        info!(
                            "Responder {} answered on attempt {} ({} chars)",
                            endpoint.name,
                            attempt,
                            text.len()
                        );
                        return Ok(text);
                    }
                    Err(e) => {
                        warn!(
                            "Responder {} attempt {}/{} failed: {}",
                            endpoint.name, attempt, self.max_attempts, e
                        );
                        failures.push(e.to_string());
                        if attempt < self.max_attempts {
                            std::thread::sleep(self.backoff * attempt);
                        }
                    }
                }
            }
        }

        Err(ResponderError::AllEndpointsFailed(failures))
    }
}
