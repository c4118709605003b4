use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error};

use super::errors::ResponderError;

const SYSTEM_PROMPT: &str = "You are a helpful assistant replying to comments left on shared \
documents. Answer the comment directly and concisely in plain text without markdown.";

const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// One OpenAI-compatible chat-completions endpoint.
#[derive(Debug, Clone)]
pub struct ChatEndpoint {
    /// Label used in logs ("primary", "fallback")
    pub name: String,
    /// Full URL of the chat-completions route
    pub endpoint: String,
    pub model: String,
    pub api_key: Option<String>,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: Option<ChatChoiceMessage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

impl ChatEndpoint {
    pub fn new(
        name: impl Into<String>,
        endpoint: impl Into<String>,
        model: impl Into<String>,
        api_key: Option<String>,
    ) -> Self {
        Self {
            name: name.into(),
            endpoint: endpoint.into(),
            model: model.into(),
            api_key,
        }
    }

    /// Send a single completion request and return the first choice's text.
    pub fn complete(&self, prompt: &str) -> Result<String, ResponderError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .map_err(|e| self.http_error(e))?;

        let payload = ChatCompletionRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
        };

        let mut request = client
            .post(&self.endpoint)
            .header("Content-Type", "application/json")
            .json(&payload);
        if let Some(key) = self.api_key.as_deref() {
            request = request.header("Authorization", format!("Bearer {}", key));
        }

        debug!("requesting completion from {} ({})", self.name, self.model);
        let response = request.send().map_err(|e| self.http_error(e))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().unwrap_or_default();
            error!(
                "Responder {} failed: {} - {}",
                self.name, status, body
            );
            return Err(ResponderError::Status {
                endpoint: self.name.clone(),
                status: status.as_u16(),
                body,
            });
        }

        let completion: ChatCompletionResponse =
            response.json().map_err(|e| ResponderError::Parse {
                endpoint: self.name.clone(),
                message: e.to_string(),
            })?;

        completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message)
            .and_then(|message| message.content)
            .map(|content| content.trim().to_string())
            .filter(|content| !content.is_empty())
            .ok_or_else(|| ResponderError::EmptyCompletion(self.name.clone()))
    }

    fn http_error(&self, err: reqwest::Error) -> ResponderError {
        ResponderError::Http {
            endpoint: self.name.clone(),
            message: err.to_string(),
        }
    }
}
