use serde::Deserialize;

/// Errors returned by the document service adapter.
#[derive(Debug, thiserror::Error)]
pub enum AdapterError {
    #[error("notion api error (HTTP {status}, {code}): {message}")]
    Api {
        status: u16,
        code: String,
        message: String,
    },
    #[error("send error: {0}")]
    SendError(String),
    #[error("parse error: {0}")]
    ParseError(String),
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    code: Option<String>,
    message: Option<String>,
}

impl AdapterError {
    /// Build an `Api` error from a non-success response body.
    pub fn from_response(status: u16, body: &str) -> Self {
        let parsed = serde_json::from_str::<ErrorBody>(body).ok();
        let code = parsed
            .as_ref()
            .and_then(|b| b.code.clone())
            .unwrap_or_else(|| "unknown".to_string());
        let message = parsed
            .and_then(|b| b.message)
            .unwrap_or_else(|| body.to_string());
        AdapterError::Api {
            status,
            code,
            message,
        }
    }

    /// The service could not find the block, or the block cannot carry comments.
    pub fn is_block_not_found(&self) -> bool {
        match self {
            AdapterError::Api { status, code, .. } => *status == 404 || code == "object_not_found",
            _ => false,
        }
    }
}
