#[derive(Debug, thiserror::Error)]
pub enum ResponderError {
    #[error("http error calling {endpoint}: {message}")]
    Http { endpoint: String, message: String },
    #[error("{endpoint} returned HTTP {status}: {body}")]
    Status {
        endpoint: String,
        status: u16,
        body: String,
    },
    #[error("failed to parse response from {endpoint}: {message}")]
    Parse { endpoint: String, message: String },
    #[error("{0} returned an empty completion")]
    EmptyCompletion(String),
    #[error("no responder endpoints configured")]
    NoEndpoints,
    #[error("all responder endpoints failed: {}", .0.join("; "))]
    AllEndpointsFailed(Vec<String>),
}
