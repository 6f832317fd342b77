// llm-client-rs/src/error.rs
// Error taxonomy for LLM backend calls, split by retry behavior.

use thiserror::Error;

/// Errors produced by one LLM backend invocation.
#[derive(Debug, Clone, Error)]
pub enum LlmError {
    /// 400/401/403/404 - client-side request errors that retrying cannot
    /// fix (bad credentials, unknown model, malformed request).
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// 429 - the provider is throttling us; retried with backoff.
    #[error("rate limit exceeded: {0}")]
    RateLimited(String),

    /// 500/502/503/504 - transient provider-side failures.
    #[error("server error: {0}")]
    ServerError(String),

    /// Connection failures and timeouts below the HTTP layer.
    #[error("network error: {0}")]
    Network(String),

    /// The HTTP body did not decode as a chat-completion response.
    #[error("response parse error: {0}")]
    Parse(String),

    /// A well-formed response with no choices to read content from.
    #[error("empty response: no choices returned")]
    EmptyResponse,
}

impl LlmError {
    /// Whether the retry wrapper should attempt this call again.
    /// Request errors need human intervention; everything else is
    /// plausibly transient.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, LlmError::InvalidRequest(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_invalid_request_is_terminal() {
        assert!(!LlmError::InvalidRequest("401".into()).is_retryable());
        assert!(LlmError::RateLimited("429".into()).is_retryable());
        assert!(LlmError::ServerError("503".into()).is_retryable());
        assert!(LlmError::Network("timeout".into()).is_retryable());
        assert!(LlmError::Parse("bad json".into()).is_retryable());
        assert!(LlmError::EmptyResponse.is_retryable());
    }
}
