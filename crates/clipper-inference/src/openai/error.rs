//! Error classification for OpenAI-compatible responses.

use clipper_core::Error;

/// Error classes of a failed summarization call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenAIErrorCode {
    /// Invalid or missing credentials.
    AuthenticationError,
    /// Rate limit exceeded.
    RateLimitExceeded,
    /// Model not found or not available.
    ModelNotFound,
    /// Upstream failure.
    ServerError,
    Unknown,
}

impl OpenAIErrorCode {
    /// Classify from HTTP status and the body's error type.
    pub fn from_response(status: u16, error_type: &str) -> Self {
        match (status, error_type) {
            (401, _) | (403, _) => Self::AuthenticationError,
            (429, _) => Self::RateLimitExceeded,
            (404, _) | (_, "model_not_found") => Self::ModelNotFound,
            (500..=599, _) => Self::ServerError,
            _ => Self::Unknown,
        }
    }
}

/// Map a classified failure onto the shared error type.
///
/// Every class is an inference error: the resolver degrades to the local
/// tier regardless, and the class only shapes the log line.
pub fn to_clipper_error(code: OpenAIErrorCode, status: u16, message: &str) -> Error {
    let prefix = match code {
        OpenAIErrorCode::AuthenticationError => "Authentication failed",
        OpenAIErrorCode::RateLimitExceeded => "Rate limit exceeded",
        OpenAIErrorCode::ModelNotFound => "Model not found",
        OpenAIErrorCode::ServerError => "Server error",
        OpenAIErrorCode::Unknown => "Request rejected",
    };
    Error::Inference(format!("{} ({}): {}", prefix, status, message))
}
