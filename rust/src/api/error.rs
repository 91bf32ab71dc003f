use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// Rejected locally; no request was sent.
    #[error("invalid input: {0}")]
    Validation(String),

    #[error("not signed in")]
    MissingToken,

    #[error("request failed: {0}")]
    Transport(String),

    #[error("request timed out")]
    Timeout,

    #[error("server returned {status}: {}", .message.as_deref().unwrap_or("no message"))]
    Server { status: u16, message: Option<String> },

    #[error("unexpected response body: {0}")]
    Decode(String),
}

impl ApiError {
    /// Text for a user-facing notification. Server-provided messages are
    /// shown verbatim; everything else falls back to `fallback`.
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            ApiError::Validation(msg) => msg.clone(),
            ApiError::Server {
                message: Some(msg), ..
            } => msg.clone(),
            _ => fallback.to_string(),
        }
    }

    pub(crate) fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ApiError::Timeout
        } else if err.is_decode() {
            ApiError::Decode(err.to_string())
        } else {
            ApiError::Transport(err.to_string())
        }
    }

    /// Build a server error from a non-2xx response body, picking up the
    /// backend's `error` or `message` field when present.
    pub(crate) fn from_response(status: u16, body: &str) -> Self {
        let message = serde_json::from_str::<serde_json::Value>(body)
            .ok()
            .and_then(|v| {
                ["error", "message"].iter().find_map(|field| {
                    v.get(field)
                        .and_then(|m| m.as_str())
                        .map(str::trim)
                        .filter(|m| !m.is_empty())
                        .map(ToString::to_string)
                })
            });
        ApiError::Server { status, message }
    }
}
