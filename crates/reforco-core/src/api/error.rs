use std::fmt;

use thiserror::Error;

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

/// What went wrong with a remote call, independent of the message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchErrorKind {
    /// Could not reach the backing store at all
    Network,
    /// An attempt took longer than the policy allows
    Timeout,
    /// Missing or rejected API key
    Unauthorized,
    /// Row-level security or similar refused the request
    Forbidden,
    NotFound,
    RateLimited,
    Server,
    /// Unexpected status or a body that does not parse
    InvalidResponse,
    /// The client is not configured (no URL or key)
    Config,
}

impl fmt::Display for FetchErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            FetchErrorKind::Network => "Network error",
            FetchErrorKind::Timeout => "Request timed out",
            FetchErrorKind::Unauthorized => "Unauthorized",
            FetchErrorKind::Forbidden => "Access denied",
            FetchErrorKind::NotFound => "Resource not found",
            FetchErrorKind::RateLimited => "Rate limited",
            FetchErrorKind::Server => "Server error",
            FetchErrorKind::InvalidResponse => "Invalid response",
            FetchErrorKind::Config => "Configuration error",
        };
        f.write_str(label)
    }
}

/// A failed remote call: a kind callers can branch on plus human-readable text.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind}: {message}")]
pub struct FetchError {
    pub kind: FetchErrorKind,
    pub message: String,
}

impl FetchError {
    pub fn new(kind: FetchErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(FetchErrorKind::Network, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(FetchErrorKind::Timeout, message)
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::new(FetchErrorKind::Config, message)
    }

    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::new(FetchErrorKind::InvalidResponse, message)
    }

    /// Transient failures worth another attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.kind,
            FetchErrorKind::Network
                | FetchErrorKind::Timeout
                | FetchErrorKind::RateLimited
                | FetchErrorKind::Server
        )
    }

    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            return body.to_string();
        }
        let mut end = MAX_ERROR_BODY_LENGTH;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
    }

    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let truncated = Self::truncate_body(body);
        let kind = match status.as_u16() {
            401 => FetchErrorKind::Unauthorized,
            403 => FetchErrorKind::Forbidden,
            404 => FetchErrorKind::NotFound,
            429 => FetchErrorKind::RateLimited,
            500..=599 => FetchErrorKind::Server,
            _ => FetchErrorKind::InvalidResponse,
        };
        Self::new(kind, format!("Status {}: {}", status, truncated))
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            FetchError::timeout(e.to_string())
        } else if e.is_decode() {
            FetchError::invalid_response(e.to_string())
        } else if let Some(status) = e.status() {
            FetchError::from_status(status, &e.to_string())
        } else {
            FetchError::network(e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    #[test]
    fn test_from_status_mapping() {
        let cases = [
            (StatusCode::UNAUTHORIZED, FetchErrorKind::Unauthorized),
            (StatusCode::FORBIDDEN, FetchErrorKind::Forbidden),
            (StatusCode::NOT_FOUND, FetchErrorKind::NotFound),
            (StatusCode::TOO_MANY_REQUESTS, FetchErrorKind::RateLimited),
            (StatusCode::BAD_GATEWAY, FetchErrorKind::Server),
            (StatusCode::BAD_REQUEST, FetchErrorKind::InvalidResponse),
        ];
        for (status, kind) in cases {
            assert_eq!(FetchError::from_status(status, "").kind, kind, "status {}", status);
        }
    }

    #[test]
    fn test_retryable_kinds() {
        assert!(FetchError::network("down").is_retryable());
        assert!(FetchError::timeout("slow").is_retryable());
        assert!(FetchError::from_status(StatusCode::SERVICE_UNAVAILABLE, "").is_retryable());
        assert!(!FetchError::from_status(StatusCode::UNAUTHORIZED, "").is_retryable());
        assert!(!FetchError::config("no url").is_retryable());
    }

    #[test]
    fn test_long_body_is_truncated() {
        let body = "é".repeat(400); // 800 bytes, multi-byte chars
        let err = FetchError::from_status(StatusCode::INTERNAL_SERVER_ERROR, &body);
        assert!(err.message.contains("truncated, 800 total bytes"));
    }

    #[test]
    fn test_display_includes_kind_and_message() {
        let err = FetchError::network("connection refused");
        assert_eq!(err.to_string(), "Network error: connection refused");
    }
}
