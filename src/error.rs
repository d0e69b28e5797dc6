//! Error types
//!
//! Every public operation returns either a decoded result or exactly one
//! [`Error`]. Retries are the only local recovery; everything else surfaces
//! to the caller.

use reqwest::StatusCode;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Classification of network-level failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    /// Connection could not be established; the request never left the client
    Connect,
    /// The attempt timed out after the request may have been sent
    Timeout,
    /// Reading the response body failed
    Body,
    Other,
}

/// Network-level failure of a single attempt
#[derive(Debug, Error)]
#[error("{kind:?} error: {source}")]
pub struct TransportError {
    pub kind: TransportErrorKind,
    #[source]
    pub source: Box<dyn std::error::Error + Send + Sync>,
}

impl TransportError {
    pub fn new(
        kind: TransportErrorKind,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self {
            kind,
            source: source.into(),
        }
    }

    /// True when the server cannot have observed the request
    pub fn is_connect(&self) -> bool {
        self.kind == TransportErrorKind::Connect
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        let kind = if err.is_connect() {
            TransportErrorKind::Connect
        } else if err.is_timeout() {
            TransportErrorKind::Timeout
        } else if err.is_body() || err.is_decode() {
            TransportErrorKind::Body
        } else {
            TransportErrorKind::Other
        };
        Self::new(kind, err)
    }
}

/// One entry of the `response.errors` list
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ApiErrorItem {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub field: Option<String>,
}

/// Structured error decoded from a non-2xx response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    pub status: StatusCode,
    pub request_id: Option<String>,
    pub message: String,
    pub errors: Vec<ApiErrorItem>,
    /// Parsed `Retry-After` header, if the server sent one
    pub retry_after: Option<Duration>,
}

impl ApiError {
    /// First provider error code, if any
    pub fn code(&self) -> Option<&str> {
        self.errors.first().map(|e| e.code.as_str())
    }

    pub fn has_code(&self, code: &str) -> bool {
        self.errors.iter().any(|e| e.code == code)
    }

    /// 429 and 5xx
    pub fn is_transient(&self) -> bool {
        self.status == StatusCode::TOO_MANY_REQUESTS || self.status.is_server_error()
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.status)?;
        if let Some(item) = self.errors.first() {
            write!(f, " {}: {}", item.code, item.message)?;
        } else if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }
        if let Some(id) = &self.request_id {
            write!(f, " (request id {})", id)?;
        }
        Ok(())
    }
}

/// Why a call stopped early
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelReason {
    /// The caller's cancellation token fired
    Cancelled,
    /// The per-call timeout elapsed
    DeadlineExceeded,
}

/// Library error
#[derive(Debug, Error)]
pub enum Error {
    /// Missing or invalid credentials or settings
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A field listed in the null directives carries a value
    #[error("field {field:?} is in the null set but has a non-empty value")]
    InvalidState { field: String },

    /// The object graph refers back to one of its ancestors
    #[error("cyclic structure at {path:?}")]
    CyclicStructure { path: String },

    /// The request could not be built
    #[error("invalid request: {0}")]
    Request(String),

    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("API error: {0}")]
    Api(ApiError),

    /// The body did not match the expected schema
    #[error("failed to decode response: {source}")]
    Decode {
        #[source]
        source: serde_json::Error,
        /// Offending payload, kept for diagnostics
        raw: String,
    },

    #[error("call {0:?}")]
    Cancelled(CancelReason),

    #[error("giving up after {attempts} attempts: {last}")]
    RetriesExhausted { attempts: u32, last: Box<Error> },
}

impl Error {
    pub(crate) fn decode(source: serde_json::Error, raw: impl Into<String>) -> Self {
        Error::Decode {
            source,
            raw: raw.into(),
        }
    }

    /// Transient failures: network errors, 429, 5xx
    pub fn is_transient(&self) -> bool {
        match self {
            Error::Transport(_) => true,
            Error::Api(api) => api.is_transient(),
            _ => false,
        }
    }

    /// The structured API error, looking through `RetriesExhausted`
    pub fn api_error(&self) -> Option<&ApiError> {
        match self {
            Error::Api(api) => Some(api),
            Error::RetriesExhausted { last, .. } => last.api_error(),
            _ => None,
        }
    }

    /// First provider error code, if this is (or wraps) an API error
    pub fn api_code(&self) -> Option<&str> {
        self.api_error().and_then(ApiError::code)
    }

    pub fn status(&self) -> Option<StatusCode> {
        self.api_error().map(|api| api.status)
    }
}

/// Format an API error for display
/// Security: Sanitizes error messages to avoid leaking sensitive API details
pub fn format_api_error(error: &Error) -> String {
    match error {
        Error::Configuration(msg) => {
            format!("Configuration problem: {msg}. Set SPOTINST_TOKEN or add a credentials file.")
        }
        Error::Cancelled(CancelReason::DeadlineExceeded) => {
            "Request timed out. Please try again.".to_string()
        }
        Error::Cancelled(CancelReason::Cancelled) => "Request cancelled.".to_string(),
        Error::Transport(_) => {
            "Request failed. Check your network connection and try again.".to_string()
        }
        Error::RetriesExhausted { attempts, last } => {
            format!("{} (gave up after {attempts} attempts)", format_api_error(last))
        }
        Error::Api(api) => match api.status.as_u16() {
            401 => "Authentication failed. Check your API token.".to_string(),
            403 => "Permission denied. Check the token's account permissions.".to_string(),
            404 => "Resource not found.".to_string(),
            409 => "Resource conflict. The resource may already exist or be in use.".to_string(),
            429 => "Rate limit exceeded. Please try again later.".to_string(),
            500..=599 => "Service temporarily unavailable. Please try again.".to_string(),
            _ => match api.code() {
                Some(code) if !code.is_empty() => format!("Invalid request ({code})."),
                _ => "Invalid request. Check your parameters.".to_string(),
            },
        },
        other => {
            // Truncate long error messages and remove potential sensitive data
            let text = other.to_string();
            let sanitized: String = text
                .chars()
                .filter(|c| c.is_ascii_graphic() || *c == ' ')
                .take(80)
                .collect();
            if sanitized.len() < text.len() {
                format!("{sanitized}...")
            } else {
                sanitized
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn api(status: u16, code: &str) -> ApiError {
        ApiError {
            status: StatusCode::from_u16(status).unwrap(),
            request_id: Some("req-1".to_string()),
            message: String::new(),
            errors: vec![ApiErrorItem {
                code: code.to_string(),
                message: "boom".to_string(),
                field: None,
            }],
            retry_after: None,
        }
    }

    #[test]
    fn test_transient_classification() {
        assert!(api(429, "RATE").is_transient());
        assert!(api(503, "DOWN").is_transient());
        assert!(!api(400, "ACCOUNT_NOT_FOUND").is_transient());
        assert!(!Error::Configuration("x".into()).is_transient());
    }

    #[test]
    fn test_api_code_through_exhaustion() {
        let err = Error::RetriesExhausted {
            attempts: 3,
            last: Box::new(Error::Api(api(503, "UNAVAILABLE"))),
        };
        assert_eq!(err.api_code(), Some("UNAVAILABLE"));
        assert_eq!(err.status(), Some(StatusCode::SERVICE_UNAVAILABLE));
    }

    #[test]
    fn test_display_includes_code_and_request_id() {
        let text = api(400, "ACCOUNT_NOT_FOUND").to_string();
        assert!(text.contains("ACCOUNT_NOT_FOUND"));
        assert!(text.contains("req-1"));
    }

    #[test]
    fn test_format_api_error_messages() {
        assert_eq!(
            format_api_error(&Error::Api(api(404, "NOPE"))),
            "Resource not found."
        );
        assert_eq!(
            format_api_error(&Error::Api(api(400, "ACCOUNT_NOT_FOUND"))),
            "Invalid request (ACCOUNT_NOT_FOUND)."
        );
        let long = Error::Request("x".repeat(200));
        assert!(format_api_error(&long).ends_with("..."));
    }
}
