//! Response envelope decoding
//!
//! Every API response is wrapped:
//!
//! ```json
//! {
//!   "request":  { "id": "...", "url": "...", "method": "GET", "timestamp": "..." },
//!   "response": {
//!     "status": { "code": 200, "message": "OK" },
//!     "kind": "spotinst:setup:account",
//!     "items": [ ... ],
//!     "count": 2,
//!     "errors": [ { "code": "...", "message": "..." } ],
//!     "paginationInfo": { "nextPageToken": "..." }
//!   }
//! }
//! ```

use super::http::sanitize_for_log;
use crate::error::{ApiError, ApiErrorItem, Error, Result};
use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::time::Duration;

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct RequestInfo {
    pub id: Option<String>,
    pub url: Option<String>,
    pub method: Option<String>,
    pub timestamp: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Status {
    pub code: u16,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PaginationInfo {
    pub next_page_token: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ResponseBody {
    pub status: Status,
    pub kind: Option<String>,
    /// Raw item payloads in wire order; `null` and missing both mean empty
    #[serde(deserialize_with = "null_as_empty")]
    pub items: Vec<Value>,
    pub count: Option<u64>,
    #[serde(deserialize_with = "null_as_empty")]
    pub errors: Vec<ApiErrorItem>,
    pub pagination_info: Option<PaginationInfo>,
}

/// Decoded response wrapper
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Envelope {
    pub request: RequestInfo,
    pub response: ResponseBody,
}

fn null_as_empty<'de, D, T>(deserializer: D) -> std::result::Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

impl Envelope {
    /// Envelope for a success without body (204, empty 200)
    pub fn empty(status: StatusCode) -> Self {
        Self {
            response: ResponseBody {
                status: Status {
                    code: status.as_u16(),
                    message: status.canonical_reason().unwrap_or_default().to_string(),
                },
                ..ResponseBody::default()
            },
            ..Self::default()
        }
    }

    /// Parse a response body. Blank bodies yield [`Envelope::empty`].
    pub fn parse(status: StatusCode, body: &[u8]) -> Result<Self> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::empty(status));
        }
        serde_json::from_slice(body)
            .map_err(|e| Error::decode(e, String::from_utf8_lossy(body).into_owned()))
    }

    pub fn request_id(&self) -> Option<&str> {
        self.request.id.as_deref()
    }

    pub fn items(&self) -> &[Value] {
        &self.response.items
    }

    pub fn next_page_token(&self) -> Option<&str> {
        self.response
            .pagination_info
            .as_ref()
            .and_then(|p| p.next_page_token.as_deref())
            .filter(|t| !t.is_empty())
    }

    /// Decode every item, preserving wire order
    pub fn decode_items<T: DeserializeOwned>(&self) -> Result<Vec<T>> {
        self.response.items.iter().map(decode_item).collect()
    }

    /// Decode item 0, if any. Zero items is not an error.
    pub fn first<T: DeserializeOwned>(&self) -> Result<Option<T>> {
        self.response.items.first().map(decode_item).transpose()
    }
}

fn decode_item<T: DeserializeOwned>(raw: &Value) -> Result<T> {
    T::deserialize(raw).map_err(|e| Error::decode(e, raw.to_string()))
}

/// Parse a numeric `Retry-After` header
pub fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

/// Build the structured error for a non-2xx response.
///
/// The body is decoded leniently: if it is not an envelope, the error keeps a
/// sanitized preview as its message and an empty code list.
pub fn api_error(status: StatusCode, headers: &HeaderMap, body: &[u8]) -> ApiError {
    let retry_after = parse_retry_after(headers);

    match serde_json::from_slice::<Envelope>(body) {
        Ok(envelope) => {
            let mut message = envelope.response.status.message;
            if message.is_empty() && envelope.response.errors.is_empty() {
                message = sanitize_for_log(&String::from_utf8_lossy(body));
            }
            ApiError {
                status,
                request_id: envelope.request.id,
                message,
                errors: envelope.response.errors,
                retry_after,
            }
        }
        Err(_) => ApiError {
            status,
            request_id: None,
            message: sanitize_for_log(&String::from_utf8_lossy(body)),
            errors: Vec::new(),
            retry_after,
        },
    }
}
