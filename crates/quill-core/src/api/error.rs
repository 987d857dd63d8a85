//! API error taxonomy.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Categories of API failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApiErrorKind {
    /// No response (connection refused, DNS, TLS...)
    Network,
    /// Request timed out
    Timeout,
    /// 400: the server rejected the input
    Validation,
    /// 401 without renewal, or 401 again after the renewal retry
    Unauthenticated,
    /// 403
    Forbidden,
    /// 404
    NotFound,
    /// 409
    Conflict,
    /// Any other non-success status
    HttpStatus,
    /// Response body could not be decoded
    Parse,
    /// Rejected client-side before any network call
    Precondition,
    /// Durable client storage failed
    Storage,
}

impl fmt::Display for ApiErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ApiErrorKind::Network => "network",
            ApiErrorKind::Timeout => "timeout",
            ApiErrorKind::Validation => "validation",
            ApiErrorKind::Unauthenticated => "unauthenticated",
            ApiErrorKind::Forbidden => "forbidden",
            ApiErrorKind::NotFound => "not_found",
            ApiErrorKind::Conflict => "conflict",
            ApiErrorKind::HttpStatus => "http_status",
            ApiErrorKind::Parse => "parse",
            ApiErrorKind::Precondition => "precondition",
            ApiErrorKind::Storage => "storage",
        };
        f.write_str(label)
    }
}

/// Structured API error with kind and details.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiError {
    pub kind: ApiErrorKind,
    /// HTTP status, when a response was received
    pub status: Option<u16>,
    /// One-line summary suitable for display
    pub message: String,
    /// Optional additional details (e.g., raw error body)
    pub details: Option<String>,
}

/// Result type for API operations.
pub type ApiResult<T> = std::result::Result<T, ApiError>;

impl ApiError {
    pub fn new(kind: ApiErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            status: None,
            message: message.into(),
            details: None,
        }
    }

    /// Creates a client-side precondition failure.
    pub fn precondition(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::Precondition, message)
    }

    /// Creates a terminal authentication failure.
    pub fn unauthenticated(message: impl Into<String>) -> Self {
        Self {
            status: Some(401),
            ..Self::new(ApiErrorKind::Unauthenticated, message)
        }
    }

    /// Creates a storage failure from an anyhow chain.
    pub fn storage(err: &anyhow::Error) -> Self {
        Self::new(ApiErrorKind::Storage, format!("{err:#}"))
    }

    /// Classifies a transport error.
    pub fn transport(err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::new(ApiErrorKind::Timeout, "Request timed out")
        } else if err.is_decode() {
            Self::new(ApiErrorKind::Parse, format!("Failed to decode response: {err}"))
        } else {
            Self::new(ApiErrorKind::Network, format!("Communication error: {err}"))
        }
    }

    /// Creates a decode error for a body that arrived but did not match the expected shape.
    pub fn parse(message: impl Into<String>, body: &str) -> Self {
        Self {
            details: (!body.is_empty()).then(|| body.to_string()),
            ..Self::new(ApiErrorKind::Parse, message)
        }
    }

    /// Creates an error from a non-success status and its body.
    ///
    /// Bodies shaped `{"message": "..."}` are unwrapped into the message.
    pub fn http_status(status: u16, body: &str) -> Self {
        let kind = match status {
            400 => ApiErrorKind::Validation,
            401 => ApiErrorKind::Unauthenticated,
            403 => ApiErrorKind::Forbidden,
            404 => ApiErrorKind::NotFound,
            409 => ApiErrorKind::Conflict,
            _ => ApiErrorKind::HttpStatus,
        };

        let server_message = serde_json::from_str::<Value>(body).ok().and_then(|json| {
            json.get("message")
                .and_then(Value::as_str)
                .map(str::to_string)
        });

        let message = match server_message {
            Some(msg) if !msg.trim().is_empty() => format!("HTTP {status}: {msg}"),
            _ => format!("HTTP {status}"),
        };

        Self {
            kind,
            status: Some(status),
            message,
            details: (!body.is_empty()).then(|| body.to_string()),
        }
    }

    /// Reads the body of a failed response and classifies it.
    pub async fn from_response(response: reqwest::Response) -> Self {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        Self::http_status(status, &body)
    }

    pub fn is_unauthenticated(&self) -> bool {
        self.kind == ApiErrorKind::Unauthenticated
    }

    /// Server-provided message, without the `HTTP nnn:` prefix.
    pub fn server_message(&self) -> Option<&str> {
        let status = self.status?;
        self.message
            .strip_prefix(&format!("HTTP {status}: "))
            .filter(|msg| !msg.is_empty())
    }

    /// Maps the error to a message suitable for end users.
    pub fn user_message(&self) -> String {
        match self.kind {
            ApiErrorKind::Network | ApiErrorKind::Timeout => {
                "A communication error occurred. Please try again later.".to_string()
            }
            ApiErrorKind::Validation => self
                .server_message()
                .map_or_else(|| "The request was invalid.".to_string(), str::to_string),
            ApiErrorKind::Unauthenticated => {
                "Your session has expired. Please log in again.".to_string()
            }
            ApiErrorKind::Forbidden => self.server_message().map_or_else(
                || "You do not have permission to do that.".to_string(),
                str::to_string,
            ),
            ApiErrorKind::NotFound => self
                .server_message()
                .map_or_else(|| "Not found.".to_string(), str::to_string),
            ApiErrorKind::Conflict => self
                .server_message()
                .map_or_else(|| "That already exists.".to_string(), str::to_string),
            ApiErrorKind::Precondition | ApiErrorKind::Storage => self.message.clone(),
            ApiErrorKind::HttpStatus | ApiErrorKind::Parse => {
                format!("The server returned an unexpected response ({}).", self.message)
            }
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ApiError {}
