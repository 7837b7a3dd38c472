// API transport layer - thin reqwest wrappers per backend group
//
// One async function per backend operation, grouped the way the backend
// groups its routes (auth, user, chatbot). Every authenticated call attaches
// a bearer token; simple payloads are JSON, file-bearing calls are multipart.
//
// Failure classification happens here and only here: HTTP statuses and
// connection failures are folded into the closed `ApiError` enumeration, and
// each kind owns its fixed user-facing message. Callers above never inspect
// raw error text.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;

use crate::config::{ApiEnvironment, Endpoints};

mod auth;
mod chatbot;
mod user;

pub use auth::{LoginData, RegisterRequest, User};
pub use chatbot::FileUpload;

// ─────────────────────────────────────────────────────────────────────────────
// Errors
// ─────────────────────────────────────────────────────────────────────────────

/// Transport-level failures, classified at the HTTP boundary
#[derive(Debug, Clone)]
pub enum ApiError {
    /// HTTP 429 - the backend is rate limiting this client
    RateLimited,
    /// HTTP 401 - the bearer token is missing, invalid, or expired
    Unauthorized,
    /// HTTP 5xx - transient backend fault
    ServerFault(u16),
    /// Any other non-OK status without a usable JSON envelope
    Http { status: u16, message: String },
    /// No response at all: connect failure, DNS, timeout
    Network(String),
    /// The response body was not the JSON we expected
    Decode(String),
}

impl ApiError {
    /// Classify a non-OK HTTP status
    pub fn from_status(status: u16, message: String) -> Self {
        match status {
            429 => Self::RateLimited,
            401 => Self::Unauthorized,
            500..=599 => Self::ServerFault(status),
            _ => Self::Http { status, message },
        }
    }

    /// The fixed, user-facing translation for this error kind.
    ///
    /// This is the single home of the translation table; kinds are matched
    /// top-to-bottom in the order the original client checked substrings.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::RateLimited => {
                "Too many requests. Please wait a moment before trying again."
            }
            Self::Network(_) => {
                "Could not reach the server. Check your internet connection and try again."
            }
            Self::Unauthorized => "Your session has expired. Please log in again.",
            Self::ServerFault(_) => "The server hit a problem. Please try again later.",
            Self::Http { status: 413, .. } => {
                "File is too large. The maximum is 10MB per file."
            }
            Self::Http { status: 415, .. } => {
                "Unsupported file type. Supported: images, PDF, text, Word documents."
            }
            _ => "Sorry, something went wrong. Please try again.",
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RateLimited => write!(f, "rate limited (HTTP 429)"),
            Self::Unauthorized => write!(f, "unauthorized (HTTP 401)"),
            Self::ServerFault(status) => write!(f, "server fault (HTTP {})", status),
            Self::Http { status, message } => write!(f, "HTTP {}: {}", status, message),
            Self::Network(msg) => write!(f, "network failure: {}", msg),
            Self::Decode(msg) => write!(f, "bad response body: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        if let Some(status) = e.status() {
            Self::from_status(status.as_u16(), e.to_string())
        } else if e.is_decode() {
            Self::Decode(e.to_string())
        } else {
            // connect, timeout, body, redirect - no response reached us
            Self::Network(e.to_string())
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Response envelope
// ─────────────────────────────────────────────────────────────────────────────

/// The backend's uniform response envelope
#[derive(Debug, Clone, Deserialize)]
pub struct ApiResponse<T> {
    #[serde(default)]
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
}

impl<T> ApiResponse<T> {
    /// Successful envelope wrapping `data` (used by tests and mocks)
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
        }
    }

    /// Failed envelope carrying a server-provided message
    pub fn err(message: &str) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message.to_string()),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Client
// ─────────────────────────────────────────────────────────────────────────────

/// HTTP client bound to one resolved environment
#[derive(Debug, Clone)]
pub struct ChatClient {
    http: reqwest::Client,
    endpoints: Endpoints,
}

impl ChatClient {
    /// Build a client for the given environment. The environment's timeout
    /// applies to every ordinary call.
    pub fn new(env: &ApiEnvironment) -> anyhow::Result<Self> {
        use anyhow::Context;

        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(env.timeout_ms))
            .pool_max_idle_per_host(10)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            http,
            endpoints: Endpoints::new(&env.base_url),
        })
    }

    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.http
    }

    pub(crate) fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    /// Decode a response into the uniform envelope.
    ///
    /// 429/401/5xx become their `ApiError` kinds before any body decoding.
    /// Other non-OK statuses are given a chance to parse as a JSON envelope
    /// (the backend wraps most errors in `{success:false, message}`); only
    /// when that fails do they surface as a plain HTTP error.
    pub(crate) async fn envelope<T: DeserializeOwned>(
        resp: reqwest::Response,
    ) -> Result<ApiResponse<T>, ApiError> {
        let status = resp.status();
        match status.as_u16() {
            429 => return Err(ApiError::RateLimited),
            401 => return Err(ApiError::Unauthorized),
            s if status.is_server_error() => return Err(ApiError::ServerFault(s)),
            _ => {}
        }

        let bytes = resp.bytes().await.map_err(ApiError::from)?;
        match serde_json::from_slice::<ApiResponse<T>>(&bytes) {
            Ok(envelope) => Ok(envelope),
            Err(e) if status.is_success() => Err(ApiError::Decode(e.to_string())),
            Err(_) => Err(ApiError::Http {
                status: status.as_u16(),
                message: String::from_utf8_lossy(&bytes).trim().to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        assert!(matches!(
            ApiError::from_status(429, String::new()),
            ApiError::RateLimited
        ));
        assert!(matches!(
            ApiError::from_status(401, String::new()),
            ApiError::Unauthorized
        ));
        assert!(matches!(
            ApiError::from_status(500, String::new()),
            ApiError::ServerFault(500)
        ));
        assert!(matches!(
            ApiError::from_status(503, String::new()),
            ApiError::ServerFault(503)
        ));
        assert!(matches!(
            ApiError::from_status(404, String::new()),
            ApiError::Http { status: 404, .. }
        ));
    }

    #[test]
    fn test_user_message_table() {
        assert!(ApiError::RateLimited.user_message().contains("Too many requests"));
        assert!(ApiError::Unauthorized.user_message().contains("log in again"));
        assert!(ApiError::ServerFault(502).user_message().contains("try again later"));
        assert!(ApiError::Network("connect refused".into())
            .user_message()
            .contains("internet connection"));
        assert!(ApiError::Http {
            status: 413,
            message: String::new()
        }
        .user_message()
        .contains("too large"));
        assert!(ApiError::Decode("eof".into())
            .user_message()
            .contains("something went wrong"));
    }

    #[test]
    fn test_envelope_parses_failure_body() {
        let env: ApiResponse<serde_json::Value> =
            serde_json::from_str(r#"{"success":false,"message":"invalid credentials"}"#).unwrap();
        assert!(!env.success);
        assert_eq!(env.message.as_deref(), Some("invalid credentials"));
        assert!(env.data.is_none());
    }
}
