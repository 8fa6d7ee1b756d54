//! Error types for ReasonKit CORS
//!
//! The policy engine itself never fails. Errors only arise at the edges:
//! loading configuration, and the HTTP adapter rejecting a denied origin.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

/// The main error type for ReasonKit CORS operations
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A cross-origin request was denied by the origin policy
    #[error("Origin not allowed: {origin}")]
    OriginRejected {
        /// The `Origin` header value that was rejected
        origin: String,
    },

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with message
    #[error("{0}")]
    Generic(String),
}

/// Configuration loading errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A boolean environment variable had an unrecognised value
    #[error("Invalid boolean for {var}: {value}")]
    InvalidBool {
        /// Variable name
        var: String,
        /// Offending value
        value: String,
    },

    /// A development port hint was not a positive 16-bit integer
    #[error("Invalid development port hint: {0}")]
    InvalidPortHint(String),

    /// The bind address could not be parsed
    #[error("Invalid bind address: {0}")]
    InvalidBindAddress(String),

    /// The configuration file could not be read
    #[error("Failed to read configuration file {path}: {message}")]
    FileRead {
        /// File path
        path: String,
        /// Underlying error message
        message: String,
    },
}

/// Result type alias for ReasonKit CORS operations
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a generic error from a string
    pub fn generic<S: Into<String>>(msg: S) -> Self {
        Error::Generic(msg.into())
    }

    /// Create an origin rejection for `origin`
    pub fn origin_rejected<S: Into<String>>(origin: S) -> Self {
        Error::OriginRejected {
            origin: origin.into(),
        }
    }

    /// HTTP status code reported for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::OriginRejected { .. } => StatusCode::FORBIDDEN,
            Error::Config(_) | Error::Io(_) | Error::Json(_) | Error::Generic(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = match &self {
            Error::OriginRejected { origin } => json!({
                "error": self.to_string(),
                "origin": origin,
            }),
            _ => json!({ "error": self.to_string() }),
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::Config(ConfigError::InvalidPortHint("abc".to_string()));
        assert!(err.to_string().contains("Configuration error"));
        assert!(err.to_string().contains("abc"));
    }

    #[test]
    fn test_origin_rejected_message() {
        let err = Error::origin_rejected("https://evil.example");
        assert_eq!(err.to_string(), "Origin not allowed: https://evil.example");
        assert_eq!(err.status_code(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_config_error_status() {
        let err = Error::from(ConfigError::InvalidBool {
            var: "REASONKIT_CORS_WWW_ALIASES".to_string(),
            value: "maybe".to_string(),
        });
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(err.to_string().contains("maybe"));
    }

    #[test]
    fn test_into_response_status() {
        let response = Error::origin_rejected("https://evil.example").into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let response = Error::generic("boom").into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
