//! Error types for the docs RAG service
//!
//! Every failure is either a user fault (bad or policy-violating input, shown to
//! the caller as-is) or an application fault (configuration, provider or
//! transport trouble, logged in full and hidden behind a generic message).

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Result type alias for RAG operations
pub type Result<T> = std::result::Result<T, Error>;

/// Message returned to the caller for every application fault
pub const GENERIC_ERROR_MESSAGE: &str = "There was an error processing your request";

/// Top-level classification of an [`Error`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Invalid or policy-violating input; safe to show to the caller
    User,
    /// Collaborator or infrastructure failure; details stay in the logs
    Application,
}

/// RAG service errors
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid user input (missing query, flagged content)
    #[error("{message}")]
    User {
        message: String,
        data: Option<serde_json::Value>,
    },

    /// Missing or invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Moderation call failed
    #[error("Moderation failed: {0}")]
    Moderation(String),

    /// Embedding error
    #[error("Embedding generation failed: {0}")]
    Embedding(String),

    /// Vector index error
    #[error("Vector index error: {0}")]
    VectorDb(String),

    /// Completion provider error
    #[error("LLM error: {message}")]
    Llm {
        message: String,
        payload: Option<serde_json::Value>,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a user error without structured details
    pub fn user(message: impl Into<String>) -> Self {
        Self::User {
            message: message.into(),
            data: None,
        }
    }

    /// Create a user error carrying details the caller may display
    pub fn user_with_data(message: impl Into<String>, data: serde_json::Value) -> Self {
        Self::User {
            message: message.into(),
            data: Some(data),
        }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a moderation error
    pub fn moderation(message: impl Into<String>) -> Self {
        Self::Moderation(message.into())
    }

    /// Create an embedding error
    pub fn embedding(message: impl Into<String>) -> Self {
        Self::Embedding(message.into())
    }

    /// Create a vector db error
    pub fn vector_db(message: impl Into<String>) -> Self {
        Self::VectorDb(message.into())
    }

    /// Create an LLM error
    pub fn llm(message: impl Into<String>) -> Self {
        Self::Llm {
            message: message.into(),
            payload: None,
        }
    }

    /// Create an LLM error carrying the provider's error body
    pub fn llm_with_payload(message: impl Into<String>, payload: serde_json::Value) -> Self {
        Self::Llm {
            message: message.into(),
            payload: Some(payload),
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Classify the error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::User { .. } => ErrorKind::User,
            _ => ErrorKind::Application,
        }
    }

    /// True for caller-fault errors
    pub fn is_user_error(&self) -> bool {
        self.kind() == ErrorKind::User
    }

    /// HTTP status for this error
    pub fn status_code(&self) -> StatusCode {
        match self.kind() {
            ErrorKind::User => StatusCode::BAD_REQUEST,
            ErrorKind::Application => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let body = match self {
            Error::User { message, data } => {
                tracing::info!("Rejected request: {}", message);
                match data {
                    Some(data) => json!({ "error": message, "data": data }),
                    None => json!({ "error": message }),
                }
            }
            Error::Llm {
                ref message,
                payload: Some(ref payload),
            } => {
                tracing::error!("LLM error: {}: {}", message, payload);
                json!({ "error": GENERIC_ERROR_MESSAGE })
            }
            other => {
                tracing::error!("{}", other);
                json!({ "error": GENERIC_ERROR_MESSAGE })
            }
        };

        (status, Json(body)).into_response()
    }
}
