//! Query request types and text sanitization

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Inbound question payload
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryRequest {
    /// The question to answer
    #[serde(default, alias = "question")]
    pub prompt: Option<String>,
}

impl QueryRequest {
    /// Create a new request
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: Some(prompt.into()),
        }
    }
}

/// A user question, trimmed and checked for emptiness
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    sanitized: String,
}

impl Query {
    /// Sanitize a raw question.
    ///
    /// Fails with a user error when the question is absent or blank.
    pub fn parse(raw: Option<&str>) -> Result<Self> {
        let raw = raw.ok_or_else(|| Error::user("Missing query in request data"))?;
        let sanitized = raw.trim();
        if sanitized.is_empty() {
            return Err(Error::user("Missing query in request data"));
        }

        Ok(Self {
            sanitized: sanitized.to_string(),
        })
    }

    /// Trimmed text, used for moderation and the prompt
    pub fn sanitized(&self) -> &str {
        &self.sanitized
    }
}

/// Trim and replace line breaks with spaces
pub fn collapse_newlines(text: &str) -> String {
    text.trim().replace("\r\n", " ").replace(['\n', '\r'], " ")
}
