//! Shared error types.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{HangoutState, MessageCategory};

/// RFC7807 Problem Details (application/problem+json) as returned by the
/// hangouts API on failure.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProblemDetails {
    #[serde(rename = "type")]
    pub type_url: String,
    pub title: String,
    pub status: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance: Option<String>,
}

/// Attempt to parse an RFC7807 (or RFC7807-ish) JSON body into a user-facing message.
/// Prefers `detail`, falls back to `title`.
pub fn try_problem_detail(body: &str) -> Option<String> {
    let parsed = serde_json::from_str::<ProblemDetails>(body).ok()?;
    if let Some(detail) = parsed.detail {
        if !detail.trim().is_empty() {
            return Some(detail);
        }
    }
    if !parsed.title.trim().is_empty() {
        return Some(parsed.title);
    }
    None
}

/// API error type for client-side use
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    #[error("Network error: {0}")]
    Network(String),
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },
    #[error("Deserialization error: {0}")]
    Deserialize(String),
}

impl ApiError {
    /// A message suitable for rendering inline next to a search box.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Http { status, body } => {
                try_problem_detail(body).unwrap_or_else(|| format!("Request failed ({status})"))
            }
            ApiError::Network(_) => "Could not reach the server".to_string(),
            ApiError::Deserialize(_) => "Unexpected response from the server".to_string(),
        }
    }
}

/// A socket frame that could not be classified.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    #[error("malformed frame: {0}")]
    Malformed(String),
    #[error("state {0} is not valid in an inbound message")]
    UnexpectedState(HangoutState),
    #[error("state {state} does not belong to category {category:?}")]
    CategoryMismatch {
        state: HangoutState,
        category: MessageCategory,
    },
}
