//! Hangouts wire protocol.
//!
//! Client → server frames are [`OutboundMessage`], tagged with a `command`.
//! Server → client frames are [`InboundMessage`], classified on two axes:
//! the resulting `state` and an optional `category`. When the category is
//! missing it is derived from the state family.

use serde::{Deserialize, Serialize};

use crate::error::ProtocolError;
use crate::models::{ClientCommand, Hangout, HangoutState, Message, MessageCategory, User};

/// A command sent by the local user about one counterpart.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OutboundMessage {
    pub username: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<Message>,
    #[serde(alias = "type")]
    pub command: ClientCommand,
}

impl OutboundMessage {
    pub fn to_json(&self) -> Result<String, ProtocolError> {
        serde_json::to_string(self).map_err(|e| ProtocolError::Malformed(e.to_string()))
    }
}

/// A state change pushed by the server.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct InboundMessage {
    pub username: String,
    #[serde(default)]
    pub email: String,
    pub state: HangoutState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<Message>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<MessageCategory>,
}

impl InboundMessage {
    /// Parse a raw socket frame.
    pub fn parse(raw: &str) -> Result<Self, ProtocolError> {
        serde_json::from_str(raw).map_err(|e| ProtocolError::Malformed(e.to_string()))
    }

    /// Resolve the category, checking it against the state family.
    pub fn classify(&self) -> Result<MessageCategory, ProtocolError> {
        let implied = self
            .state
            .category()
            .ok_or(ProtocolError::UnexpectedState(self.state))?;

        match self.category {
            Some(category) if category != implied => Err(ProtocolError::CategoryMismatch {
                state: self.state,
                category,
            }),
            _ => Ok(implied),
        }
    }

    /// The hangout this message describes.
    pub fn hangout(&self) -> Hangout {
        Hangout {
            username: self.username.clone(),
            email: self.email.clone(),
            state: self.state,
            message: self.message.clone(),
        }
    }
}

/// Body of `GET /hangouts/find`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct FindHangoutsResponse {
    #[serde(default)]
    pub hangouts: Vec<Hangout>,
}

/// Body of `GET /users/find`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct FindUsersResponse {
    #[serde(default)]
    pub users: Vec<User>,
}
