//! Domain models shared by the hangouts client and server.

use chrono::Utc;
use serde::{Deserialize, Serialize};

// --- Relationship state ---

/// Which side of the conversation produced an inbound state change.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageCategory {
    /// The server confirms a command the local user sent.
    Acknowledgement,
    /// The counterpart acted on their own.
    Peer,
}

/// State of the relationship between the local user and one counterpart.
///
/// The `-ED` family records what the local user did (as acknowledged by the
/// server), the `-ER` family records what the counterpart did. `Invite` is the
/// local draft of a hangout promoted from a user search and never travels
/// over the wire inbound.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HangoutState {
    Invite,

    Invited,
    Accepted,
    Declined,
    Blocked,
    Unblocked,
    Messaged,

    #[serde(alias = "OFFERER")]
    Inviter,
    Accepter,
    Decliner,
    Blocker,
    Unblocker,
    #[serde(rename = "MESSANGER")]
    Messenger,
}

impl HangoutState {
    /// The category implied by the state family, `None` for the local draft.
    pub fn category(self) -> Option<MessageCategory> {
        use HangoutState::*;
        match self {
            Invite => None,
            Invited | Accepted | Declined | Blocked | Unblocked | Messaged => {
                Some(MessageCategory::Acknowledgement)
            }
            Inviter | Accepter | Decliner | Blocker | Unblocker | Messenger => {
                Some(MessageCategory::Peer)
            }
        }
    }

    /// Whether the local user may issue `command` from this state.
    pub fn permits(self, command: ClientCommand) -> bool {
        use ClientCommand as C;
        use HangoutState::*;
        match self {
            Invite => matches!(command, C::Invite),
            Invited => matches!(command, C::Block),
            Inviter => matches!(command, C::Accept | C::Decline | C::Block),
            Accepted | Accepter | Messaged | Messenger | Unblocked | Unblocker => {
                matches!(command, C::Message | C::Block)
            }
            Declined | Decliner => matches!(command, C::Invite | C::Block),
            Blocked => matches!(command, C::Unblock),
            Blocker => false,
        }
    }

    /// Whether this state carries a chat message payload.
    pub fn is_message(self) -> bool {
        matches!(self, HangoutState::Messaged | HangoutState::Messenger)
    }
}

impl std::fmt::Display for HangoutState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            HangoutState::Invite => "INVITE",
            HangoutState::Invited => "INVITED",
            HangoutState::Accepted => "ACCEPTED",
            HangoutState::Declined => "DECLINED",
            HangoutState::Blocked => "BLOCKED",
            HangoutState::Unblocked => "UNBLOCKED",
            HangoutState::Messaged => "MESSAGED",
            HangoutState::Inviter => "INVITER",
            HangoutState::Accepter => "ACCEPTER",
            HangoutState::Decliner => "DECLINER",
            HangoutState::Blocker => "BLOCKER",
            HangoutState::Unblocker => "UNBLOCKER",
            HangoutState::Messenger => "MESSANGER",
        };
        f.write_str(name)
    }
}

/// Outbound intents a user can issue against a selected hangout.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClientCommand {
    Invite,
    Accept,
    Decline,
    Block,
    Unblock,
    Message,
}

impl std::fmt::Display for ClientCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ClientCommand::Invite => "INVITE",
            ClientCommand::Accept => "ACCEPT",
            ClientCommand::Decline => "DECLINE",
            ClientCommand::Block => "BLOCK",
            ClientCommand::Unblock => "UNBLOCK",
            ClientCommand::Message => "MESSAGE",
        };
        f.write_str(name)
    }
}

// --- Entities ---

/// A chat message. Messages are append-only once logged.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    pub text: String,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
    /// Author, when known. Absent on messages received from older peers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

impl Message {
    /// Create a message stamped with the current time.
    pub fn now(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            timestamp: Utc::now().timestamp_millis(),
            username: None,
        }
    }

    pub fn with_author(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }
}

/// The relationship/session record between the local user and one counterpart.
///
/// `username` is the stable key: a hangout list holds at most one entry per
/// username.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Hangout {
    pub username: String,
    #[serde(default)]
    pub email: String,
    pub state: HangoutState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<Message>,
}

impl Hangout {
    /// A local draft hangout for a user found by search.
    pub fn draft(user: &User) -> Self {
        Self {
            username: user.username.clone(),
            email: user.email.clone(),
            state: HangoutState::Invite,
            message: None,
        }
    }
}

/// A user returned by the directory search that is not yet a hangout.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    pub username: String,
    #[serde(default)]
    pub email: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_wire_names() {
        assert_eq!(
            serde_json::to_string(&HangoutState::Messenger).unwrap(),
            "\"MESSANGER\""
        );
        assert_eq!(
            serde_json::from_str::<HangoutState>("\"OFFERER\"").unwrap(),
            HangoutState::Inviter
        );
        assert_eq!(HangoutState::Accepted.to_string(), "ACCEPTED");
    }

    #[test]
    fn test_state_families() {
        assert_eq!(HangoutState::Invite.category(), None);
        assert_eq!(
            HangoutState::Declined.category(),
            Some(MessageCategory::Acknowledgement)
        );
        assert_eq!(HangoutState::Blocker.category(), Some(MessageCategory::Peer));
    }

    #[test]
    fn test_permitted_commands() {
        assert!(HangoutState::Invite.permits(ClientCommand::Invite));
        assert!(!HangoutState::Invite.permits(ClientCommand::Message));
        assert!(HangoutState::Inviter.permits(ClientCommand::Accept));
        assert!(HangoutState::Inviter.permits(ClientCommand::Decline));
        assert!(HangoutState::Accepter.permits(ClientCommand::Message));
        assert!(HangoutState::Blocked.permits(ClientCommand::Unblock));
        assert!(!HangoutState::Blocked.permits(ClientCommand::Message));
        assert!(!HangoutState::Blocker.permits(ClientCommand::Unblock));
    }

    #[test]
    fn test_hangout_tolerates_missing_email() {
        let hangout: Hangout =
            serde_json::from_str(r#"{"username":"bob","state":"INVITED"}"#).unwrap();
        assert_eq!(hangout.email, "");
        assert_eq!(hangout.message, None);
    }
}
