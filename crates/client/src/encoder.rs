//! Builds outbound frames for the selected hangout.

use hangouts_shared::{ClientCommand, Hangout, Message, OutboundMessage};

use crate::error::EngineError;

/// Build the frame for `command` against `hangout`.
///
/// `author` is the local username and labels any message carried by the
/// frame. `message_text` is only read for `INVITE` and `MESSAGE`.
pub fn encode(
    command: ClientCommand,
    hangout: &Hangout,
    message_text: &str,
    author: &str,
) -> Result<OutboundMessage, EngineError> {
    if !hangout.state.permits(command) {
        return Err(EngineError::NotPermitted {
            state: hangout.state,
            command,
        });
    }

    let message = match command {
        ClientCommand::Invite | ClientCommand::Message => {
            Some(Message::now(message_text).with_author(author))
        }
        _ => hangout.message.clone(),
    };

    Ok(OutboundMessage {
        username: hangout.username.clone(),
        email: hangout.email.clone(),
        message,
        command,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use hangouts_shared::HangoutState;

    fn hangout(state: HangoutState) -> Hangout {
        Hangout {
            username: "bob".to_string(),
            email: "bob@example.com".to_string(),
            state,
            message: Some(Message {
                text: "earlier".to_string(),
                timestamp: 10,
                username: Some("bob".to_string()),
            }),
        }
    }

    #[test]
    fn test_invite_carries_composed_text() {
        let frame = encode(
            ClientCommand::Invite,
            &hangout(HangoutState::Invite),
            "let's talk",
            "me",
        )
        .unwrap();

        assert_eq!(frame.command, ClientCommand::Invite);
        assert_eq!(frame.username, "bob");
        assert_eq!(frame.email, "bob@example.com");
        let message = frame.message.unwrap();
        assert_eq!(message.text, "let's talk");
        assert_eq!(message.username.as_deref(), Some("me"));
        assert!(message.timestamp > 0);
    }

    #[test]
    fn test_accept_spreads_current_hangout() {
        let current = hangout(HangoutState::Inviter);
        let frame = encode(ClientCommand::Accept, &current, "ignored", "me").unwrap();

        assert_eq!(frame.command, ClientCommand::Accept);
        assert_eq!(frame.message, current.message);
    }

    #[test]
    fn test_illegal_command_is_refused() {
        let err = encode(
            ClientCommand::Message,
            &hangout(HangoutState::Blocked),
            "hello?",
            "me",
        )
        .unwrap_err();

        assert_eq!(
            err,
            EngineError::NotPermitted {
                state: HangoutState::Blocked,
                command: ClientCommand::Message,
            }
        );
    }
}
