//! Hangout state machine and local UI state.
//!
//! [`reduce`] is a pure function from the current [`EngineState`] and an
//! [`Action`] to the next state. Side effects (socket sends, persistence,
//! fetches) live in the engine; the reducer only records their outcomes.

use hangouts_shared::{ApiError, ClientCommand, Hangout, Message, User};

use crate::error::EngineError;
use crate::ws::ConnectionState;

/// Everything the UI reads.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EngineState {
    pub hangouts: Vec<Hangout>,
    /// Current selection.
    pub hangout: Option<Hangout>,
    /// Message log of the selection, `None` until loaded.
    pub messages: Option<Vec<Message>>,
    pub search: String,
    /// Search results that are not yet hangouts.
    pub users: Vec<User>,
    pub loading: bool,
    pub error: Option<EngineError>,
    pub message_text: String,
    /// Command sent for the selection and not yet acknowledged.
    pub pending: Option<ClientCommand>,
    /// Token of the fetch whose result will be accepted.
    pub request: Option<u64>,
    pub connection: ConnectionState,
}

impl EngineState {
    pub fn find(&self, username: &str) -> Option<&Hangout> {
        self.hangouts.iter().find(|h| h.username == username)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Hydrate the list from durable storage.
    LoadedHangouts(Vec<Hangout>),
    SearchChanged(String),
    MessageTextChanged(String),
    /// Promote a search result into a draft hangout and select it.
    SelectedUser(User),
    SelectedHangout { username: String },
    /// Replace an existing hangout (matched by username) and select it.
    HangoutStateChanged(Hangout),
    /// Insert a hangout the local user did not know about.
    NewHangoutReceived(Hangout),
    LoadedMessages(Vec<Message>),
    SavedMessageLocally(Message),
    FetchHangoutStarted { token: u64 },
    FetchHangoutSuccess { token: u64, hangouts: Vec<Hangout> },
    FetchHangoutFailed { token: u64, error: ApiError },
    FetchUserStarted { token: u64 },
    FetchUserSuccess { token: u64, users: Vec<User> },
    FetchUserFailed { token: u64, error: ApiError },
    /// Keep only hangouts whose username contains the search text.
    FilterHangouts,
    CommandStarted(ClientCommand),
    Failed(EngineError),
    ClearError,
    ConnectionChanged(ConnectionState),
}

/// `loading` is derived: a command awaits its acknowledgement or a fetch is
/// in flight.
pub fn reduce(state: EngineState, action: Action) -> EngineState {
    let next = apply(state, action);
    EngineState {
        loading: next.pending.is_some() || next.request.is_some(),
        ..next
    }
}

fn apply(state: EngineState, action: Action) -> EngineState {
    match action {
        Action::LoadedHangouts(hangouts) => EngineState { hangouts, ..state },
        Action::SearchChanged(search) => EngineState {
            search,
            // Results of a fetch for the old text are stale now.
            request: None,
            ..state
        },
        Action::MessageTextChanged(message_text) => EngineState {
            message_text,
            ..state
        },
        Action::SelectedUser(user) => select_user(state, user),
        Action::SelectedHangout { username } => {
            let hangout = state.find(&username).cloned();
            EngineState {
                hangout,
                messages: None,
                pending: None,
                ..state
            }
        }
        Action::HangoutStateChanged(hangout) => replace_hangout(state, hangout),
        Action::NewHangoutReceived(hangout) => {
            if state.find(&hangout.username).is_some() {
                return replace_hangout(state, hangout);
            }
            let mut hangouts = state.hangouts;
            hangouts.push(hangout);
            EngineState { hangouts, ..state }
        }
        Action::LoadedMessages(messages) => EngineState {
            messages: Some(messages),
            ..state
        },
        Action::SavedMessageLocally(message) => {
            let mut messages = state.messages.unwrap_or_default();
            messages.push(message);
            EngineState {
                messages: Some(messages),
                ..state
            }
        }
        Action::FetchHangoutStarted { token } => EngineState {
            // Users found by an earlier search do not belong to this one.
            users: Vec::new(),
            error: None,
            request: Some(token),
            ..state
        },
        Action::FetchUserStarted { token } => EngineState {
            error: None,
            request: Some(token),
            ..state
        },
        Action::FetchHangoutSuccess { token, hangouts } => {
            if state.request != Some(token) {
                return state;
            }
            let mut merged = state.hangouts;
            for found in hangouts {
                match merged.iter_mut().find(|h| h.username == found.username) {
                    Some(existing) => *existing = found,
                    None => merged.push(found),
                }
            }
            EngineState {
                hangouts: merged,
                request: None,
                ..state
            }
        }
        Action::FetchUserSuccess { token, users } => {
            if state.request != Some(token) {
                return state;
            }
            EngineState {
                users,
                request: None,
                ..state
            }
        }
        Action::FetchHangoutFailed { token, error } | Action::FetchUserFailed { token, error } => {
            if state.request != Some(token) {
                return state;
            }
            EngineState {
                request: None,
                error: Some(error.into()),
                ..state
            }
        }
        Action::FilterHangouts => {
            let mut hangouts = state.hangouts;
            hangouts.retain(|h| h.username.contains(state.search.as_str()));
            EngineState { hangouts, ..state }
        }
        Action::CommandStarted(command) => EngineState {
            pending: Some(command),
            error: None,
            ..state
        },
        Action::Failed(error) => EngineState {
            pending: None,
            error: Some(error),
            ..state
        },
        Action::ClearError => EngineState {
            error: None,
            ..state
        },
        Action::ConnectionChanged(connection) => EngineState {
            connection,
            ..state
        },
    }
}

fn select_user(state: EngineState, user: User) -> EngineState {
    if let Some(existing) = state.find(&user.username).cloned() {
        return EngineState {
            hangout: Some(existing),
            messages: None,
            pending: None,
            ..state
        };
    }

    let hangout = Hangout::draft(&user);
    let mut hangouts = state.hangouts;
    hangouts.push(hangout.clone());
    EngineState {
        hangouts,
        hangout: Some(hangout),
        messages: Some(Vec::new()),
        pending: None,
        ..state
    }
}

fn replace_hangout(state: EngineState, hangout: Hangout) -> EngineState {
    let Some(index) = state
        .hangouts
        .iter()
        .position(|h| h.username == hangout.username)
    else {
        return state;
    };

    let moved = state.hangout.as_ref().map(|h| h.username.as_str())
        != Some(hangout.username.as_str());
    let messages = if moved { None } else { state.messages };
    let mut hangouts = state.hangouts;
    hangouts[index] = hangout.clone();
    EngineState {
        hangouts,
        hangout: Some(hangout),
        messages,
        pending: None,
        ..state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hangouts_shared::HangoutState;

    fn user(username: &str) -> User {
        User {
            username: username.to_string(),
            email: format!("{}@example.com", username),
        }
    }

    fn hangout(username: &str, state: HangoutState) -> Hangout {
        Hangout {
            username: username.to_string(),
            email: format!("{}@example.com", username),
            state,
            message: None,
        }
    }

    fn with_hangouts(hangouts: Vec<Hangout>) -> EngineState {
        reduce(EngineState::default(), Action::LoadedHangouts(hangouts))
    }

    #[test]
    fn test_selected_user_appends_draft_and_selects_it() {
        let state = reduce(EngineState::default(), Action::SelectedUser(user("alice")));

        assert_eq!(state.hangouts, vec![hangout("alice", HangoutState::Invite)]);
        assert_eq!(state.hangout, Some(hangout("alice", HangoutState::Invite)));
        assert_eq!(state.messages, Some(vec![]));
    }

    #[test]
    fn test_selected_user_does_not_duplicate_known_hangout() {
        let state = with_hangouts(vec![hangout("alice", HangoutState::Accepted)]);
        let state = reduce(state, Action::SelectedUser(user("alice")));

        assert_eq!(state.hangouts.len(), 1);
        assert_eq!(state.hangout.unwrap().state, HangoutState::Accepted);
    }

    #[test]
    fn test_state_change_replaces_instead_of_duplicating() {
        let state = reduce(EngineState::default(), Action::SelectedUser(user("bob")));
        let state = reduce(state, Action::SelectedUser(user("carol")));
        let before = state.hangouts.len();

        let accepted = hangout("bob", HangoutState::Accepted);
        let state = reduce(state, Action::HangoutStateChanged(accepted.clone()));

        assert_eq!(state.hangouts.len(), before);
        let matching: Vec<_> = state.hangouts.iter().filter(|h| h.username == "bob").collect();
        assert_eq!(matching, vec![&accepted]);
        assert_eq!(state.hangout, Some(accepted));
    }

    #[test]
    fn test_state_change_is_idempotent() {
        let state = with_hangouts(vec![hangout("bob", HangoutState::Invited)]);
        let action = Action::HangoutStateChanged(hangout("bob", HangoutState::Accepted));

        let once = reduce(state.clone(), action.clone());
        let twice = reduce(once.clone(), action);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_state_change_for_unknown_username_is_dropped() {
        let state = with_hangouts(vec![hangout("bob", HangoutState::Invited)]);
        let next = reduce(
            state.clone(),
            Action::HangoutStateChanged(hangout("zed", HangoutState::Accepted)),
        );
        assert_eq!(next, state);
    }

    #[test]
    fn test_state_change_clears_pending_command() {
        let state = with_hangouts(vec![hangout("bob", HangoutState::Inviter)]);
        let state = reduce(state, Action::CommandStarted(ClientCommand::Accept));
        assert!(state.loading);

        let state = reduce(
            state,
            Action::HangoutStateChanged(hangout("bob", HangoutState::Accepted)),
        );
        assert!(!state.loading);
        assert_eq!(state.pending, None);
    }

    #[test]
    fn test_selected_hangout_miss_is_not_found() {
        let state = with_hangouts(vec![hangout("bob", HangoutState::Invited)]);
        let state = reduce(
            state,
            Action::SelectedHangout {
                username: "bob".to_string(),
            },
        );
        assert!(state.hangout.is_some());

        let next = reduce(
            state.clone(),
            Action::SelectedHangout {
                username: "nobody".to_string(),
            },
        );
        assert_eq!(next.hangouts, state.hangouts);
        assert_eq!(next.hangout, None);
        assert_eq!(next.messages, None);
    }

    #[test]
    fn test_new_hangout_is_appended() {
        let state = with_hangouts(vec![hangout("bob", HangoutState::Accepted)]);
        let state = reduce(
            state,
            Action::NewHangoutReceived(hangout("dana", HangoutState::Inviter)),
        );
        assert_eq!(state.hangouts.len(), 2);
        assert_eq!(state.hangouts[1].username, "dana");
        assert_eq!(state.hangout, None);
    }

    #[test]
    fn test_saved_message_is_appended_at_the_end() {
        let first = Message {
            text: "one".to_string(),
            timestamp: 1,
            username: None,
        };
        let second = Message {
            text: "two".to_string(),
            timestamp: 2,
            username: None,
        };
        let state = reduce(
            EngineState::default(),
            Action::LoadedMessages(vec![first.clone()]),
        );
        let state = reduce(state, Action::SavedMessageLocally(second.clone()));
        assert_eq!(state.messages, Some(vec![first, second]));
    }

    #[test]
    fn test_fetch_success_merges_by_username() {
        let state = with_hangouts(vec![hangout("bob", HangoutState::Invited)]);
        let state = reduce(state, Action::FetchHangoutStarted { token: 7 });
        assert!(state.loading);

        let state = reduce(
            state,
            Action::FetchHangoutSuccess {
                token: 7,
                hangouts: vec![
                    hangout("bob", HangoutState::Accepter),
                    hangout("carol", HangoutState::Messaged),
                ],
            },
        );
        assert!(!state.loading);
        assert_eq!(state.hangouts.len(), 2);
        assert_eq!(state.hangouts[0].state, HangoutState::Accepter);
    }

    #[test]
    fn test_stale_fetch_result_is_discarded() {
        let state = reduce(EngineState::default(), Action::SearchChanged("al".to_string()));
        let state = reduce(state, Action::FetchUserStarted { token: 1 });
        let state = reduce(state, Action::SearchChanged("bo".to_string()));

        let next = reduce(
            state.clone(),
            Action::FetchUserSuccess {
                token: 1,
                users: vec![user("alice")],
            },
        );
        assert_eq!(next, state);
        assert!(next.users.is_empty());
    }

    #[test]
    fn test_fetch_failure_is_recorded() {
        let state = reduce(EngineState::default(), Action::FetchUserStarted { token: 3 });
        let state = reduce(
            state,
            Action::FetchUserFailed {
                token: 3,
                error: ApiError::Network("refused".to_string()),
            },
        );
        assert!(!state.loading);
        assert_eq!(
            state.error,
            Some(EngineError::Api(ApiError::Network("refused".to_string())))
        );
    }

    #[test]
    fn test_filter_keeps_matching_usernames() {
        let state = with_hangouts(vec![
            hangout("alice", HangoutState::Accepted),
            hangout("bob", HangoutState::Accepted),
            hangout("malik", HangoutState::Inviter),
        ]);
        let state = reduce(state, Action::SearchChanged("li".to_string()));
        let state = reduce(state, Action::FilterHangouts);

        let names: Vec<_> = state.hangouts.iter().map(|h| h.username.as_str()).collect();
        assert_eq!(names, vec!["alice", "malik"]);
    }

    #[test]
    fn test_failure_clears_pending_command() {
        let state = reduce(
            EngineState::default(),
            Action::CommandStarted(ClientCommand::Invite),
        );
        let state = reduce(state, Action::Failed(EngineError::NoSelection));
        assert!(!state.loading);
        assert_eq!(state.pending, None);
        assert_eq!(state.error, Some(EngineError::NoSelection));

        let state = reduce(state, Action::ClearError);
        assert_eq!(state.error, None);
    }

    #[test]
    fn test_new_search_clears_previous_users() {
        let state = reduce(EngineState::default(), Action::FetchUserStarted { token: 1 });
        let state = reduce(
            state,
            Action::FetchUserSuccess {
                token: 1,
                users: vec![user("alice")],
            },
        );
        assert_eq!(state.users, vec![user("alice")]);

        let state = reduce(state, Action::SearchChanged("bob".to_string()));
        let state = reduce(state, Action::FetchHangoutStarted { token: 2 });
        assert!(state.users.is_empty());

        let state = reduce(
            state,
            Action::FetchHangoutSuccess {
                token: 2,
                hangouts: vec![hangout("bob", HangoutState::Inviter)],
            },
        );
        assert!(state.users.is_empty());
        assert_eq!(state.hangouts.len(), 1);
    }

    #[test]
    fn test_peer_update_for_other_contact_drops_old_messages() {
        let state = with_hangouts(vec![
            hangout("bob", HangoutState::Accepted),
            hangout("carol", HangoutState::Accepted),
        ]);
        let state = reduce(
            state,
            Action::SelectedHangout {
                username: "bob".to_string(),
            },
        );
        let state = reduce(state, Action::LoadedMessages(vec![Message::now("for bob")]));

        let same = reduce(
            state.clone(),
            Action::HangoutStateChanged(hangout("bob", HangoutState::Messaged)),
        );
        assert_eq!(same.messages.map(|m| m.len()), Some(1));

        let moved = reduce(
            state,
            Action::HangoutStateChanged(hangout("carol", HangoutState::Messenger)),
        );
        assert_eq!(moved.hangout.unwrap().username, "carol");
        assert_eq!(moved.messages, None);
    }

    #[test]
    fn test_loading_follows_pending_command_and_fetch() {
        let state = with_hangouts(vec![
            hangout("bob", HangoutState::Inviter),
            hangout("carol", HangoutState::Inviter),
        ]);
        let state = reduce(state, Action::CommandStarted(ClientCommand::Accept));
        assert!(state.loading);

        // A new selection abandons the pending command.
        let state = reduce(
            state,
            Action::SelectedHangout {
                username: "carol".to_string(),
            },
        );
        assert_eq!(state.pending, None);
        assert!(!state.loading);

        // A peer update settles nothing about an in-flight fetch.
        let state = reduce(state, Action::FetchHangoutStarted { token: 4 });
        let state = reduce(
            state,
            Action::HangoutStateChanged(hangout("bob", HangoutState::Accepter)),
        );
        assert!(state.loading);

        let state = reduce(
            state,
            Action::FetchHangoutSuccess {
                token: 4,
                hangouts: vec![],
            },
        );
        assert!(!state.loading);
    }
}
