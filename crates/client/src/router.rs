//! Turns inbound socket frames into reducer actions.
//!
//! Every frame is classified by category (derived from the state family when
//! the server omits it):
//! - `ACKNOWLEDGEMENT` confirms a command the local user sent and may only
//!   update a hangout that already exists.
//! - `PEER` is the counterpart acting and inserts the hangout when it is new.
//!
//! Routing writes the resulting hangout through to the [`HangoutStore`]
//! before returning the actions, so the durable copy never lags behind what
//! the UI shows.

use hangouts_shared::{HangoutState, InboundMessage, MessageCategory};

use crate::error::EngineError;
use crate::persistence::HangoutStore;
use crate::reducer::Action;

/// Route one raw frame.
///
/// `selection` is the username of the currently selected hangout.
pub fn route(
    raw: &str,
    selection: Option<&str>,
    store: &HangoutStore,
) -> Result<Vec<Action>, EngineError> {
    let inbound = InboundMessage::parse(raw)?;
    let category = inbound.classify()?;
    let hangout = inbound.hangout();

    let known = store
        .load_hangouts()?
        .iter()
        .any(|h| h.username == hangout.username);

    let mut actions = Vec::with_capacity(2);
    match (category, known) {
        (_, true) => actions.push(Action::HangoutStateChanged(hangout.clone())),
        (MessageCategory::Peer, false) => {
            actions.push(Action::NewHangoutReceived(hangout.clone()))
        }
        (MessageCategory::Acknowledgement, false) => {
            return Err(EngineError::UnknownHangout(hangout.username));
        }
    }

    crate::log_debug!(
        "{} routed {:?} {} for {}",
        store.username(),
        category,
        hangout.state,
        hangout.username
    );
    store.upsert(hangout.clone())?;

    // Our own messages were logged when they were sent.
    if hangout.state == HangoutState::Messenger {
        if let Some(message) = hangout.message {
            let message = match message.username {
                Some(_) => message,
                None => message.with_author(hangout.username.as_str()),
            };
            store.append_message(&hangout.username, message.clone())?;
            if selection == Some(hangout.username.as_str()) {
                actions.push(Action::SavedMessageLocally(message));
            }
        }
    }

    Ok(actions)
}
