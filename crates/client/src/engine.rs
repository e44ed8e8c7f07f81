//! The hangout engine: wires socket, reducer, persistence and encoder.
//!
//! The UI talks to the engine through two seams: intent methods
//! (`select_user`, `on_invite`, `search`, ...) and a state subscription.
//! Inbound socket events arrive through [`HangoutEngine::handle_socket_event`].

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures_channel::mpsc::{unbounded, UnboundedReceiver, UnboundedSender};
use hangouts_shared::{ClientCommand, Hangout, HangoutState, User};

use crate::api_client::{ApiClient, Directory};
use crate::config::EngineConfig;
use crate::encoder::encode;
use crate::error::{EngineError, SocketError, StorageError};
use crate::persistence::HangoutStore;
use crate::reducer::{reduce, Action, EngineState};
use crate::router;
use crate::storage::{KeyValueStore, LocalStore};
use crate::ws::{CommandSink, ConnectionState, SocketEvent};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Owns the [`EngineState`] of one signed-in user.
pub struct HangoutEngine {
    username: String,
    store: HangoutStore,
    directory: Arc<dyn Directory>,
    state: Mutex<EngineState>,
    socket: Mutex<Option<Arc<dyn CommandSink>>>,
    listeners: Mutex<Vec<UnboundedSender<EngineState>>>,
    /// Serializes inbound frames so each read-modify-write of the store completes
    /// before the next frame is classified.
    routing: Mutex<()>,
    next_token: AtomicU64,
}

impl HangoutEngine {
    pub fn new(
        username: impl Into<String>,
        store: Arc<dyn KeyValueStore>,
        directory: Arc<dyn Directory>,
    ) -> Self {
        let username = username.into();
        Self {
            store: HangoutStore::new(username.clone(), store),
            username,
            directory,
            state: Mutex::new(EngineState::default()),
            socket: Mutex::new(None),
            listeners: Mutex::new(Vec::new()),
            routing: Mutex::new(()),
            next_token: AtomicU64::new(1),
        }
    }

    /// Engine backed by platform storage and the HTTP directory.
    pub fn from_config(
        username: impl Into<String>,
        config: &EngineConfig,
    ) -> Result<Self, StorageError> {
        #[cfg(not(target_arch = "wasm32"))]
        let store = match &config.storage_dir {
            Some(dir) => LocalStore::in_dir(dir)?,
            None => LocalStore::new()?,
        };
        #[cfg(target_arch = "wasm32")]
        let store = LocalStore::new()?;

        let directory = ApiClient::new().with_base_url(config.api_url.as_str());
        Ok(Self::new(username, Arc::new(store), Arc::new(directory)))
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    /// Load the persisted hangout list into state. Call once per session.
    pub fn hydrate(&self) {
        match self.store.load_hangouts() {
            Ok(hangouts) => {
                crate::log_info!(
                    "{}: hydrated {} hangouts",
                    self.username,
                    hangouts.len()
                );
                self.dispatch(Action::LoadedHangouts(hangouts));
            }
            Err(e) => self.fail(e.into()),
        }
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> EngineState {
        lock(&self.state).clone()
    }

    /// Receive every new state. The current state is delivered first.
    pub fn subscribe(&self) -> UnboundedReceiver<EngineState> {
        let (tx, rx) = unbounded();
        let state = lock(&self.state);
        let _ = tx.unbounded_send(state.clone());
        lock(&self.listeners).push(tx);
        rx
    }

    /// Apply an action and notify subscribers. Returns the new state.
    pub fn dispatch(&self, action: Action) -> EngineState {
        let mut state = lock(&self.state);
        let next = reduce(std::mem::take(&mut *state), action);
        *state = next.clone();

        lock(&self.listeners).retain(|tx| tx.unbounded_send(next.clone()).is_ok());
        next
    }

    // --- local UI intents ---

    pub fn set_search(&self, search: impl Into<String>) {
        self.dispatch(Action::SearchChanged(search.into()));
    }

    pub fn set_message_text(&self, text: impl Into<String>) {
        self.dispatch(Action::MessageTextChanged(text.into()));
    }

    pub fn clear_error(&self) {
        self.dispatch(Action::ClearError);
    }

    /// Promote a search result into a draft hangout, persist it and select it.
    pub fn select_user(&self, user: User) {
        let state = self.dispatch(Action::SelectedUser(user));
        let Some(hangout) = state.hangout else {
            return;
        };
        if hangout.state == HangoutState::Invite {
            if let Err(e) = self.store.upsert(hangout.clone()) {
                self.fail(e.into());
                return;
            }
        }
        self.load_messages(&hangout.username);
    }

    /// Select a hangout by username and load its message log.
    ///
    /// Returns the selection, or `None` if no hangout has that username.
    pub fn select_hangout(&self, username: &str) -> Option<Hangout> {
        let state = self.dispatch(Action::SelectedHangout {
            username: username.to_string(),
        });
        match state.hangout {
            Some(hangout) => {
                self.load_messages(&hangout.username);
                Some(hangout)
            }
            None => {
                crate::log_debug!("{}: no hangout with {}", self.username, username);
                None
            }
        }
    }

    /// Narrow `hangouts` to usernames containing the search text.
    pub fn filter_hangouts(&self) {
        self.dispatch(Action::FilterHangouts);
    }

    /// Undo [`filter_hangouts`](Self::filter_hangouts) from the durable list.
    pub fn clear_filter(&self) {
        self.hydrate();
    }

    // --- directory search ---

    /// Search the server for hangouts matching the current search text, and
    /// for users when no hangout matches.
    ///
    /// Results that arrive after the search text changed are dropped.
    pub async fn search(&self) {
        let search = self.state().search;
        let token = self.issue_token();
        self.dispatch(Action::FetchHangoutStarted { token });

        let result = self.directory.find_hangouts(&search, &self.username).await;
        if !self.is_current(token) {
            crate::log_debug!("{}: dropping stale hangout search '{}'", self.username, search);
            return;
        }

        match result {
            Ok(hangouts) if hangouts.is_empty() => {
                self.dispatch(Action::FetchHangoutSuccess { token, hangouts });
                self.search_users(search).await;
            }
            Ok(hangouts) => {
                self.remember(&hangouts);
                self.dispatch(Action::FetchHangoutSuccess { token, hangouts });
            }
            Err(error) => {
                crate::log_warn!("{}: hangout search failed: {}", self.username, error);
                self.dispatch(Action::FetchHangoutFailed { token, error });
            }
        }
    }

    async fn search_users(&self, search: String) {
        let token = self.issue_token();
        self.dispatch(Action::FetchUserStarted { token });

        match self.directory.find_users(&search).await {
            Ok(users) => {
                self.dispatch(Action::FetchUserSuccess { token, users });
            }
            Err(error) => {
                crate::log_warn!("{}: user search failed: {}", self.username, error);
                self.dispatch(Action::FetchUserFailed { token, error });
            }
        }
    }

    /// Write fetched hangouts through the store so inbound frames and
    /// [`clear_filter`](Self::clear_filter) see them.
    fn remember(&self, found: &[Hangout]) {
        let result = self.store.update(|list| {
            for hangout in found {
                match list.iter_mut().find(|h| h.username == hangout.username) {
                    Some(existing) => *existing = hangout.clone(),
                    None => list.push(hangout.clone()),
                }
            }
        });
        if let Err(e) = result {
            crate::log_error!("{}: could not persist search results: {}", self.username, e);
        }
    }

    fn issue_token(&self) -> u64 {
        self.next_token.fetch_add(1, Ordering::Relaxed)
    }

    fn is_current(&self, token: u64) -> bool {
        lock(&self.state).request == Some(token)
    }

    // --- commands ---

    pub fn on_invite(&self) -> Result<(), EngineError> {
        self.send_command(ClientCommand::Invite)
    }

    pub fn on_accept(&self) -> Result<(), EngineError> {
        self.send_command(ClientCommand::Accept)
    }

    pub fn on_decline(&self) -> Result<(), EngineError> {
        self.send_command(ClientCommand::Decline)
    }

    pub fn on_block(&self) -> Result<(), EngineError> {
        self.send_command(ClientCommand::Block)
    }

    pub fn on_unblock(&self) -> Result<(), EngineError> {
        self.send_command(ClientCommand::Unblock)
    }

    /// Send the composed text to the selection. The message is logged locally
    /// as soon as it is queued.
    pub fn on_message(&self) -> Result<(), EngineError> {
        self.send_command(ClientCommand::Message)
    }

    /// Encode `command` for the selection and queue it on the socket.
    ///
    /// Failures are recorded in state as well as returned.
    pub fn send_command(&self, command: ClientCommand) -> Result<(), EngineError> {
        let result = self.try_send(command);
        if let Err(e) = &result {
            crate::log_warn!("{}: {} not sent: {}", self.username, command, e);
            self.dispatch(Action::Failed(e.clone()));
        }
        result
    }

    fn try_send(&self, command: ClientCommand) -> Result<(), EngineError> {
        let state = self.state();
        let hangout = state.hangout.as_ref().ok_or(EngineError::NoSelection)?;
        let frame = encode(command, hangout, &state.message_text, &self.username)?;
        let json = frame.to_json()?;
        let socket = lock(&self.socket)
            .clone()
            .ok_or(SocketError::NotConnected)?;

        self.dispatch(Action::CommandStarted(command));
        socket.send(json)?;
        crate::log_info!("{}: sent {} to {}", self.username, command, hangout.username);

        match (command, frame.message) {
            (ClientCommand::Message, Some(message)) => {
                // Local log is best-effort and independent of the server.
                if let Err(e) = self.store.append_message(&hangout.username, message.clone()) {
                    crate::log_error!("{}: failed to log message: {}", self.username, e);
                }
                self.dispatch(Action::SavedMessageLocally(message));
                self.dispatch(Action::MessageTextChanged(String::new()));
            }
            (ClientCommand::Invite, _) => {
                self.dispatch(Action::MessageTextChanged(String::new()));
            }
            _ => {}
        }
        Ok(())
    }

    // --- socket glue ---

    /// Use `socket` for outbound commands.
    pub fn attach_socket(&self, socket: Arc<dyn CommandSink>) {
        *lock(&self.socket) = Some(socket);
    }

    pub fn detach_socket(&self) {
        *lock(&self.socket) = None;
        self.dispatch(Action::ConnectionChanged(ConnectionState::Disconnected));
    }

    /// Entry point for everything the socket reports.
    pub fn handle_socket_event(&self, event: SocketEvent) {
        let connection = match event {
            SocketEvent::Message(raw) => {
                self.handle_frame(&raw);
                return;
            }
            SocketEvent::Error(reason) => {
                crate::log_warn!("{}: socket error: {}", self.username, reason);
                return;
            }
            SocketEvent::Connecting => ConnectionState::Connecting,
            SocketEvent::Open => ConnectionState::Connected,
            SocketEvent::Closed => ConnectionState::Disconnected,
            SocketEvent::Reconnecting { attempt } => ConnectionState::Reconnecting { attempt },
            SocketEvent::Failed { reason } => ConnectionState::Failed { reason },
        };
        self.dispatch(Action::ConnectionChanged(connection));
    }

    fn handle_frame(&self, raw: &str) {
        let _routing = lock(&self.routing);
        let before = self.selected_username();

        let actions = match router::route(raw, before.as_deref(), &self.store) {
            Ok(actions) => actions,
            Err(e) => {
                crate::log_warn!("{}: ignoring inbound frame: {}", self.username, e);
                self.fail(e);
                return;
            }
        };
        for action in actions {
            self.dispatch(action);
        }

        let after = self.selected_username();
        if after != before {
            if let Some(username) = after {
                self.load_messages(&username);
            }
        }
    }

    fn selected_username(&self) -> Option<String> {
        lock(&self.state).hangout.as_ref().map(|h| h.username.clone())
    }

    fn load_messages(&self, contact: &str) {
        match self.store.load_messages(contact) {
            Ok(messages) => {
                self.dispatch(Action::LoadedMessages(messages));
            }
            Err(e) => self.fail(e.into()),
        }
    }

    fn fail(&self, error: EngineError) {
        crate::log_error!("{}: {}", self.username, error);
        self.dispatch(Action::Failed(error));
    }
}
