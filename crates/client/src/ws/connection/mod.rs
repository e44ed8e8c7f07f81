//! WebSocket connection with state management and auto-reconnect.
//!
//! This module provides the shared types and conditionally includes
//! the platform-specific implementation.

use std::future::Future;

use futures_channel::mpsc::{UnboundedReceiver, UnboundedSender};
use futures_util::future::{select, Either};
use futures_util::StreamExt;

use crate::error::SocketError;

/// Connection state for a WebSocket
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Reconnecting { attempt: u32 },
    Failed { reason: String },
}

impl ConnectionState {
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionState::Connected)
    }

    pub fn is_connecting(&self) -> bool {
        matches!(
            self,
            ConnectionState::Connecting | ConnectionState::Reconnecting { .. }
        )
    }
}

/// Lifecycle and data events delivered to the connection's handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SocketEvent {
    Connecting,
    Open,
    /// A text frame, still unparsed.
    Message(String),
    Closed,
    Error(String),
    Reconnecting { attempt: u32 },
    Failed { reason: String },
}

/// Configuration for auto-reconnect behavior
#[derive(Debug, Clone)]
pub struct ReconnectConfig {
    /// Maximum number of reconnect attempts (0 = infinite)
    pub max_attempts: u32,
    /// Initial delay in milliseconds
    pub initial_delay_ms: u32,
    /// Maximum delay in milliseconds
    pub max_delay_ms: u32,
    /// Multiplier for exponential backoff
    pub backoff_multiplier: f32,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            initial_delay_ms: 1000,
            max_delay_ms: 30000,
            backoff_multiplier: 1.5,
        }
    }
}

impl ReconnectConfig {
    /// Calculate delay for a given attempt number
    pub fn delay_for_attempt(&self, attempt: u32) -> u32 {
        let delay = self.initial_delay_ms as f32 * self.backoff_multiplier.powi(attempt as i32);
        (delay as u32).min(self.max_delay_ms)
    }
}

/// Outbound side of the socket as seen by the engine.
#[cfg_attr(test, mockall::automock)]
pub trait CommandSink: Send + Sync {
    /// Queue one serialized frame.
    fn send(&self, json: String) -> Result<(), SocketError>;
}

/// Handle for sending frames through a WebSocket connection
#[derive(Clone)]
pub struct WsHandle {
    sender: UnboundedSender<String>,
    pub url: String,
}

impl WsHandle {
    pub(crate) fn new(sender: UnboundedSender<String>, url: String) -> Self {
        Self { sender, url }
    }

    /// Whether the connection behind this handle has shut down for good.
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

impl CommandSink for WsHandle {
    fn send(&self, json: String) -> Result<(), SocketError> {
        crate::log_debug!("WsHandle::send to '{}': {}", self.url, json);
        self.sender.unbounded_send(json).map_err(|e| {
            if e.is_disconnected() {
                SocketError::NotConnected
            } else {
                SocketError::SendFailed(e.to_string())
            }
        })
    }
}

/// Forward frames from `receiver` through `send` until `closed` resolves.
///
/// Frames still queued when `closed` fires stay in `receiver` for the next
/// connection. Returns `false` once every sender is gone.
#[cfg_attr(not(target_arch = "wasm32"), allow(dead_code))]
pub(crate) async fn pump_frames<C>(
    receiver: &mut UnboundedReceiver<String>,
    closed: C,
    mut send: impl FnMut(String),
) -> bool
where
    C: Future + Unpin,
{
    let mut closed = closed;
    loop {
        match select(&mut closed, receiver.next()).await {
            Either::Left(_) => return true,
            Either::Right((Some(json), _)) => send(json),
            Either::Right((None, _)) => return false,
        }
    }
}

// Include platform-specific implementation
#[cfg(target_arch = "wasm32")]
mod connection_wasm;
#[cfg(target_arch = "wasm32")]
pub use connection_wasm::WsConnection;

#[cfg(not(target_arch = "wasm32"))]
mod connection_native;
#[cfg(not(target_arch = "wasm32"))]
pub use connection_native::WsConnection;
