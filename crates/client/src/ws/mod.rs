//! WebSocket channel between the engine and the hangouts server.
//!
//! # Architecture
//!
//! ```text
//!   HangoutEngine ── CommandSink::send(json) ──▶ WsHandle ──▶ WsConnection ──▶ server
//!        ▲                                                        │
//!        └──────────── handle_socket_event(SocketEvent) ◀─────────┘
//! ```
//!
//! The connection owns the socket lifecycle (connect, reconnect with
//! backoff, close). It never looks inside frames; routing them is the
//! engine's job.

mod connection;
mod manager;

pub use connection::{
    CommandSink, ConnectionState, ReconnectConfig, SocketEvent, WsConnection, WsHandle,
};
#[cfg(test)]
pub use connection::MockCommandSink;

pub use manager::{connect, connect_with_config};
