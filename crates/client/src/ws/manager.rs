//! Wires a [`WsConnection`] to a [`HangoutEngine`].

use std::sync::Arc;

use super::connection::{ReconnectConfig, WsConnection};
use crate::engine::HangoutEngine;

/// Open a connection to `url` and attach it to `engine`.
///
/// Inbound events are forwarded to the engine for as long as it is alive;
/// the handler reads the engine's current selection when each frame
/// arrives. Dropping the returned connection stops it.
pub fn connect(engine: &Arc<HangoutEngine>, url: impl Into<String>) -> WsConnection {
    connect_with_config(engine, url, ReconnectConfig::default())
}

pub fn connect_with_config(
    engine: &Arc<HangoutEngine>,
    url: impl Into<String>,
    reconnect_config: ReconnectConfig,
) -> WsConnection {
    let url = url.into();
    crate::log_info!("{}: connecting to {}", engine.username(), url);

    let weak = Arc::downgrade(engine);
    let connection = WsConnection::with_config(url, reconnect_config, move |event| {
        if let Some(engine) = weak.upgrade() {
            engine.handle_socket_event(event);
        }
    });

    engine.attach_socket(Arc::new(connection.handle()));
    connection
}
