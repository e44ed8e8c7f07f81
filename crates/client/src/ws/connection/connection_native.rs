//! Native/Desktop WebSocket implementation using tokio-tungstenite.

use futures_channel::mpsc::{unbounded, UnboundedReceiver, UnboundedSender};
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio_tungstenite::{connect_async, tungstenite::Message};

use super::{ReconnectConfig, SocketEvent, WsHandle};

type EventHandler = Arc<dyn Fn(SocketEvent) + Send + Sync>;

/// A managed WebSocket connection to the hangouts server (Native implementation)
///
/// The connection loop runs on the current tokio runtime and stops when the
/// connection is dropped.
pub struct WsConnection {
    pub url: String,
    /// Channel for outbound frames
    sender: UnboundedSender<String>,
    task: tokio::task::JoinHandle<()>,
}

impl WsConnection {
    /// Create a new WebSocket connection with the default reconnect policy.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(url: String, on_event: impl Fn(SocketEvent) + Send + Sync + 'static) -> Self {
        Self::with_config(url, ReconnectConfig::default(), on_event)
    }

    pub fn with_config(
        url: String,
        reconnect_config: ReconnectConfig,
        on_event: impl Fn(SocketEvent) + Send + Sync + 'static,
    ) -> Self {
        let (sender, receiver) = unbounded();
        let task = start_connection_loop(url.clone(), receiver, Arc::new(on_event), reconnect_config);
        Self { url, sender, task }
    }

    /// Get a handle for sending frames
    pub fn handle(&self) -> WsHandle {
        WsHandle::new(self.sender.clone(), self.url.clone())
    }
}

impl Drop for WsConnection {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Start the connection management loop in a background tokio task
fn start_connection_loop(
    url: String,
    receiver: UnboundedReceiver<String>,
    on_event: EventHandler,
    reconnect_config: ReconnectConfig,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        // Wrap receiver in a mutex for sharing between connection attempts
        let receiver = Arc::new(tokio::sync::Mutex::new(receiver));
        let mut attempt = 0u32;

        loop {
            if attempt == 0 {
                on_event(SocketEvent::Connecting);
            } else {
                on_event(SocketEvent::Reconnecting { attempt });
            }

            match connect_async(url.as_str()).await {
                Ok((ws_stream, _response)) => {
                    attempt = 0;
                    crate::log_info!("WebSocket connected to {}", url);
                    on_event(SocketEvent::Open);

                    let (mut write, mut read) = ws_stream.split();

                    // Channel to signal when connection closes
                    let (close_tx, mut close_rx) = tokio::sync::mpsc::unbounded_channel::<()>();

                    // Spawn read task
                    let url_for_read = url.clone();
                    let on_event_for_read = on_event.clone();
                    let close_tx_for_read = close_tx.clone();
                    let read_task = tokio::spawn(async move {
                        while let Some(msg_result) = read.next().await {
                            match msg_result {
                                Ok(Message::Text(text)) => {
                                    crate::log_debug!("WebSocket received: {}", text);
                                    on_event_for_read(SocketEvent::Message(text.as_str().to_owned()));
                                }
                                Ok(Message::Close(_)) => {
                                    crate::log_info!(
                                        "WebSocket to {} received close frame",
                                        url_for_read
                                    );
                                    break;
                                }
                                Ok(_) => {
                                    // Ping/pong is handled by tungstenite; binary is not part of the protocol
                                }
                                Err(e) => {
                                    crate::log_error!("WebSocket read error: {}", e);
                                    on_event_for_read(SocketEvent::Error(e.to_string()));
                                    break;
                                }
                            }
                        }
                        let _ = close_tx_for_read.send(());
                    });

                    // Spawn write task
                    let receiver_for_write = receiver.clone();
                    let on_event_for_write = on_event.clone();
                    let write_task = tokio::spawn(async move {
                        loop {
                            let frame = {
                                let mut rx = receiver_for_write.lock().await;
                                rx.next().await
                            };

                            match frame {
                                Some(json) => {
                                    if let Err(e) = write.send(Message::text(json)).await {
                                        crate::log_error!("Send failed: {}", e);
                                        on_event_for_write(SocketEvent::Error(e.to_string()));
                                        break;
                                    }
                                }
                                None => {
                                    // Sender dropped
                                    crate::log_info!("Sender dropped, stopping write task");
                                    break;
                                }
                            }
                        }
                        let _ = close_tx.send(());
                    });

                    // Wait for either side to finish
                    close_rx.recv().await;
                    read_task.abort();
                    write_task.abort();
                    crate::log_info!("WebSocket to {} closed", url);
                    on_event(SocketEvent::Closed);
                }
                Err(e) => {
                    crate::log_error!("WebSocket error for {}: {}", url, e);
                    on_event(SocketEvent::Error(e.to_string()));

                    if reconnect_config.max_attempts > 0 && attempt >= reconnect_config.max_attempts
                    {
                        on_event(SocketEvent::Failed {
                            reason: format!(
                                "Max reconnect attempts ({}) exceeded",
                                reconnect_config.max_attempts
                            ),
                        });
                        break;
                    }

                    let delay = reconnect_config.delay_for_attempt(attempt);
                    crate::log_info!(
                        "Reconnecting to {} in {}ms (attempt {})",
                        url,
                        delay,
                        attempt + 1
                    );
                    tokio::time::sleep(tokio::time::Duration::from_millis(delay as u64)).await;
                    attempt += 1;
                }
            }
        }
    })
}
