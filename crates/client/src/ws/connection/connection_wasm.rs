//! WASM/Web-specific WebSocket implementation using web_sys::WebSocket.

use std::cell::RefCell;
use std::rc::Rc;

use futures_channel::mpsc::{unbounded, UnboundedReceiver, UnboundedSender};
use futures_util::StreamExt;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::spawn_local;
use web_sys::{js_sys, CloseEvent, MessageEvent, WebSocket};

use super::{pump_frames, ReconnectConfig, SocketEvent, WsHandle};

type EventHandler = Rc<dyn Fn(SocketEvent)>;

/// A managed WebSocket connection to the hangouts server (WASM implementation)
pub struct WsConnection {
    pub url: String,
    /// Channel for outbound frames
    sender: UnboundedSender<String>,
}

impl WsConnection {
    /// Create a new WebSocket connection with the default reconnect policy.
    pub fn new(url: String, on_event: impl Fn(SocketEvent) + 'static) -> Self {
        Self::with_config(url, ReconnectConfig::default(), on_event)
    }

    pub fn with_config(
        url: String,
        reconnect_config: ReconnectConfig,
        on_event: impl Fn(SocketEvent) + 'static,
    ) -> Self {
        let (sender, receiver) = unbounded();
        start_connection_loop(url.clone(), receiver, Rc::new(on_event), reconnect_config);
        Self { url, sender }
    }

    /// Get a handle for sending frames
    pub fn handle(&self) -> WsHandle {
        WsHandle::new(self.sender.clone(), self.url.clone())
    }
}

/// Start the connection management loop
fn start_connection_loop(
    url: String,
    receiver: UnboundedReceiver<String>,
    on_event: EventHandler,
    reconnect_config: ReconnectConfig,
) {
    spawn_local(async move {
        let mut receiver = receiver;
        let mut attempt = 0u32;

        loop {
            if attempt == 0 {
                on_event(SocketEvent::Connecting);
            } else {
                on_event(SocketEvent::Reconnecting { attempt });
            }

            match connect_websocket(&url, on_event.clone()).await {
                Ok(ws) => {
                    attempt = 0;
                    crate::log_info!("WebSocket connected to {}", url);
                    on_event(SocketEvent::Open);

                    // Channel to signal when connection closes
                    let (close_tx, mut close_rx) = unbounded::<()>();

                    let onclose_callback = Closure::wrap(Box::new(move |_: CloseEvent| {
                        let _ = close_tx.unbounded_send(());
                    }) as Box<dyn FnMut(CloseEvent)>);
                    ws.set_onclose(Some(onclose_callback.as_ref().unchecked_ref()));
                    onclose_callback.forget();

                    let open = pump_frames(&mut receiver, close_rx.next(), |json| {
                        if let Err(e) = ws.send_with_str(&json) {
                            crate::log_error!("Send failed: {:?}", e);
                            on_event(SocketEvent::Error(format!("{:?}", e)));
                        }
                    })
                    .await;
                    if !open {
                        crate::log_info!("Sender dropped, closing WebSocket to {}", url);
                        let _ = ws.close();
                        break;
                    }
                    crate::log_info!("WebSocket to {} closed", url);
                    on_event(SocketEvent::Closed);
                }
                Err(reason) => {
                    crate::log_error!("WebSocket error for {}: {}", url, reason);
                    on_event(SocketEvent::Error(reason));

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
                    gloo_timers::future::TimeoutFuture::new(delay).await;
                    attempt += 1;
                }
            }
        }
    });
}

/// Open a socket and wait until it is ready.
async fn connect_websocket(url: &str, on_event: EventHandler) -> Result<WebSocket, String> {
    let ws = WebSocket::new(url).map_err(|e| format!("Failed to create WebSocket: {:?}", e))?;

    let is_open = Rc::new(RefCell::new(false));
    let error_reason = Rc::new(RefCell::new(None::<String>));

    let is_open_clone = is_open.clone();
    let onopen_callback = Closure::wrap(Box::new(move |_: web_sys::Event| {
        *is_open_clone.borrow_mut() = true;
    }) as Box<dyn FnMut(web_sys::Event)>);
    ws.set_onopen(Some(onopen_callback.as_ref().unchecked_ref()));
    onopen_callback.forget();

    let error_reason_close = error_reason.clone();
    let onclose_callback = Closure::wrap(Box::new(move |e: CloseEvent| {
        let reason = if e.reason().is_empty() {
            format!("Code {}", e.code())
        } else {
            e.reason()
        };
        *error_reason_close.borrow_mut() = Some(reason);
    }) as Box<dyn FnMut(CloseEvent)>);
    ws.set_onclose(Some(onclose_callback.as_ref().unchecked_ref()));
    onclose_callback.forget();

    let error_reason_err = error_reason.clone();
    let on_event_for_error = on_event.clone();
    let onerror_callback = Closure::wrap(Box::new(move |_: web_sys::ErrorEvent| {
        *error_reason_err.borrow_mut() = Some("WebSocket error".to_string());
        on_event_for_error(SocketEvent::Error("WebSocket error".to_string()));
    }) as Box<dyn FnMut(web_sys::ErrorEvent)>);
    ws.set_onerror(Some(onerror_callback.as_ref().unchecked_ref()));
    onerror_callback.forget();

    let onmessage_callback = Closure::wrap(Box::new(move |e: MessageEvent| {
        if let Ok(text) = e.data().dyn_into::<js_sys::JsString>() {
            let text: String = text.into();
            crate::log_debug!("WebSocket received: {}", text);
            on_event(SocketEvent::Message(text));
        }
    }) as Box<dyn FnMut(MessageEvent)>);
    ws.set_onmessage(Some(onmessage_callback.as_ref().unchecked_ref()));
    onmessage_callback.forget();

    // 5 second timeout
    for _ in 0..500 {
        if *is_open.borrow() {
            return Ok(ws);
        }
        if let Some(reason) = error_reason.borrow().clone() {
            return Err(reason);
        }
        gloo_timers::future::TimeoutFuture::new(10).await;
    }

    Err("Connection timeout".to_string())
}
