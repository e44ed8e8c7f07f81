//! Dioxus bindings for the engine.
//!
//! Components read [`EngineState`] from a signal and call intent methods on
//! the engine; they never touch the socket or storage directly.
//!
//! ```rust,ignore
//! #[component]
//! fn Hangouts() -> Element {
//!     let engine = use_engine();
//!     let state = use_hangouts(engine.clone());
//!     rsx! {
//!         for hangout in state.read().hangouts.iter() {
//!             div { "{hangout.username}" }
//!         }
//!     }
//! }
//! ```

use std::sync::Arc;

use dioxus::prelude::*;
use futures_util::StreamExt;

use crate::engine::HangoutEngine;
use crate::reducer::EngineState;

/// Make `engine` available to every descendant component.
pub fn provide_engine(engine: Arc<HangoutEngine>) -> Arc<HangoutEngine> {
    use_context_provider(|| engine)
}

/// The engine provided by an ancestor.
pub fn use_engine() -> Arc<HangoutEngine> {
    use_context::<Arc<HangoutEngine>>()
}

/// A signal that follows the engine's state.
pub fn use_hangouts(engine: Arc<HangoutEngine>) -> Signal<EngineState> {
    let mut state = use_signal(|| engine.state());
    use_hook(move || {
        let mut updates = engine.subscribe();
        spawn(async move {
            while let Some(next) = updates.next().await {
                state.set(next);
            }
        });
    });
    state
}
