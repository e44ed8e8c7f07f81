//! Hangouts client engine.
//!
//! Keeps the relationship state with every contact consistent between the
//! realtime socket, in-memory UI state and durable client-side storage.
//!
//! ```rust,ignore
//! let config = EngineConfig::from_env();
//! let engine = Arc::new(HangoutEngine::from_config("me", &config)?);
//! engine.hydrate();
//! let _connection = ws::connect(&engine, config.ws_url.clone());
//!
//! engine.set_search("alice");
//! engine.search().await;
//! ```

pub mod logging;

pub mod api_client;
pub mod config;
pub mod encoder;
pub mod engine;
pub mod error;
pub mod persistence;
pub mod reducer;
pub mod router;
pub mod storage;
pub mod ws;

#[cfg(feature = "ui")]
pub mod hooks;

pub use api_client::{ApiClient, Directory};
pub use config::EngineConfig;
pub use engine::HangoutEngine;
pub use error::{EngineError, SocketError, StorageError};
pub use reducer::{Action, EngineState};
pub use storage::{KeyValueStore, LocalStore, MemoryStore};
