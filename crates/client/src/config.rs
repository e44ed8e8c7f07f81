//! Client configuration from environment variables.

use url::Url;

const DEFAULT_API_URL: &str = "http://localhost:3000";
const WS_PATH: &str = "/hangouts";

/// Where the engine talks to and where it keeps its data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Base URL of the directory endpoints.
    pub api_url: String,
    /// WebSocket endpoint.
    pub ws_url: String,
    /// Override for the native storage directory.
    pub storage_dir: Option<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::from_api_url(DEFAULT_API_URL, None)
    }
}

impl EngineConfig {
    /// Parse configuration from environment variables.
    ///
    /// Environment variables:
    /// - `HANGOUTS_API_URL`: base URL of the HTTP API (default: "http://localhost:3000")
    /// - `HANGOUTS_WS_URL`: socket URL (default: the API URL with a ws/wss scheme and path "/hangouts")
    /// - `HANGOUTS_STORAGE_DIR`: directory for stored data on desktop (default: platform config dir)
    pub fn from_env() -> Self {
        let api_url =
            std::env::var("HANGOUTS_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string());
        let ws_url = std::env::var("HANGOUTS_WS_URL").ok();
        let mut config = Self::from_api_url(&api_url, ws_url);
        config.storage_dir = std::env::var("HANGOUTS_STORAGE_DIR").ok();
        config
    }

    fn from_api_url(api_url: &str, ws_url: Option<String>) -> Self {
        let ws_url = ws_url.unwrap_or_else(|| derive_ws_url(api_url));
        Self {
            api_url: api_url.to_string(),
            ws_url,
            storage_dir: None,
        }
    }
}

/// `http://host:port/...` → `ws://host:port/hangouts`, `https` → `wss`.
fn derive_ws_url(api_url: &str) -> String {
    let Ok(mut url) = Url::parse(api_url) else {
        return format!("ws://localhost:3000{}", WS_PATH);
    };
    let scheme = if url.scheme() == "https" { "wss" } else { "ws" };
    // Switching between special schemes is always accepted.
    let _ = url.set_scheme(scheme);
    url.set_path(WS_PATH);
    url.set_query(None);
    url.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.api_url, "http://localhost:3000");
        assert_eq!(config.ws_url, "ws://localhost:3000/hangouts");
        assert_eq!(config.storage_dir, None);
    }

    #[test]
    fn test_ws_url_follows_tls() {
        assert_eq!(
            derive_ws_url("https://chat.example.com/api?x=1"),
            "wss://chat.example.com/hangouts"
        );
    }

    #[test]
    fn test_explicit_ws_url_wins() {
        let config =
            EngineConfig::from_api_url("http://a.test", Some("ws://b.test/socket".to_string()));
        assert_eq!(config.ws_url, "ws://b.test/socket");
    }
}
