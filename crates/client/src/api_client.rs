//! HTTP client for the hangouts directory endpoints.

use async_trait::async_trait;
use hangouts_shared::{ApiError, FindHangoutsResponse, FindUsersResponse, Hangout, User};
use reqwest::Client;
use serde::de::DeserializeOwned;

/// Server-side search used by the engine.
#[cfg_attr(test, mockall::automock)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
pub trait Directory: Send + Sync {
    /// Hangouts of `username` matching `search`.
    async fn find_hangouts(&self, search: &str, username: &str) -> Result<Vec<Hangout>, ApiError>;
    /// Users matching `search`.
    async fn find_users(&self, search: &str) -> Result<Vec<User>, ApiError>;
}

#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
            base_url: String::new(),
        }
    }

    /// Set the base URL for API requests
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        if self.base_url.is_empty() {
            if path.starts_with('/') {
                path.to_string()
            } else {
                format!("/{path}")
            }
        } else {
            let base = self.base_url.trim_end_matches('/');
            let path = path.trim_start_matches('/');
            format!("{base}/{path}")
        }
    }

    pub async fn get_json<TRes: DeserializeOwned>(&self, path: &str) -> Result<TRes, ApiError> {
        let url = self.url(path);
        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;

        let status = resp.status().as_u16();
        let is_success = resp.status().is_success();

        let text = resp
            .text()
            .await
            .map_err(|e| ApiError::Network(format!("failed to read body: {e}")))?;

        if !is_success {
            return Err(ApiError::Http { status, body: text });
        }

        serde_json::from_str(&text).map_err(|e| ApiError::Deserialize(e.to_string()))
    }
}

impl Default for ApiClient {
    fn default() -> Self {
        Self::new()
    }
}

fn find_hangouts_path(search: &str, username: &str) -> String {
    format!(
        "/hangouts/find?search={}&username={}",
        urlencoding::encode(search),
        urlencoding::encode(username)
    )
}

fn find_users_path(search: &str) -> String {
    format!("/users/find?search={}", urlencoding::encode(search))
}

#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
impl Directory for ApiClient {
    async fn find_hangouts(&self, search: &str, username: &str) -> Result<Vec<Hangout>, ApiError> {
        let body: FindHangoutsResponse = self.get_json(&find_hangouts_path(search, username)).await?;
        Ok(body.hangouts)
    }

    async fn find_users(&self, search: &str) -> Result<Vec<User>, ApiError> {
        let body: FindUsersResponse = self.get_json(&find_users_path(search)).await?;
        Ok(body.users)
    }
}
