//! Remote action dispatch over HTTP
//!
//! The remote service receives
//! `POST {base_url}/actions/{action_id}` with body
//! `{"principal": "...", "inputs": {...}}` (inputs resolved to plain data)
//! and answers with a receipt document.

use std::time::Duration;

use async_trait::async_trait;
use plus_engine::value::resolve_map;
use plus_engine::{ActionDispatcher, Receipt, ValueMap};

/// Default request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Dispatches actions to a remote action service
#[derive(Clone)]
pub struct HttpDispatcher {
    base_url: String,
    token: Option<String>,
    timeout: Duration,
    client: reqwest::Client,
}

impl HttpDispatcher {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: None,
            timeout: DEFAULT_TIMEOUT,
            client: reqwest::Client::new(),
        }
    }

    /// Send `Authorization: Bearer {token}` with every request
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn action_url(&self, action_id: &str) -> String {
        format!("{}/actions/{}", self.base_url, action_id)
    }
}

#[async_trait]
impl ActionDispatcher for HttpDispatcher {
    async fn execute(&self, action_id: &str, principal: &str, inputs: ValueMap) -> Receipt {
        let url = self.action_url(action_id);
        let body = serde_json::json!({
            "principal": principal,
            "inputs": resolve_map(&inputs),
        });

        log::debug!("Dispatching '{}' for {} to {}", action_id, principal, url);

        let mut request = self.client.post(&url).json(&body).timeout(self.timeout);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                log::warn!("Action '{}' could not reach {}: {}", action_id, url, e);
                return Receipt::failed(format!(
                    "Failed to reach action service at {}: {}",
                    self.base_url, e
                ));
            }
        };

        if !response.status().is_success() {
            let status = response.status();
            let error_body = response.text().await.unwrap_or_default();
            return Receipt::failed(format!(
                "Action service error ({}): {}",
                status, error_body
            ));
        }

        match response.json::<Receipt>().await {
            Ok(receipt) => receipt,
            Err(e) => Receipt::failed(format!("Failed to parse action receipt: {}", e)),
        }
    }
}
