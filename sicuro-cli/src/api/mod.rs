//! API client module
//!
//! HTTP and WebSocket client for the Sicuro server API.

use anyhow::{Context, Result};
use futures_util::{Stream, StreamExt};
use reqwest::Client;
use sicuro_core::dto::job::{TriggerRequest, TriggerResponse};
use sicuro_core::dto::log::{LedgerEntryView, LogDelivery, LogListing, LogSnapshot};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

/// HTTP client for the Sicuro server API
pub struct ApiClient {
    base_url: String,
    client: Client,
}

impl ApiClient {
    /// Create a new API client
    ///
    /// # Arguments
    /// * `base_url` - The base URL of the server
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: Client::new(),
        }
    }

    /// Trigger a build
    ///
    /// # Arguments
    /// * `req` - The trigger request
    ///
    /// # Returns
    /// Whether the build was started and the log to follow
    pub async fn trigger(&self, req: &TriggerRequest) -> Result<TriggerResponse> {
        let url = format!("{}/api/trigger", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(req)
            .send()
            .await
            .context("Failed to send trigger request")?;

        self.handle_response(response).await
    }

    /// Get the current content of a log
    ///
    /// # Arguments
    /// * `name` - Log name (`owner/repo/reference`)
    pub async fn get_log(&self, name: &str) -> Result<LogSnapshot> {
        let url = format!("{}/ci/{}", self.base_url, name);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .context("Failed to send get log request")?;

        self.handle_response(response).await
    }

    /// List the logs of a project
    pub async fn list_logs(&self, owner: &str, repo: &str) -> Result<Vec<LogListing>> {
        let url = format!("{}/api/projects/{}/{}/logs", self.base_url, owner, repo);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .context("Failed to send list logs request")?;

        self.handle_response(response).await
    }

    /// Get the ledger of a project
    pub async fn get_ledger(&self, owner: &str, repo: &str) -> Result<Vec<LedgerEntryView>> {
        let url = format!("{}/api/projects/{}/{}/ledger", self.base_url, owner, repo);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .context("Failed to send get ledger request")?;

        self.handle_response(response).await
    }

    /// Open a live stream of a log
    ///
    /// # Arguments
    /// * `name` - Log name (`owner/repo/reference`)
    /// * `cursor` - Cursor of the last delivery already seen, if any
    ///
    /// # Returns
    /// A stream of deliveries that ends when the server closes the connection
    pub async fn stream_log(
        &self,
        name: &str,
        cursor: Option<&str>,
    ) -> Result<impl Stream<Item = Result<LogDelivery>>> {
        let url = stream_url(&self.base_url, name, cursor)?;
        let (socket, _) = connect_async(url.as_str())
            .await
            .with_context(|| format!("Failed to connect to {}", url))?;

        Ok(socket.filter_map(|frame| async move {
            match frame {
                Ok(Message::Text(text)) => Some(
                    serde_json::from_str::<LogDelivery>(&text)
                        .context("Failed to parse log delivery"),
                ),
                Ok(_) => None,
                Err(e) => Some(Err(anyhow::Error::new(e).context("Log stream failed"))),
            }
        }))
    }

    /// Handle API response and deserialize JSON
    ///
    /// # Arguments
    /// * `response` - The HTTP response
    ///
    /// # Returns
    /// The deserialized response body
    async fn handle_response<T: serde::de::DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T> {
        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            anyhow::bail!("Request failed with status {}: {}", status, error_text);
        }

        response
            .json()
            .await
            .context("Failed to parse response JSON")
    }
}

/// WebSocket URL of a log stream
fn stream_url(base_url: &str, name: &str, cursor: Option<&str>) -> Result<String> {
    let ws_base = if let Some(rest) = base_url.strip_prefix("https://") {
        format!("wss://{}", rest)
    } else if let Some(rest) = base_url.strip_prefix("http://") {
        format!("ws://{}", rest)
    } else {
        anyhow::bail!("Server URL must start with http:// or https://: {}", base_url);
    };

    let mut url = format!("{}/ws/{}", ws_base, name.trim_matches('/'));
    if let Some(cursor) = cursor {
        url.push_str("?lastMod=");
        url.push_str(cursor);
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stream_url() {
        assert_eq!(
            stream_url("http://localhost:8080", "octo/hello/abc1234", None).unwrap(),
            "ws://localhost:8080/ws/octo/hello/abc1234"
        );
        assert_eq!(
            stream_url("https://ci.example.com", "/octo/hello/main/", Some("17f3a2")).unwrap(),
            "wss://ci.example.com/ws/octo/hello/main?lastMod=17f3a2"
        );
        assert!(stream_url("ci.example.com", "octo/hello/main", None).is_err());
    }
}
