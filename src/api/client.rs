use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tracing::debug;

use super::{Envelope, History, OutgoingMessage, VkApi};
use crate::config::VkConfig;
use crate::cursor::Cursor;
use crate::error::CallError;

/// reqwest-backed VK API client. Every call is a GET against
/// `{base_url}/{method}` with the token and API version appended.
pub struct VkClient {
    client: reqwest::Client,
    config: VkConfig,
}

impl VkClient {
    pub fn new(config: VkConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { client, config })
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        params: &[(&str, String)],
    ) -> Result<T, CallError> {
        let url = format!("{}/{}", self.config.base_url.trim_end_matches('/'), method);

        debug!("Calling VK method {}", method);

        let response = self
            .client
            .get(&url)
            .query(params)
            .query(&[
                ("v", self.config.api_version.as_str()),
                ("access_token", self.config.access_token.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(CallError::Http(status.as_u16()));
        }

        let body = response.text().await?;
        let envelope: Envelope<T> = serde_json::from_str(&body)?;
        envelope.into_result()
    }
}

#[async_trait]
impl VkApi for VkClient {
    async fn get_long_poll_server(&self) -> Result<Cursor, CallError> {
        self.call("messages.getLongPollServer", &[("need_pts", "1".to_string())])
            .await
    }

    async fn get_long_poll_history(&self, cursor: &Cursor) -> Result<History, CallError> {
        self.call(
            "messages.getLongPollHistory",
            &[
                ("ts", cursor.ts.to_string()),
                ("pts", cursor.pts.to_string()),
                ("fields", "display_name".to_string()),
            ],
        )
        .await
    }

    async fn send_message(&self, message: &OutgoingMessage) -> Result<i64, CallError> {
        self.call(
            "messages.send",
            &[
                ("message", message.text.clone()),
                ("peer_id", message.peer_id.to_string()),
                ("forward_messages", message.forward_message_id.to_string()),
            ],
        )
        .await
    }
}
