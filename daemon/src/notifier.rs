// notifier.rs - ClickUp chat notification sink

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use std::time::Duration;

use fleetguard_shared::config::ClickUpSettings;

/// 通知チャネルへの送信口
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn send(&self, content: &str) -> Result<()>;
}

/// ClickUp チャットチャンネルへメッセージを投稿する
pub struct ClickUpNotifier {
    client: reqwest::Client,
    api_token: String,
    workspace_id: String,
    channel_id: String,
}

impl ClickUpNotifier {
    pub fn new(settings: &ClickUpSettings) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.request_timeout_secs))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            api_token: settings.api_token.clone(),
            workspace_id: settings.workspace_id.clone(),
            channel_id: settings.channel_id.clone(),
        })
    }

    fn message_url(&self) -> String {
        format!(
            "https://api.clickup.com/api/v3/workspaces/{}/channels/{}/messages",
            self.workspace_id, self.channel_id
        )
    }
}

#[async_trait]
impl NotificationSink for ClickUpNotifier {
    async fn send(&self, content: &str) -> Result<()> {
        // メッセージは Markdown として投稿する
        let body = serde_json::json!({
            "type": "message",
            "content_format": "text/md",
            "content": content,
        });

        let response = self
            .client
            .post(self.message_url())
            .header("Authorization", &self.api_token)
            .json(&body)
            .send()
            .await
            .context("Failed to send ClickUp chat message")?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "ClickUp API returned {} for channel {}",
                response.status(),
                self.channel_id
            ));
        }

        Ok(())
    }
}
