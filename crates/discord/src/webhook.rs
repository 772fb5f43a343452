use std::time::Duration;

use async_trait::async_trait;
use reqwest::Url;
use secrecy::{ExposeSecret, SecretString};
use stockbot_core::config::DiscordConfig;
use thiserror::Error;
use tracing::debug;

use crate::response::FollowupMessage;

const USER_AGENT: &str =
    concat!("DiscordBot (https://github.com/stockbot/stockbot, ", env!("CARGO_PKG_VERSION"), ")");
const REQUEST_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DeliveryError {
    #[error("reply delivery failed: {0}")]
    Transport(String),
    #[error("reply endpoint returned status {status}: {body}")]
    Status { status: u16, body: String },
}

/// Out-of-band channel for the final reply to a deferred interaction.
#[async_trait]
pub trait ReplySink: Send + Sync {
    async fn edit_original(
        &self,
        application_id: &str,
        token: &str,
        message: &FollowupMessage,
    ) -> Result<(), DeliveryError>;
}

/// Edits `@original` through the interaction webhook.
pub struct DiscordRestClient {
    http: reqwest::Client,
    api_base_url: Url,
    bot_token: SecretString,
}

impl DiscordRestClient {
    pub fn new(
        http: reqwest::Client,
        api_base_url: &str,
        bot_token: SecretString,
    ) -> Result<Self, DeliveryError> {
        let api_base_url = Url::parse(api_base_url)
            .map_err(|error| DeliveryError::Transport(format!("invalid api base url: {error}")))?;
        Ok(Self { http, api_base_url, bot_token })
    }

    pub fn from_config(config: &DiscordConfig) -> Result<Self, DeliveryError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|error| DeliveryError::Transport(error.to_string()))?;
        Self::new(http, &config.api_base_url, config.bot_token.clone())
    }

    fn original_message_url(
        &self,
        application_id: &str,
        token: &str,
    ) -> Result<Url, DeliveryError> {
        let mut url = self.api_base_url.clone();
        url.path_segments_mut()
            .map_err(|_| DeliveryError::Transport("api base url cannot carry a path".to_owned()))?
            .pop_if_empty()
            .extend(["webhooks", application_id, token, "messages", "@original"]);
        Ok(url)
    }
}

#[async_trait]
impl ReplySink for DiscordRestClient {
    async fn edit_original(
        &self,
        application_id: &str,
        token: &str,
        message: &FollowupMessage,
    ) -> Result<(), DeliveryError> {
        let url = self.original_message_url(application_id, token)?;
        let authorization = format!("Bot {}", self.bot_token.expose_secret());
        let response = self
            .http
            .patch(url)
            .header(reqwest::header::AUTHORIZATION, authorization)
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .json(message)
            .send()
            .await
            .map_err(|error| DeliveryError::Transport(error.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DeliveryError::Status { status: status.as_u16(), body });
        }

        debug!(
            event_name = "discord.reply.delivered",
            application_id,
            status = status.as_u16(),
            "edited original interaction reply"
        );
        Ok(())
    }
}
