//! Twilio SMS notification channel.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use super::{NotificationChannel, NotificationError, build_client, check_response};
use crate::config::TwilioSettings;

pub const TWILIO_API_BASE: &str = "https://api.twilio.com";

const CHANNEL: &str = "twilio";

/// The part of Twilio's message resource we log.
#[derive(Debug, Deserialize)]
struct MessageResource {
    sid: String,
    #[serde(default)]
    status: Option<String>,
}

/// Sends notifications as SMS through the Twilio Messages API.
pub struct TwilioChannel {
    settings: TwilioSettings,
    api_base: String,
    client: Client,
}

impl TwilioChannel {
    pub fn new(settings: TwilioSettings) -> Result<Self, NotificationError> {
        Ok(Self {
            settings,
            api_base: TWILIO_API_BASE.to_string(),
            client: build_client(CHANNEL)?,
        })
    }

    /// Point the channel at another API host.
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    fn messages_url(&self) -> String {
        format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.api_base.trim_end_matches('/'),
            self.settings.account_sid
        )
    }
}

#[async_trait]
impl NotificationChannel for TwilioChannel {
    fn channel_type(&self) -> &'static str {
        CHANNEL
    }

    async fn send(&self, destination: &str, message: &str) -> Result<(), NotificationError> {
        let form = [
            ("From", self.settings.from_number.as_str()),
            ("To", destination),
            ("Body", message),
        ];

        let response = self
            .client
            .post(self.messages_url())
            .basic_auth(&self.settings.account_sid, Some(&self.settings.auth_token))
            .form(&form)
            .send()
            .await
            .map_err(|source| NotificationError::Request {
                channel: CHANNEL,
                source,
            })?;

        let response = check_response(CHANNEL, response).await?;
        match response.json::<MessageResource>().await {
            Ok(resource) => {
                debug!(sid = %resource.sid, status = ?resource.status, "Twilio message queued")
            }
            Err(e) => debug!(error = %e, "Twilio accepted message with unexpected body"),
        }
        Ok(())
    }
}
