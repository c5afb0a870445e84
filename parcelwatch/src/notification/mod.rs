//! Notification channels.
//!
//! - Twilio SMS
//! - Generic webhooks (HTTP POST)
//! - Log output, used when nothing else is configured

mod logger;
mod twilio;
mod webhook;

pub use logger::LogChannel;
pub use twilio::{TWILIO_API_BASE, TwilioChannel};
pub use webhook::WebhookChannel;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use thiserror::Error;
use tracing::info;

use crate::config::AppConfig;

/// Request timeout for notification APIs.
const NOTIFICATION_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Error, Debug)]
pub enum NotificationError {
    #[error("failed to build {channel} client: {source}")]
    Client {
        channel: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("{channel} request failed: {source}")]
    Request {
        channel: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("{channel} rejected notification: {status} - {body}")]
    Rejected {
        channel: &'static str,
        status: StatusCode,
        body: String,
    },
}

/// Trait for notification channels.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NotificationChannel: Send + Sync {
    /// Get the channel type name.
    fn channel_type(&self) -> &'static str;

    /// Deliver `message` to `destination`.
    async fn send(&self, destination: &str, message: &str) -> Result<(), NotificationError>;
}

fn build_client(channel: &'static str) -> Result<Client, NotificationError> {
    parcel_portal::install_rustls_provider();
    Client::builder()
        .timeout(NOTIFICATION_TIMEOUT)
        .build()
        .map_err(|source| NotificationError::Client { channel, source })
}

/// Turn a non-success response into [`NotificationError::Rejected`].
async fn check_response(
    channel: &'static str,
    response: reqwest::Response,
) -> Result<reqwest::Response, NotificationError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    tracing::warn!(channel, %status, %body, "Notification rejected");
    Err(NotificationError::Rejected {
        channel,
        status,
        body,
    })
}

/// Pick the channel for `config`: Twilio, then webhook, then log output.
pub fn select_channel(config: &AppConfig) -> Result<Arc<dyn NotificationChannel>, NotificationError> {
    let channel: Arc<dyn NotificationChannel> = if let Some(twilio) = &config.twilio {
        Arc::new(TwilioChannel::new(twilio.clone())?)
    } else if let Some(url) = &config.webhook_url {
        Arc::new(WebhookChannel::new(url.clone())?)
    } else {
        Arc::new(LogChannel)
    };
    info!(channel = channel.channel_type(), "Notification channel selected");
    Ok(channel)
}
