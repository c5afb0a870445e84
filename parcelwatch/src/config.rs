//! Process configuration read from the environment.

use std::path::PathBuf;
use std::time::Duration;

use parcel_portal::{Credentials, PollerConfig, PortalConfig};

use crate::{Error, Result};

/// Twilio account used for SMS notifications.
#[derive(Clone)]
pub struct TwilioSettings {
    pub account_sid: String,
    pub auth_token: String,
    pub from_number: String,
}

impl std::fmt::Debug for TwilioSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TwilioSettings")
            .field("account_sid", &self.account_sid)
            .field("auth_token", &"<redacted>")
            .field("from_number", &self.from_number)
            .finish()
    }
}

/// Everything the binary needs to start.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub portal: PortalConfig,
    pub credentials: Credentials,
    pub poller: PollerConfig,
    /// Phone number (or webhook recipient) notifications go to.
    pub destination: Option<String>,
    pub twilio: Option<TwilioSettings>,
    pub webhook_url: Option<String>,
    pub log_dir: Option<PathBuf>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from any key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let require = |key: &str| get(key).ok_or_else(|| Error::config(format!("{key} is not set")));

        let subdomain = require("RS_SUBDOMAIN")?;
        let mut portal = PortalConfig::new(subdomain);
        if let Some(base_url) = get("RS_BASE_URL") {
            portal = portal.with_base_url(base_url);
        }

        let credentials = Credentials::new(require("RS_USERNAME")?, require("RS_PASSWORD")?);

        let mut poller = PollerConfig::default();
        if let Some(secs) = get("POLL_INTERVAL_SECS") {
            poller.poll_interval = parse_secs("POLL_INTERVAL_SECS", &secs)?;
        }
        if let Some(secs) = get("REFRESH_INTERVAL_SECS") {
            poller.refresh_interval = parse_secs("REFRESH_INTERVAL_SECS", &secs)?;
        }

        let twilio = match (get("TW_SID"), get("TW_TOKEN"), get("TW_NUMBER")) {
            (Some(account_sid), Some(auth_token), Some(from_number)) => Some(TwilioSettings {
                account_sid,
                auth_token,
                from_number,
            }),
            _ => None,
        };

        Ok(Self {
            portal,
            credentials,
            poller,
            destination: get("TO_NUMBER"),
            twilio,
            webhook_url: get("WEBHOOK_URL"),
            log_dir: get("PARCELWATCH_LOG_DIR").map(PathBuf::from),
        })
    }
}

fn parse_secs(key: &str, value: &str) -> Result<Duration> {
    match value.trim().parse::<u64>() {
        Ok(0) => Err(Error::config(format!("{key} must be greater than zero"))),
        Ok(secs) => Ok(Duration::from_secs(secs)),
        Err(e) => Err(Error::config(format!("{key}={value:?} is not a number: {e}"))),
    }
}
