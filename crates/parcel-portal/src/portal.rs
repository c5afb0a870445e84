use std::sync::{Arc, OnceLock};
use std::time::Duration;

use reqwest::Client;
use reqwest::header::{self, HeaderMap, HeaderValue};
use tracing::debug;
use url::Url;

use crate::error::{ConfigError, PollError};
use crate::parcel::Parcel;
use crate::session::Session;

pub(crate) const DEFAULT_UA: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0.0.0 Safari/537.36";

pub const DEFAULT_BASE_URL: &str = "https://{subdomain}.resi-sense.co.uk";
pub const DEFAULT_SESSION_COOKIE: &str = "PHPSESSID";
pub const DEFAULT_SECONDARY_COOKIE_SUFFIX: &str = "_resdata";
pub const DEFAULT_TABLE_ID: &str = "historic_parcels";

/// Where the portal lives and how it names things.
#[derive(Debug, Clone)]
pub struct PortalConfig {
    /// Base url template; `{subdomain}` is replaced with [`Self::subdomain`].
    pub base_url: String,
    pub subdomain: String,
    pub login_path: String,
    pub deliveries_path: String,
    /// Exact name of the primary session cookie.
    pub session_cookie: String,
    /// Suffix of the tenant-specific secondary cookie, e.g. `WILBURN_resdata`.
    pub secondary_cookie_suffix: String,
    /// `id` attribute of the parcel table on the deliveries page.
    pub table_id: String,
    pub request_timeout: Duration,
}

impl PortalConfig {
    pub fn new(subdomain: impl Into<String>) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            subdomain: subdomain.into(),
            login_path: "/login/".to_string(),
            deliveries_path: "/requests/deliveries/".to_string(),
            session_cookie: DEFAULT_SESSION_COOKIE.to_string(),
            secondary_cookie_suffix: DEFAULT_SECONDARY_COOKIE_SUFFIX.to_string(),
            table_id: DEFAULT_TABLE_ID.to_string(),
            request_timeout: Duration::from_secs(30),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

/// Install the process-wide rustls crypto provider once.
pub fn install_rustls_provider() {
    static PROVIDER_INSTALLED: OnceLock<()> = OnceLock::new();
    PROVIDER_INSTALLED.get_or_init(|| {
        if let Err(e) = rustls::crypto::ring::default_provider().install_default() {
            // Another crate got there first.
            debug!(existing_provider = ?e, "rustls CryptoProvider already installed");
        }
    });
}

/// Client builder shared by the login and fetch clients.
pub fn create_client_builder(timeout: Duration) -> reqwest::ClientBuilder {
    install_rustls_provider();

    let mut headers = HeaderMap::new();
    headers.insert(
        header::ACCEPT,
        HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"),
    );
    headers.insert(
        header::ACCEPT_LANGUAGE,
        HeaderValue::from_static("en-GB,en;q=0.8"),
    );

    Client::builder()
        .user_agent(DEFAULT_UA)
        .default_headers(headers)
        .timeout(timeout)
}

/// A configured handle on one tenant's portal.
///
/// Cheap to clone; the fetch client carries no cookie store because every
/// request sends the cookies of the session it is given.
#[derive(Debug, Clone)]
pub struct Portal {
    config: Arc<PortalConfig>,
    login_url: Url,
    deliveries_url: Url,
    client: Client,
}

impl Portal {
    pub fn new(config: PortalConfig) -> Result<Self, ConfigError> {
        let raw = config.base_url.replace("{subdomain}", &config.subdomain);
        let base_url = Url::parse(&raw).map_err(|source| ConfigError::InvalidBaseUrl {
            url: raw.clone(),
            source,
        })?;
        let login_url = join(&base_url, &config.login_path)?;
        let deliveries_url = join(&base_url, &config.deliveries_path)?;
        let client = create_client_builder(config.request_timeout)
            .build()
            .map_err(ConfigError::HttpClient)?;

        Ok(Self {
            config: Arc::new(config),
            login_url,
            deliveries_url,
            client,
        })
    }

    pub fn config(&self) -> &PortalConfig {
        &self.config
    }

    pub(crate) fn client(&self) -> &Client {
        &self.client
    }

    pub fn login_url(&self) -> &Url {
        &self.login_url
    }

    pub fn deliveries_url(&self) -> &Url {
        &self.deliveries_url
    }

    /// Fetch the deliveries page once and turn it into a parcel snapshot.
    pub async fn poll(&self, session: &Session) -> Result<Vec<Parcel>, PollError> {
        let page = self.fetch_deliveries_page(session).await?;
        crate::table::scrape_parcels(&page, &self.config.table_id)
    }
}

fn join(base: &Url, path: &str) -> Result<Url, ConfigError> {
    base.join(path).map_err(|source| ConfigError::InvalidBaseUrl {
        url: format!("{base}{path}"),
        source,
    })
}
