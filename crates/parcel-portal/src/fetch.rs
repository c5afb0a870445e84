use reqwest::header::COOKIE;
use tracing::debug;

use crate::error::FetchError;
use crate::portal::Portal;
use crate::session::Session;

/// Strip the newlines and tabs of the portal's pretty-printed markup.
pub fn normalize_html(body: &str) -> String {
    body.chars().filter(|c| !matches!(c, '\n' | '\t')).collect()
}

impl Portal {
    /// GET the deliveries page with the session's cookies attached.
    pub async fn fetch_deliveries_page(&self, session: &Session) -> Result<String, FetchError> {
        let url = self.deliveries_url();

        let mut request = self.client().get(url.clone());
        if let Some(cookies) = session.cookie_header() {
            request = request.header(COOKIE, cookies);
        }

        let response = request
            .send()
            .await
            .map_err(|source| FetchError::Transport {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status,
            });
        }

        let body = response.text().await.map_err(|source| FetchError::Read {
            url: url.to_string(),
            source,
        })?;

        debug!(%url, bytes = body.len(), "Fetched deliveries page");
        Ok(normalize_html(&body))
    }
}
