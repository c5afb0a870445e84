//! Credential login against the portal.

use std::sync::Arc;

use tracing::{debug, instrument};

use crate::error::{AuthError, ConfigError};
use crate::portal::{Portal, create_client_builder};
use crate::session::{Session, SessionJar};

/// Portal login credentials.
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Log in and capture the resulting session cookies.
///
/// The login client uses a fresh [`SessionJar`] as its cookie store, so every
/// cookie the portal sets during the exchange (redirects included) lands in
/// the returned [`Session`]. The HTTP status of the login response is not
/// checked: the portal answers bad credentials with a page, not an error, so
/// the cookies are the only reliable signal.
#[instrument(skip(portal, credentials), fields(subdomain = %portal.config().subdomain))]
pub async fn authenticate(portal: &Portal, credentials: &Credentials) -> Result<Session, AuthError> {
    let config = portal.config();
    let jar = Arc::new(SessionJar::new(
        config.subdomain.clone(),
        config.session_cookie.clone(),
        config.secondary_cookie_suffix.clone(),
    ));

    let client = create_client_builder(config.request_timeout)
        .cookie_provider(Arc::clone(&jar))
        .build()
        .map_err(ConfigError::HttpClient)?;

    let url = portal.login_url();
    let form = [
        ("page", ""),
        ("res_username", credentials.username.as_str()),
        ("res_password", credentials.password.as_str()),
    ];

    let response = client
        .post(url.clone())
        .form(&form)
        .send()
        .await
        .map_err(|source| AuthError::Transport {
            url: url.to_string(),
            source,
        })?;

    debug!(status = %response.status(), final_url = %response.url(), "Login request completed");

    let session = jar.session();
    if session.session_cookie.is_empty() {
        return Err(AuthError::MissingSessionToken(config.session_cookie.clone()));
    }
    if session.secondary_cookie.is_empty() {
        return Err(AuthError::MissingSecondaryToken(
            config.secondary_cookie_suffix.clone(),
        ));
    }

    debug!(
        secondary_cookie = %session.secondary_cookie_name,
        "Portal session established"
    );
    Ok(session)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credentials_debug_redacts_password() {
        let credentials = Credentials::new("flat12", "hunter2");
        let rendered = format!("{credentials:?}");
        assert!(rendered.contains("flat12"));
        assert!(!rendered.contains("hunter2"));
    }
}
