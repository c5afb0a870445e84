//! Portal session state and the cookie jar that records it during login.

use parking_lot::Mutex;
use reqwest::cookie::CookieStore;
use reqwest::header::HeaderValue;
use tracing::{debug, trace};
use url::Url;

/// The cookie pair that authorises requests to one tenant's portal.
///
/// Either empty (fresh) or valid (both values set). A session is never
/// edited once handed out; re-authentication produces a new one.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Session {
    pub subdomain: String,
    pub session_cookie_name: String,
    pub session_cookie: String,
    /// Tenant-specific name, echoed back exactly as the server set it.
    pub secondary_cookie_name: String,
    pub secondary_cookie: String,
}

impl Session {
    pub fn new(subdomain: impl Into<String>, session_cookie_name: impl Into<String>) -> Self {
        Self {
            subdomain: subdomain.into(),
            session_cookie_name: session_cookie_name.into(),
            ..Default::default()
        }
    }

    pub fn is_valid(&self) -> bool {
        !self.session_cookie.is_empty() && !self.secondary_cookie.is_empty()
    }

    pub fn is_empty(&self) -> bool {
        self.session_cookie.is_empty() && self.secondary_cookie.is_empty()
    }

    /// `Cookie` header value carrying whichever cookies are set.
    pub fn cookie_header(&self) -> Option<String> {
        let mut parts = Vec::with_capacity(2);
        if !self.secondary_cookie.is_empty() {
            parts.push(format!(
                "{}={}",
                self.secondary_cookie_name, self.secondary_cookie
            ));
        }
        if !self.session_cookie.is_empty() {
            parts.push(format!("{}={}", self.session_cookie_name, self.session_cookie));
        }
        (!parts.is_empty()).then(|| parts.join("; "))
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("subdomain", &self.subdomain)
            .field("session_cookie_name", &self.session_cookie_name)
            .field("session_cookie_set", &!self.session_cookie.is_empty())
            .field("secondary_cookie_name", &self.secondary_cookie_name)
            .field("secondary_cookie_set", &!self.secondary_cookie.is_empty())
            .finish()
    }
}

/// Cookie store that only keeps the two cookies a [`Session`] cares about.
///
/// Plugged into the login client with `ClientBuilder::cookie_provider`, it
/// records every `Set-Cookie` the portal sends (redirects included) and
/// replays the pair on follow-up requests.
#[derive(Debug)]
pub struct SessionJar {
    secondary_suffix: String,
    session: Mutex<Session>,
}

impl SessionJar {
    pub fn new(
        subdomain: impl Into<String>,
        session_cookie_name: impl Into<String>,
        secondary_suffix: impl Into<String>,
    ) -> Self {
        Self {
            secondary_suffix: secondary_suffix.into(),
            session: Mutex::new(Session::new(subdomain, session_cookie_name)),
        }
    }

    /// Record one cookie by name.
    pub fn store(&self, name: &str, value: &str) {
        let mut session = self.session.lock();
        if name == session.session_cookie_name {
            session.session_cookie = value.to_string();
        }
        if name.ends_with(&self.secondary_suffix) {
            session.secondary_cookie_name = name.to_string();
            session.secondary_cookie = value.to_string();
        }
    }

    /// Copy of the session as recorded so far.
    pub fn session(&self) -> Session {
        self.session.lock().clone()
    }
}

/// Split `name=value; Path=/; HttpOnly` into its name and value.
pub(crate) fn parse_set_cookie(header: &str) -> Option<(&str, &str)> {
    let pair = header.split(';').next()?;
    let (name, value) = pair.split_once('=')?;
    let name = name.trim();
    if name.is_empty() {
        return None;
    }
    Some((name, value.trim().trim_matches('"')))
}

impl CookieStore for SessionJar {
    fn set_cookies(&self, cookie_headers: &mut dyn Iterator<Item = &HeaderValue>, url: &Url) {
        for header in cookie_headers {
            let Ok(raw) = header.to_str() else {
                debug!(%url, "Ignoring non-ASCII Set-Cookie header");
                continue;
            };
            match parse_set_cookie(raw) {
                Some((name, value)) => {
                    trace!(%url, cookie = name, "Portal set cookie");
                    self.store(name, value);
                }
                None => debug!(%url, "Ignoring malformed Set-Cookie header"),
            }
        }
    }

    fn cookies(&self, _url: &Url) -> Option<HeaderValue> {
        let header = self.session.lock().cookie_header()?;
        HeaderValue::from_str(&header).ok()
    }
}
