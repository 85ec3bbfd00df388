// Admin HTTP client
//
// Wraps `reqwest::Client` with base-URL resolution, the shared cookie jar,
// and the header policy every admin call follows (`X-Requested-With`, plus
// `X-CSRFToken` on writes). Endpoint groups live in `forms.rs` and
// `records.rs` as inherent methods so this file stays about transport.

use std::sync::Arc;

use reqwest::cookie::{CookieStore, Jar};
use tracing::warn;
use url::Url;

use crate::error::Error;
use crate::transport::TransportConfig;

/// Header carrying the anti-forgery token on write requests.
pub const CSRF_HEADER: &str = "X-CSRFToken";

/// Raw HTTP client for the admin Form Service and Record API.
///
/// Paths handed to the endpoint methods are resolved against `base_url`,
/// so callers pass the same relative URLs the admin pages use
/// (`/admin/forms/community/new/`, `/api/payment/bills/7/`).
pub struct FormClient {
    http: reqwest::Client,
    base_url: Url,
    /// Cookie jar shared with the `reqwest::Client`. Holds the session
    /// cookie and whatever `csrftoken` the server hands out.
    cookie_jar: Option<Arc<Jar>>,
}

impl FormClient {
    /// Create a client from a `TransportConfig`.
    ///
    /// A cookie jar is created if the config doesn't carry one: the admin
    /// endpoints are session-authenticated.
    pub fn new(base_url: Url, transport: &TransportConfig) -> Result<Self, Error> {
        let config = if transport.cookie_jar.is_some() {
            transport.clone()
        } else {
            transport.clone().with_cookie_jar()
        };
        let cookie_jar = config.cookie_jar.clone();
        let http = config.build_client()?;
        Ok(Self {
            http,
            base_url,
            cookie_jar,
        })
    }

    /// Create a client around a pre-built `reqwest::Client` (no jar access).
    pub fn with_client(http: reqwest::Client, base_url: Url) -> Self {
        Self {
            http,
            base_url,
            cookie_jar: None,
        }
    }

    /// The underlying HTTP client.
    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    /// The admin site root.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Resolve an admin path (absolute or relative) against the base URL.
    pub fn resolve(&self, path: &str) -> Result<Url, Error> {
        self.base_url.join(path).map_err(Error::InvalidUrl)
    }

    // ── Cookies ──────────────────────────────────────────────────────

    /// Seed the jar with a `Set-Cookie`-style string (e.g. `sessionid=...`).
    ///
    /// Returns `false` if this client has no jar to seed.
    pub fn add_cookie(&self, cookie: &str) -> bool {
        match self.cookie_jar.as_ref() {
            Some(jar) => {
                jar.add_cookie_str(cookie, &self.base_url);
                true
            }
            None => false,
        }
    }

    /// Current `Cookie` header value for the admin site, if any.
    pub fn cookie_header(&self) -> Option<String> {
        let jar = self.cookie_jar.as_ref()?;
        let cookies = jar.cookies(&self.base_url)?;
        cookies.to_str().ok().map(String::from)
    }

    // ── Header policy ────────────────────────────────────────────────

    /// Mark the request as a background (XHR-style) call.
    pub(crate) fn background(builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        builder.header("X-Requested-With", "XMLHttpRequest")
    }

    /// Attach the CSRF token when one was discovered.
    ///
    /// A missing token is not fatal: some endpoints are CSRF-exempt, so the
    /// request still goes out and the server decides.
    pub(crate) fn apply_csrf(
        builder: reqwest::RequestBuilder,
        csrf: Option<&str>,
    ) -> reqwest::RequestBuilder {
        match csrf {
            Some(token) => builder.header(CSRF_HEADER, token),
            None => {
                warn!("no CSRF token available, sending request without it");
                builder
            }
        }
    }
}
