// ── Runtime configuration ──
//
// What the engine needs to reach an admin site and how it paces its UI.
// Built by the CLI from a config profile; core never reads config files.

use std::time::Duration;

use estatedesk_api::TlsMode;
use secrecy::SecretString;
use url::Url;

use crate::notify::DEFAULT_TOAST_TTL;
use crate::tabs::DEFAULT_RELOAD_DELAY;

/// Cookie name Django uses for the session by default.
pub const DEFAULT_SESSION_COOKIE: &str = "sessionid";

/// Delay before a form's on-load hook runs after the modal opens.
pub const DEFAULT_ON_LOAD_DELAY: Duration = Duration::from_millis(100);

/// Timing knobs of the workflow engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineSettings {
    /// Delay between a successful mutation and the reload.
    pub reload_delay: Duration,
    /// How long toasts stay mounted.
    pub toast_ttl: Duration,
    /// Delay before on-load hooks run.
    pub on_load_delay: Duration,
    /// Append `_t=<epoch-ms>` to reload URLs.
    pub cache_bust: bool,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            reload_delay: DEFAULT_RELOAD_DELAY,
            toast_ttl: DEFAULT_TOAST_TTL,
            on_load_delay: DEFAULT_ON_LOAD_DELAY,
            cache_bust: false,
        }
    }
}

/// Connection settings for one admin site.
#[derive(Debug, Clone)]
pub struct SiteConfig {
    /// Site root, e.g. `https://desk.example.com/`.
    pub base_url: Url,
    /// Session cookie value; `None` for anonymous access.
    pub session: Option<SecretString>,
    /// Name of the session cookie.
    pub session_cookie_name: String,
    /// Token the page would carry in `<meta name="csrf-token">`.
    pub csrf_token: Option<String>,
    pub tls: TlsMode,
    pub timeout: Duration,
}

impl SiteConfig {
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            session: None,
            session_cookie_name: DEFAULT_SESSION_COOKIE.into(),
            csrf_token: None,
            tls: TlsMode::System,
            timeout: Duration::from_secs(30),
        }
    }
}
