//! Configuration for estatedesk.
//!
//! TOML profiles (one per admin site), session resolution (env + keyring +
//! plaintext), and translation to `estatedesk_core::SiteConfig` and
//! `EngineSettings`. The CLI layers its flags on top.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use estatedesk_core::{EngineSettings, SiteConfig, TlsMode, config::DEFAULT_SESSION_COOKIE};

/// Keyring service name; entries are keyed `<profile>/session`.
pub const KEYRING_SERVICE: &str = "estatedesk";

/// Prefix of environment overrides, e.g. `ESTATEDESK_DEFAULTS__TIMEOUT=10`.
pub const ENV_PREFIX: &str = "ESTATEDESK_";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("profile '{profile}' not found")]
    UnknownProfile { profile: String },

    #[error("keyring error: {0}")]
    Keyring(String),

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Config {
    /// Profile used when none is named.
    pub default_profile: Option<String>,

    #[serde(default)]
    pub defaults: Defaults,

    /// Named admin sites.
    #[serde(default)]
    pub profiles: BTreeMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: BTreeMap::new(),
        }
    }
}

impl Config {
    /// Pick a profile: the named one, else `default_profile`, else
    /// `"default"`.
    pub fn profile(&self, name: Option<&str>) -> Result<(String, &Profile), ConfigError> {
        let name = name
            .map(str::to_owned)
            .or_else(|| self.default_profile.clone())
            .unwrap_or_else(|| "default".into());
        self.profiles
            .get(&name)
            .map(|profile| (name.clone(), profile))
            .ok_or(ConfigError::UnknownProfile { profile: name })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default)]
    pub insecure: bool,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Delay between a successful mutation and the page reload.
    #[serde(default = "default_reload_delay_ms")]
    pub reload_delay_ms: u64,

    #[serde(default = "default_toast_ttl_ms")]
    pub toast_ttl_ms: u64,

    #[serde(default = "default_on_load_delay_ms")]
    pub on_load_delay_ms: u64,

    /// Append `_t=<epoch-ms>` to reload URLs.
    #[serde(default)]
    pub cache_bust: bool,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            insecure: false,
            timeout: default_timeout(),
            reload_delay_ms: default_reload_delay_ms(),
            toast_ttl_ms: default_toast_ttl_ms(),
            on_load_delay_ms: default_on_load_delay_ms(),
            cache_bust: false,
        }
    }
}

fn default_timeout() -> u64 {
    30
}
fn default_reload_delay_ms() -> u64 {
    500
}
fn default_toast_ttl_ms() -> u64 {
    3000
}
fn default_on_load_delay_ms() -> u64 {
    100
}

/// One admin site.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Profile {
    /// Site root (e.g. "https://desk.example.com").
    pub base_url: String,

    /// Session cookie value (plaintext; prefer keyring or env var).
    pub session_cookie: Option<String>,

    /// Environment variable holding the session cookie value.
    pub session_cookie_env: Option<String>,

    /// Session cookie name, `sessionid` when unset.
    pub session_cookie_name: Option<String>,

    /// CSRF token to expose as the page's meta tag.
    pub csrf_token: Option<String>,

    /// List page the engine starts on when `--page` is not given.
    pub page: Option<String>,

    /// Path to a custom CA certificate.
    pub ca_cert: Option<PathBuf>,

    /// Override insecure TLS setting.
    pub insecure: Option<bool>,

    /// Override timeout.
    pub timeout: Option<u64>,
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "estatedesk", "estatedesk").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("estatedesk");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load from `path` + environment. A missing file yields the defaults.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed(ENV_PREFIX).split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Load config, returning a default if loading fails.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<PathBuf, ConfigError> {
    let path = config_path();
    save_config_to(cfg, &path)?;
    Ok(path)
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Session resolution ──────────────────────────────────────────────

/// Resolve the session cookie value: env var, then keyring, then the
/// plaintext value in the profile. `None` means anonymous requests.
pub fn resolve_session(profile: &Profile, profile_name: &str) -> Option<SecretString> {
    // 1. Profile's session_cookie_env → env var lookup
    if let Some(ref env_name) = profile.session_cookie_env {
        if let Ok(val) = std::env::var(env_name) {
            return Some(SecretString::from(val));
        }
    }

    // 2. System keyring
    if let Ok(entry) = keyring::Entry::new(KEYRING_SERVICE, &keyring_user(profile_name)) {
        if let Ok(secret) = entry.get_password() {
            return Some(SecretString::from(secret));
        }
    }

    // 3. Plaintext in config
    profile
        .session_cookie
        .as_ref()
        .map(|value| SecretString::from(value.clone()))
}

/// Store a session cookie value in the system keyring.
pub fn store_session(profile_name: &str, value: &str) -> Result<(), ConfigError> {
    let entry = keyring::Entry::new(KEYRING_SERVICE, &keyring_user(profile_name))
        .map_err(|e| ConfigError::Keyring(e.to_string()))?;
    entry
        .set_password(value)
        .map_err(|e| ConfigError::Keyring(e.to_string()))
}

fn keyring_user(profile_name: &str) -> String {
    format!("{profile_name}/session")
}

// ── Translation ─────────────────────────────────────────────────────

/// Engine timing from `[defaults]`.
pub fn engine_settings(defaults: &Defaults) -> EngineSettings {
    EngineSettings {
        reload_delay: Duration::from_millis(defaults.reload_delay_ms),
        toast_ttl: Duration::from_millis(defaults.toast_ttl_ms),
        on_load_delay: Duration::from_millis(defaults.on_load_delay_ms),
        cache_bust: defaults.cache_bust,
    }
}

/// Build a `SiteConfig` from a profile, without CLI flag overrides.
pub fn profile_to_site_config(
    profile: &Profile,
    profile_name: &str,
    defaults: &Defaults,
) -> Result<SiteConfig, ConfigError> {
    let base_url: url::Url = profile
        .base_url
        .parse()
        .map_err(|_| ConfigError::Validation {
            field: "base_url".into(),
            reason: format!("invalid URL: {}", profile.base_url),
        })?;

    let tls = if profile.insecure.unwrap_or(defaults.insecure) {
        TlsMode::DangerAcceptInvalid
    } else if let Some(ref ca_path) = profile.ca_cert {
        TlsMode::CustomCa(ca_path.clone())
    } else {
        TlsMode::System
    };

    Ok(SiteConfig {
        base_url,
        session: resolve_session(profile, profile_name),
        session_cookie_name: profile
            .session_cookie_name
            .clone()
            .unwrap_or_else(|| DEFAULT_SESSION_COOKIE.into()),
        csrf_token: profile.csrf_token.clone(),
        tls,
        timeout: Duration::from_secs(profile.timeout.unwrap_or(defaults.timeout)),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn profile(base_url: &str) -> Profile {
        Profile {
            base_url: base_url.into(),
            ..Profile::default()
        }
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.defaults, Defaults::default());
        assert!(config.profiles.is_empty());
        assert_eq!(config.default_profile.as_deref(), Some("default"));
    }

    #[test]
    fn save_then_load_keeps_profiles() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.defaults.reload_delay_ms = 250;
        config.profiles.insert(
            "staging".into(),
            Profile {
                csrf_token: Some("tok".into()),
                page: Some("/admin/payment/?tab=bills".into()),
                ..profile("https://staging.example.com")
            },
        );
        save_config_to(&config, &path).unwrap();

        let loaded = load_config_from(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "default_profile = \"prod\"\n\
             [defaults]\ncache_bust = true\n\
             [profiles.prod]\nbase_url = \"https://desk.example.com\"\n",
        )
        .unwrap();

        let config = load_config_from(&path).unwrap();
        assert!(config.defaults.cache_bust);
        assert_eq!(config.defaults.toast_ttl_ms, 3000);

        let (name, prod) = config.profile(None).unwrap();
        assert_eq!(name, "prod");
        assert_eq!(prod.base_url, "https://desk.example.com");
        assert!(matches!(
            config.profile(Some("dev")),
            Err(ConfigError::UnknownProfile { .. })
        ));
    }

    #[test]
    fn engine_settings_from_defaults() {
        let settings = engine_settings(&Defaults::default());
        assert_eq!(settings, EngineSettings::default());
    }

    #[test]
    fn site_config_applies_overrides() {
        let mut p = profile("https://desk.example.com");
        p.insecure = Some(true);
        p.timeout = Some(5);
        p.session_cookie_name = Some("desk_session".into());

        let site = profile_to_site_config(&p, "estatedesk-test-overrides", &Defaults::default())
            .unwrap();
        assert!(matches!(site.tls, TlsMode::DangerAcceptInvalid));
        assert_eq!(site.timeout, Duration::from_secs(5));
        assert_eq!(site.session_cookie_name, "desk_session");
        assert_eq!(site.base_url.as_str(), "https://desk.example.com/");
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        let err = profile_to_site_config(&profile("not a url"), "x", &Defaults::default())
            .unwrap_err();
        assert!(matches!(err, ConfigError::Validation { ref field, .. } if field == "base_url"));
    }
}
