//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use estatedesk_config::ConfigError;
use estatedesk_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const CONFLICT: i32 = 6;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not reach the admin site: {reason}")]
    #[diagnostic(
        code(estatedesk::connection_failed),
        help(
            "Check that the site is running and the base URL is right.\n\
             Self-signed certificate? Use --insecure (-k) or set ca_cert in the profile."
        )
    )]
    ConnectionFailed { reason: String },

    #[error("{reason}")]
    #[diagnostic(
        code(estatedesk::form_load),
        help(
            "Form URL: {url}\n\
             A 302 or 403 usually means the session expired.\n\
             Store a fresh session cookie with: estatedesk config set-session"
        )
    )]
    FormLoad { url: String, reason: String },

    // ── Server answers ───────────────────────────────────────────────
    #[error("{message}")]
    #[diagnostic(code(estatedesk::rejected))]
    Rejected { message: String },

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(estatedesk::validation))]
    Validation { field: String, reason: String },

    #[error("{message}")]
    #[diagnostic(
        code(estatedesk::form_invalid),
        help("Fix the fields with --set FIELD=VALUE, or run without --no-input to be prompted.")
    )]
    FormInvalid { message: String },

    #[error("{domain} does not support {operation}")]
    #[diagnostic(
        code(estatedesk::unsupported),
        help("Run: estatedesk domains to see what each record kind supports")
    )]
    Unsupported { domain: String, operation: String },

    #[error("Timed out after {seconds}s waiting for the page to reload")]
    #[diagnostic(
        code(estatedesk::timeout),
        help("The change was saved; the reload was not observed.")
    )]
    Timeout { seconds: u64 },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(estatedesk::profile_not_found),
        help(
            "Available profiles: {available}\n\
             Create one with: estatedesk config init"
        )
    )]
    ProfileNotFound { name: String, available: String },

    #[error("No admin site configured")]
    #[diagnostic(
        code(estatedesk::no_config),
        help(
            "Create a profile with: estatedesk config init\n\
             Or pass --base-url. Expected config at: {path}"
        )
    )]
    NoConfig { path: String },

    #[error(transparent)]
    #[diagnostic(code(estatedesk::config))]
    Config(Box<figment::Error>),

    #[error("Keyring error: {0}")]
    #[diagnostic(
        code(estatedesk::keyring),
        help("Set session_cookie_env in the profile to read the cookie from the environment instead.")
    )]
    Keyring(String),

    // ── Interactive ──────────────────────────────────────────────────
    #[error("'{action}' requires confirmation")]
    #[diagnostic(
        code(estatedesk::confirmation_required),
        help("Use --yes (-y) to skip confirmation in non-interactive contexts.")
    )]
    NonInteractiveRequiresYes { action: String },

    // ── IO / Serialization ───────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON: {0}")]
    #[diagnostic(code(estatedesk::json))]
    Json(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    #[diagnostic(code(estatedesk::internal))]
    Internal(String),
}

impl From<figment::Error> for CliError {
    fn from(err: figment::Error) -> Self {
        Self::Config(Box::new(err))
    }
}

impl From<dialoguer::Error> for CliError {
    fn from(err: dialoguer::Error) -> Self {
        Self::Io(std::io::Error::other(err))
    }
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::FormLoad { .. } => exit_code::AUTH,
            Self::Rejected { .. } => exit_code::CONFLICT,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::Validation { .. }
            | Self::FormInvalid { .. }
            | Self::Unsupported { .. }
            | Self::NonInteractiveRequiresYes { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::FormLoad { url, reason } => CliError::FormLoad { url, reason },
            CoreError::Transport { message } => CliError::ConnectionFailed { reason: message },
            CoreError::DeleteFailed { message } | CoreError::ActionFailed { message } => {
                CliError::Rejected { message }
            }
            CoreError::Validation { message } => CliError::FormInvalid { message },
            CoreError::Form(e) => CliError::Validation {
                field: "form".into(),
                reason: e.to_string(),
            },
            CoreError::Unsupported { domain, operation } => {
                CliError::Unsupported { domain, operation }
            }
            CoreError::Config { message } => CliError::Validation {
                field: "site".into(),
                reason: message,
            },
            CoreError::ModalClosed => CliError::Internal("the form closed unexpectedly".into()),
            CoreError::Internal(message) => CliError::Internal(message),
        }
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            ConfigError::UnknownProfile { profile } => CliError::ProfileNotFound {
                name: profile,
                available: "(none)".into(),
            },
            ConfigError::Keyring(message) => CliError::Keyring(message),
            ConfigError::Serialization(e) => CliError::Internal(e.to_string()),
            ConfigError::Figment(e) => CliError::Config(e),
            ConfigError::Io(e) => CliError::Io(e),
        }
    }
}
