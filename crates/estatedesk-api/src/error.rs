use thiserror::Error;

/// Top-level error type for the `estatedesk-api` crate.
///
/// Covers the failure modes of both collaborators: the Form Service
/// (form fragments, submissions) and the Record API (deletes, actions,
/// lookups). `estatedesk-core` maps these into workflow errors.
#[derive(Debug, Error)]
pub enum Error {
    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing or joining error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// TLS configuration or client build error.
    #[error("TLS error: {0}")]
    Tls(String),

    // ── Form Service ────────────────────────────────────────────────
    /// The form fragment could not be loaded: non-2xx status, a body
    /// without an `html` field, or a network failure.
    #[error("Failed to load form from {url}: {reason}")]
    FormLoad { url: String, reason: String },

    // ── Record API ──────────────────────────────────────────────────
    /// The server answered but refused the request. `message` is the
    /// best-effort extraction from `detail`, `message` or `error`.
    #[error("Request rejected (HTTP {status}): {message}")]
    Rejected { status: u16, message: String },

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

impl Error {
    /// Returns `true` if this is a transient error worth a manual retry.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            Self::Rejected { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// HTTP status attached to this error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            Self::Rejected { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Human-facing message without the variant prefix.
    ///
    /// Used when the error ends up in a notification rather than a log line.
    pub fn user_message(&self) -> String {
        match self {
            Self::Rejected { message, .. } => message.clone(),
            Self::FormLoad { reason, .. } => reason.clone(),
            other => other.to_string(),
        }
    }
}
