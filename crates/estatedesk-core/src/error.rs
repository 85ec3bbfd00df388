// ── Core error types ──
//
// Workflow-level failures. The workflows recover from these themselves and
// surface them as notifications; they reach callers only through the
// lower-level `FormBridge` methods and engine setup.

use thiserror::Error;

use crate::form::FormError;

#[derive(Debug, Error)]
pub enum CoreError {
    // ── Form Service ─────────────────────────────────────────────────
    #[error("Failed to load form from {url}: {reason}")]
    FormLoad { url: String, reason: String },

    #[error("Validation failed: {message}")]
    Validation { message: String },

    // ── Record API ───────────────────────────────────────────────────
    #[error("Request failed: {message}")]
    Transport { message: String },

    #[error("Delete failed: {message}")]
    DeleteFailed { message: String },

    #[error("Action failed: {message}")]
    ActionFailed { message: String },

    // ── Local ────────────────────────────────────────────────────────
    #[error(transparent)]
    Form(#[from] FormError),

    #[error("The dialog is no longer open")]
    ModalClosed,

    #[error("{domain} does not support {operation}")]
    Unsupported { domain: String, operation: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Message for a notification, without the variant prefix.
    pub fn user_message(&self) -> String {
        match self {
            Self::FormLoad { reason, .. } => reason.clone(),
            Self::Validation { message }
            | Self::Transport { message }
            | Self::DeleteFailed { message }
            | Self::ActionFailed { message }
            | Self::Config { message } => message.clone(),
            other => other.to_string(),
        }
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<estatedesk_api::Error> for CoreError {
    fn from(err: estatedesk_api::Error) -> Self {
        match err {
            estatedesk_api::Error::FormLoad { url, reason } => CoreError::FormLoad { url, reason },
            estatedesk_api::Error::Rejected { message, .. } => CoreError::ActionFailed { message },
            estatedesk_api::Error::Transport(e) => CoreError::Transport {
                message: e.to_string(),
            },
            estatedesk_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            estatedesk_api::Error::Tls(message) => CoreError::Config { message },
            estatedesk_api::Error::Deserialization { message, body: _ } => {
                CoreError::Internal(format!("Deserialization error: {message}"))
            }
        }
    }
}
