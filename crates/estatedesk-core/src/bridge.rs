// ── Form bridge ──
//
// The engine's only path to the server. Discovers the CSRF token from the
// page, forwards requests to `FormClient`, and maps transport errors into
// the workflow taxonomy. Also paints field errors onto the mounted form.

use std::sync::Arc;

use estatedesk_api::{
    ActionReply, FieldErrors, FormClient, FormPayload, PaymentRecordDetail, PropertyOption,
    SubmissionResult,
};
use serde_json::Value;
use tracing::{debug, trace};

use crate::error::CoreError;
use crate::modal::{ModalController, ModalHandle};
use crate::page::Page;

/// Cookie the server sets with the anti-forgery token.
pub const CSRF_COOKIE: &str = "csrftoken";
/// `<meta name=...>` carrying the token on admin pages.
pub const CSRF_META: &str = "csrf-token";
/// Hidden input Django renders inside forms.
pub const CSRF_INPUT: &str = "csrfmiddlewaretoken";

#[derive(Clone)]
pub struct FormBridge {
    client: Arc<FormClient>,
    page: Page,
    modal: ModalController,
}

impl FormBridge {
    pub fn new(client: Arc<FormClient>, page: Page, modal: ModalController) -> Self {
        Self {
            client,
            page,
            modal,
        }
    }

    pub fn client(&self) -> &FormClient {
        &self.client
    }

    /// Find the CSRF token: cookie, then meta tag, then hidden input on the
    /// page or in the mounted form.
    pub fn csrf_token(&self) -> Option<String> {
        if let Some(header) = self.client.cookie_header() {
            self.page.absorb_cookies(&header);
        }

        let from_page = self.page.read(|doc| {
            if let Some(token) = doc.cookie(CSRF_COOKIE) {
                trace!("csrf token from cookie");
                return Some(token);
            }
            if let Some(token) = doc
                .meta
                .get(CSRF_META)
                .filter(|v| !v.is_empty() && v.as_str() != "None")
            {
                trace!("csrf token from meta tag");
                return Some(token.clone());
            }
            if let Some(token) = doc.hidden_input(CSRF_INPUT) {
                trace!("csrf token from page input");
                return Some(token.to_owned());
            }
            doc.modal
                .as_ref()
                .and_then(|m| m.form.hidden_value(CSRF_INPUT))
                .map(String::from)
        });

        if from_page.is_none() {
            debug!("no csrf token on the page");
        }
        from_page
    }

    // ── Form Service ─────────────────────────────────────────────────

    /// Fetch a form fragment. Any failure is a `FormLoad`.
    pub async fn fetch_form(&self, url: &str) -> Result<String, CoreError> {
        self.client.fetch_form(url).await.map_err(|e| match e {
            estatedesk_api::Error::FormLoad { url, reason } => CoreError::FormLoad { url, reason },
            other => CoreError::FormLoad {
                url: url.to_owned(),
                reason: other.user_message(),
            },
        })
    }

    /// Submit a serialized form. Never fails; see [`SubmissionResult`].
    pub async fn submit_form(&self, url: &str, payload: &FormPayload) -> SubmissionResult {
        let csrf = self.csrf_token();
        self.client.submit_form(url, payload, csrf.as_deref()).await
    }

    // ── Record API ───────────────────────────────────────────────────

    pub async fn delete(&self, url: &str) -> Result<ActionReply, CoreError> {
        let csrf = self.csrf_token();
        self.client
            .delete(url, csrf.as_deref())
            .await
            .map_err(|e| record_error(e, |message| CoreError::DeleteFailed { message }))
    }

    /// `DELETE` with a JSON body listing the records to remove.
    pub async fn batch_delete(&self, url: &str, body: &Value) -> Result<ActionReply, CoreError> {
        let csrf = self.csrf_token();
        self.client
            .delete_with_body(url, body, csrf.as_deref())
            .await
            .map_err(|e| record_error(e, |message| CoreError::DeleteFailed { message }))
    }

    pub async fn post_action(&self, url: &str, body: &Value) -> Result<ActionReply, CoreError> {
        let csrf = self.csrf_token();
        self.client
            .post_action(url, body, csrf.as_deref())
            .await
            .map_err(|e| record_error(e, |message| CoreError::ActionFailed { message }))
    }

    pub async fn payment_record(&self, url: &str) -> Result<PaymentRecordDetail, CoreError> {
        self.client.record(url).await.map_err(CoreError::from)
    }

    pub async fn lookup_properties(&self, community_id: &str) -> Result<Vec<PropertyOption>, CoreError> {
        self.client
            .properties_by_community(community_id)
            .await
            .map_err(CoreError::from)
    }

    // ── Error painting ───────────────────────────────────────────────

    /// Mark the fields of the mounted form named in `errors`. Returns
    /// `false` if `handle` is no longer mounted.
    pub fn apply_field_errors(&self, handle: ModalHandle, errors: &FieldErrors) -> bool {
        self.modal
            .with_form(handle, |form| form.apply_field_errors(errors))
            .is_some()
    }
}

/// A site that never answered is a transport failure; anything the server
/// said goes through `refused`.
fn record_error(e: estatedesk_api::Error, refused: impl FnOnce(String) -> CoreError) -> CoreError {
    if e.status().is_none() && e.is_transient() {
        debug!(error = %e, "record api unreachable");
        CoreError::Transport {
            message: e.user_message(),
        }
    } else {
        refused(e.user_message())
    }
}
