// ── Status transitions ──
//
// `POST <base>/<id>/<action>/` endpoints: maintenance request assign /
// start / complete / close / reopen, bill status and payment method. A
// transition may ask for confirmation first, or for one required input
// collected through a small modal form.

use std::sync::Arc;

use futures::FutureExt;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::bridge::FormBridge;
use crate::config::EngineSettings;
use crate::error::CoreError;
use crate::form::escape_html;
use crate::modal::{ConfirmOutcome, Dismissal, ModalController, ModalHandle, ModalSession};
use crate::notify::Notifier;
use crate::tabs::TabMemory;

// ── Confirmation ────────────────────────────────────────────────────

/// Blocking yes/no question put to the user.
pub trait ConfirmPrompt: Send + Sync {
    fn confirm(&self, message: &str) -> bool;
}

impl<F> ConfirmPrompt for F
where
    F: Fn(&str) -> bool + Send + Sync,
{
    fn confirm(&self, message: &str) -> bool {
        self(message)
    }
}

/// Answers yes to everything (`--yes`).
#[derive(Debug, Clone, Copy, Default)]
pub struct AutoConfirm;

impl ConfirmPrompt for AutoConfirm {
    fn confirm(&self, _message: &str) -> bool {
        true
    }
}

// ── Action catalogue ────────────────────────────────────────────────

/// The single input an action requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActionInput {
    /// JSON key of the request body.
    pub field: &'static str,
    pub label: &'static str,
    pub multiline: bool,
    /// `(value, label)` pairs; empty means free text.
    pub choices: &'static [(&'static str, &'static str)],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionAction {
    /// Last path segment of the endpoint.
    pub name: &'static str,
    pub label: &'static str,
    /// Question asked before posting; `{id}` is replaced by the record id.
    pub confirm: Option<&'static str>,
    pub input: Option<ActionInput>,
}

/// How a transition ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum TransitionOutcome {
    /// The user said no; nothing was sent.
    Declined,
    Applied,
    /// The server refused or was unreachable; the page is unchanged.
    Failed,
}

/// `<base>/<id>/<action>/`.
pub fn action_url(base: &str, id: &str, action: &str) -> String {
    format!("{}/{id}/{action}/", base.trim_end_matches('/'))
}

// ── StatusTransition ────────────────────────────────────────────────

#[derive(Clone)]
pub struct StatusTransition {
    inner: Arc<TransitionInner>,
}

struct TransitionInner {
    bridge: FormBridge,
    modal: ModalController,
    notifier: Notifier,
    tabs: TabMemory,
    settings: EngineSettings,
    prompt: Arc<dyn ConfirmPrompt>,
}

impl StatusTransition {
    pub fn new(
        bridge: FormBridge,
        modal: ModalController,
        notifier: Notifier,
        tabs: TabMemory,
        settings: EngineSettings,
        prompt: Arc<dyn ConfirmPrompt>,
    ) -> Self {
        Self {
            inner: Arc::new(TransitionInner {
                bridge,
                modal,
                notifier,
                tabs,
                settings,
                prompt,
            }),
        }
    }

    /// Ask (when `confirm_text` is given), then post the action.
    ///
    /// Success notifies and reloads keeping tab and query, returning once
    /// the reload has been issued; failure only notifies.
    pub async fn perform(
        &self,
        base: &str,
        id: &str,
        action: &str,
        payload: Option<Value>,
        confirm_text: Option<&str>,
    ) -> TransitionOutcome {
        let inner = &self.inner;
        if let Some(question) = confirm_text {
            if !inner.prompt.confirm(question) {
                debug!(action, id, "transition declined");
                return TransitionOutcome::Declined;
            }
        }

        inner.tabs.save();
        let url = action_url(base, id, action);
        let body = payload.unwrap_or_else(|| Value::Object(Map::new()));

        match inner.bridge.post_action(&url, &body).await {
            Ok(reply) => {
                inner.notifier.success(
                    reply
                        .message
                        .unwrap_or_else(|| format!("'{action}' applied to #{id}")),
                );
                self.reload().await;
                TransitionOutcome::Applied
            }
            Err(e) => {
                warn!(%url, error = %e, "transition failed");
                inner
                    .notifier
                    .error(format!("Failed to {action} #{id}: {}", e.user_message()));
                TransitionOutcome::Failed
            }
        }
    }

    /// Run a catalogued action, asking its confirmation question.
    ///
    /// Actions that need an input must go through [`prompt`](Self::prompt)
    /// or supply `value`.
    pub async fn run(
        &self,
        base: &str,
        id: &str,
        action: &TransitionAction,
        value: Option<&str>,
    ) -> Result<TransitionOutcome, CoreError> {
        let payload = match (action.input, value) {
            (Some(input), Some(value)) => {
                check_input(&input, value)?;
                Some(single_field(input.field, value))
            }
            (Some(input), None) => {
                return Err(CoreError::Validation {
                    message: format!("{} is required", input.label),
                });
            }
            (None, _) => None,
        };
        let question = action.confirm.map(|q| q.replace("{id}", id));
        Ok(self
            .perform(base, id, action.name, payload, question.as_deref())
            .await)
    }

    /// Open the input form for an action that needs one. `None` if the
    /// action takes no input.
    pub fn prompt(&self, base: &str, id: &str, action: &TransitionAction) -> Option<PromptSession> {
        let input = action.input?;
        let inner = &self.inner;
        inner.tabs.save();

        let url = action_url(base, id, action.name);
        let transition = self.clone();
        let handler = Arc::new(move |handle: ModalHandle| {
            let transition = transition.clone();
            let url = url.clone();
            async move { transition.submit_prompt(handle, input, &url).await }.boxed()
        });

        let handle = inner.modal.open(
            ModalSession::new(action.label, input_form(&input)).with_confirm(action.label, handler),
        );

        Some(PromptSession {
            handle,
            field: input.field,
            modal: inner.modal.clone(),
        })
    }

    async fn submit_prompt(&self, handle: ModalHandle, input: ActionInput, url: &str) -> ConfirmOutcome {
        let inner = &self.inner;
        let Some(value) = inner.modal.form(handle).and_then(|f| f.value(input.field)) else {
            return ConfirmOutcome::StayOpen;
        };

        let value = value.trim().to_owned();
        if let Err(e) = check_input(&input, &value) {
            inner.notifier.error(e.user_message());
            return ConfirmOutcome::StayOpen;
        }

        inner.modal.set_confirm_busy(handle, true);
        let result = inner
            .bridge
            .post_action(url, &single_field(input.field, &value))
            .await;

        if !inner.modal.is_active(handle) {
            warn!(%handle, url, "action finished after its modal was closed, ignoring");
            return ConfirmOutcome::StayOpen;
        }

        match result {
            Ok(reply) => {
                inner
                    .notifier
                    .success(reply.message.unwrap_or_else(|| "Saved".to_owned()));
                let transition = self.clone();
                tokio::spawn(async move { transition.reload().await });
                ConfirmOutcome::Close
            }
            Err(e) => {
                inner.notifier.error(e.user_message());
                inner.modal.set_confirm_busy(handle, false);
                ConfirmOutcome::StayOpen
            }
        }
    }

    async fn reload(&self) {
        let settings = &self.inner.settings;
        self.inner
            .tabs
            .reload(settings.reload_delay, settings.cache_bust)
            .await;
    }
}

fn check_input(input: &ActionInput, value: &str) -> Result<(), CoreError> {
    if value.trim().is_empty() {
        return Err(CoreError::Validation {
            message: format!("{} is required", input.label),
        });
    }
    if !input.choices.is_empty() && !input.choices.iter().any(|(v, _)| *v == value) {
        let allowed: Vec<&str> = input.choices.iter().map(|(v, _)| *v).collect();
        return Err(CoreError::Validation {
            message: format!("{} must be one of: {}", input.label, allowed.join(", ")),
        });
    }
    Ok(())
}

fn single_field(field: &str, value: &str) -> Value {
    let mut body = Map::new();
    body.insert(field.to_owned(), Value::String(value.to_owned()));
    Value::Object(body)
}

/// Markup of the one-field form shown by [`StatusTransition::prompt`].
fn input_form(input: &ActionInput) -> String {
    let id = format!("id_{}", input.field);
    let label = format!(
        "<label for=\"{id}\">{}</label>",
        escape_html(input.label)
    );
    let control = if !input.choices.is_empty() {
        let options: String = input
            .choices
            .iter()
            .map(|(value, text)| {
                format!(
                    "<option value=\"{}\">{}</option>",
                    escape_html(value),
                    escape_html(text)
                )
            })
            .collect();
        format!(
            "<select name=\"{}\" id=\"{id}\" required><option value=\"\">---------</option>{options}</select>",
            input.field
        )
    } else if input.multiline {
        format!("<textarea name=\"{}\" id=\"{id}\" rows=\"4\" required></textarea>", input.field)
    } else {
        format!("<input type=\"text\" name=\"{}\" id=\"{id}\" required>", input.field)
    };
    format!("<form class=\"action-form\">{label}{control}</form>")
}

// ── Prompt session ──────────────────────────────────────────────────

/// A mounted action-input modal.
pub struct PromptSession {
    handle: ModalHandle,
    field: &'static str,
    modal: ModalController,
}

impl PromptSession {
    pub fn handle(&self) -> ModalHandle {
        self.handle
    }

    pub fn is_open(&self) -> bool {
        self.modal.is_active(self.handle)
    }

    pub fn set_value(&self, value: &str) -> Result<(), CoreError> {
        self.modal
            .with_form(self.handle, |form| form.set_value(self.field, value))
            .ok_or(CoreError::ModalClosed)??;
        Ok(())
    }

    pub async fn submit(&self) -> Option<ConfirmOutcome> {
        self.modal.click_confirm(self.handle).await
    }

    pub fn cancel(&self) -> bool {
        self.modal.dismiss(self.handle, Dismissal::Cancel)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use crate::form::FormDocument;

    use super::*;

    const STATUS: ActionInput = ActionInput {
        field: "status",
        label: "Status",
        multiline: false,
        choices: &[("unpaid", "Unpaid"), ("paid", "Paid")],
    };

    #[test]
    fn action_url_joins_segments() {
        assert_eq!(
            action_url("/api/maintenance/requests/", "8", "assign"),
            "/api/maintenance/requests/8/assign/"
        );
        assert_eq!(
            action_url("/admin/api/bills", "3", "update-status"),
            "/admin/api/bills/3/update-status/"
        );
    }

    #[test]
    fn input_form_parses_back() {
        let form = FormDocument::parse(&input_form(&STATUS));
        let field = form.field("status").unwrap();
        assert!(field.required);
        assert_eq!(field.options.len(), 3);
        assert_eq!(field.label.as_deref(), Some("Status"));
        assert_eq!(form.missing_required(), ["status"]);
    }

    #[test]
    fn check_input_enforces_choices() {
        assert!(check_input(&STATUS, "paid").is_ok());
        assert!(check_input(&STATUS, " ").is_err());
        let err = check_input(&STATUS, "refunded").unwrap_err();
        assert_eq!(err.user_message(), "Status must be one of: unpaid, paid");
    }

    #[test]
    fn closures_are_prompts() {
        let no = |_: &str| false;
        assert!(!no.confirm("Close this request?"));
        assert!(AutoConfirm.confirm("anything"));
    }
}
