// ── CRUD workflow ──
//
// add / edit / delete through a modal:
//
//   Idle → FormLoading → FormDisplayed → Submitting →
//       Succeeded        (toast, close, reload keeping the tab)
//     | ValidationFailed (toast, paint field errors, stay open)
//     | TransportFailed  (toast, stay open)
//
// After a failure the confirm button is re-enabled, so the session is back
// to accepting input while still reporting the last outcome.

use std::sync::Arc;

use estatedesk_api::{FieldErrors, NON_FIELD_ERRORS, SubmissionResult};
use futures::FutureExt;
use futures::future::BoxFuture;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::bridge::FormBridge;
use crate::config::EngineSettings;
use crate::error::CoreError;
use crate::form::{FormDocument, FormError, escape_html};
use crate::modal::{ConfirmHandler, ConfirmOutcome, Dismissal, ModalController, ModalHandle, ModalSession};
use crate::notify::Notifier;
use crate::tabs::TabMemory;

// ── Hooks ───────────────────────────────────────────────────────────

/// Runs once the form is mounted (after the on-load delay).
pub type OnLoadHook = Arc<dyn Fn(FormContext) -> BoxFuture<'static, ()> + Send + Sync>;

/// Runs after the user changes a field; receives the field name.
pub type FieldChangeHook =
    Arc<dyn Fn(FormContext, String) -> BoxFuture<'static, ()> + Send + Sync>;

/// Checks the form before it is sent. Field errors keep the modal open
/// without a request.
pub type BeforeSubmitHook =
    Arc<dyn Fn(&FormDocument) -> Result<(), FieldErrors> + Send + Sync>;

/// What a hook may touch: the mounted form and the server.
#[derive(Clone)]
pub struct FormContext {
    pub handle: ModalHandle,
    pub modal: ModalController,
    pub bridge: FormBridge,
    pub notifier: Notifier,
}

impl FormContext {
    pub fn is_active(&self) -> bool {
        self.modal.is_active(self.handle)
    }

    pub fn value(&self, name: &str) -> Option<String> {
        self.modal.form(self.handle).and_then(|form| form.value(name))
    }

    pub fn with_form<R>(&self, f: impl FnOnce(&mut FormDocument) -> R) -> Option<R> {
        self.modal.with_form(self.handle, f)
    }
}

// ── Configuration ───────────────────────────────────────────────────

/// One add/edit request.
#[derive(Clone)]
pub struct CrudRequestConfig {
    /// Collection root of the form endpoint, e.g. `/admin/forms/owner/`.
    pub form_url: String,
    pub title: Option<String>,
    pub item_name: String,
    /// `None` creates, `Some` edits.
    pub record_id: Option<String>,
    pub on_load: Option<OnLoadHook>,
    pub on_field_change: Option<FieldChangeHook>,
    pub before_submit: Option<BeforeSubmitHook>,
}

impl CrudRequestConfig {
    pub fn new(form_url: impl Into<String>, item_name: impl Into<String>) -> Self {
        Self {
            form_url: form_url.into(),
            title: None,
            item_name: item_name.into(),
            record_id: None,
            on_load: None,
            on_field_change: None,
            before_submit: None,
        }
    }

    pub fn with_record(mut self, id: impl Into<String>) -> Self {
        self.record_id = Some(id.into());
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Add an on-load hook. Hooks run in the order they were added.
    pub fn with_on_load(mut self, hook: OnLoadHook) -> Self {
        self.on_load = Some(match self.on_load.take() {
            Some(first) => Arc::new(move |ctx: FormContext| {
                let (first, then) = (Arc::clone(&first), Arc::clone(&hook));
                async move {
                    first(ctx.clone()).await;
                    then(ctx).await;
                }
                .boxed()
            }),
            None => hook,
        });
        self
    }

    /// Add a field-change hook. Hooks run in the order they were added.
    pub fn with_on_field_change(mut self, hook: FieldChangeHook) -> Self {
        self.on_field_change = Some(match self.on_field_change.take() {
            Some(first) => Arc::new(move |ctx: FormContext, field: String| {
                let (first, then) = (Arc::clone(&first), Arc::clone(&hook));
                async move {
                    first(ctx.clone(), field.clone()).await;
                    then(ctx, field).await;
                }
                .boxed()
            }),
            None => hook,
        });
        self
    }

    pub fn with_before_submit(mut self, hook: BeforeSubmitHook) -> Self {
        self.before_submit = Some(hook);
        self
    }

    /// `<root>/new/` when creating, `<root>/<id>/` when editing.
    pub fn target_url(&self) -> String {
        let root = self.form_url.trim_end_matches('/');
        match self.record_id.as_deref() {
            Some(id) => format!("{root}/{id}/"),
            None => format!("{root}/new/"),
        }
    }

    pub fn default_title(&self) -> String {
        match self.record_id {
            Some(_) => format!("Edit {}", self.item_name),
            None => format!("New {}", self.item_name),
        }
    }
}

impl std::fmt::Debug for CrudRequestConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CrudRequestConfig")
            .field("form_url", &self.form_url)
            .field("title", &self.title)
            .field("item_name", &self.item_name)
            .field("record_id", &self.record_id)
            .field("on_load", &self.on_load.is_some())
            .field("on_field_change", &self.on_field_change.is_some())
            .field("before_submit", &self.before_submit.is_some())
            .finish()
    }
}

/// One delete request.
#[derive(Debug, Clone)]
pub struct DeleteConfig {
    pub delete_url: String,
    pub item_name: String,
    /// Record name shown in the warning.
    pub name: Option<String>,
}

// ── State ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum WorkflowState {
    Idle,
    FormLoading,
    FormDisplayed,
    Submitting,
    Succeeded,
    ValidationFailed,
    TransportFailed,
}

type StateTx = Arc<watch::Sender<WorkflowState>>;

fn new_state(initial: WorkflowState) -> StateTx {
    Arc::new(watch::channel(initial).0)
}

// ── Workflow ────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct CrudWorkflow {
    inner: Arc<WorkflowInner>,
}

struct WorkflowInner {
    bridge: FormBridge,
    modal: ModalController,
    notifier: Notifier,
    tabs: TabMemory,
    settings: EngineSettings,
}

impl CrudWorkflow {
    pub fn new(
        bridge: FormBridge,
        modal: ModalController,
        notifier: Notifier,
        tabs: TabMemory,
        settings: EngineSettings,
    ) -> Self {
        Self {
            inner: Arc::new(WorkflowInner {
                bridge,
                modal,
                notifier,
                tabs,
                settings,
            }),
        }
    }

    /// Open the create form. A `record_id` on the config is ignored.
    pub async fn add_item(&self, mut config: CrudRequestConfig) -> Option<CrudSession> {
        if let Some(id) = config.record_id.take() {
            debug!(%id, "add_item ignores record id");
        }
        self.open_form(config).await
    }

    /// Open the edit form for `config.record_id`.
    pub async fn edit_item(&self, config: CrudRequestConfig) -> Option<CrudSession> {
        if config.record_id.is_none() {
            self.inner
                .notifier
                .error(format!("No {} selected", config.item_name));
            return None;
        }
        self.open_form(config).await
    }

    /// Open the delete confirmation.
    pub fn confirm_delete(&self, config: DeleteConfig) -> DeleteSession {
        let inner = &self.inner;
        inner.tabs.save();

        let subject = match config.name.as_deref() {
            Some(name) => format!(
                "{} \"<strong>{}</strong>\"",
                escape_html(&config.item_name),
                escape_html(name)
            ),
            None => format!("this {}", escape_html(&config.item_name)),
        };
        let body = format!(
            "<p>Are you sure you want to delete {subject}?</p>\
             <p class=\"text-danger\">This action cannot be undone.</p>"
        );

        let state = new_state(WorkflowState::FormDisplayed);
        let handler = self.delete_handler(Arc::new(config.clone()), Arc::clone(&state));
        let title = format!("Delete {}", config.item_name);
        let handle = inner
            .modal
            .open(ModalSession::new(title, body).with_confirm("Delete", handler));

        DeleteSession {
            handle,
            modal: inner.modal.clone(),
            state,
        }
    }

    async fn open_form(&self, config: CrudRequestConfig) -> Option<CrudSession> {
        let inner = &self.inner;
        let ticket = inner.modal.begin();
        let state = new_state(WorkflowState::FormLoading);

        inner.tabs.save();
        inner
            .notifier
            .info(format!("Loading {} form...", config.item_name));

        let url = config.target_url();
        let fetched = inner.bridge.fetch_form(&url).await;

        if !inner.modal.is_current(ticket) {
            debug!(%url, "discarding form response from a superseded request");
            return None;
        }

        let html = match fetched {
            Ok(html) => html,
            Err(e) => {
                warn!(%url, error = %e, "form load failed");
                inner.notifier.error(format!(
                    "Failed to load {} form: {}",
                    config.item_name,
                    e.user_message()
                ));
                state.send_replace(WorkflowState::Idle);
                return None;
            }
        };

        let title = config
            .title
            .clone()
            .unwrap_or_else(|| config.default_title());
        let config = Arc::new(config);
        let handler = self.submit_handler(Arc::clone(&config), url, Arc::clone(&state));
        let handle = inner
            .modal
            .open(ModalSession::new(title, html).with_confirm("Save", handler));
        state.send_replace(WorkflowState::FormDisplayed);

        let context = FormContext {
            handle,
            modal: inner.modal.clone(),
            bridge: inner.bridge.clone(),
            notifier: inner.notifier.clone(),
        };

        let on_load = config.on_load.clone().map(|hook| {
            let context = context.clone();
            let delay = inner.settings.on_load_delay;
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                if context.is_active() {
                    hook(context).await;
                }
            })
        });

        Some(CrudSession {
            config,
            context,
            state,
            on_load,
        })
    }

    fn submit_handler(&self, config: Arc<CrudRequestConfig>, url: String, state: StateTx) -> ConfirmHandler {
        let workflow = self.clone();
        Arc::new(move |handle| {
            let workflow = workflow.clone();
            let config = Arc::clone(&config);
            let url = url.clone();
            let state = Arc::clone(&state);
            async move { workflow.submit(handle, &config, &url, &state).await }.boxed()
        })
    }

    async fn submit(
        &self,
        handle: ModalHandle,
        config: &CrudRequestConfig,
        url: &str,
        state: &StateTx,
    ) -> ConfirmOutcome {
        let inner = &self.inner;
        let Some(form) = inner.modal.form(handle) else {
            return ConfirmOutcome::StayOpen;
        };

        if let Some(check) = &config.before_submit {
            if let Err(errors) = check(&form) {
                debug!(%handle, fields = errors.len(), "form refused before sending");
                let message = errors
                    .values()
                    .next()
                    .cloned()
                    .unwrap_or_else(|| validation_summary(&errors));
                inner.notifier.error(message);
                inner.bridge.apply_field_errors(handle, &errors);
                state.send_replace(WorkflowState::ValidationFailed);
                return ConfirmOutcome::StayOpen;
            }
        }
        let payload = form.serialize();

        state.send_replace(WorkflowState::Submitting);
        inner.modal.set_confirm_busy(handle, true);
        debug!(%handle, url, fields = payload.len(), "submitting form");

        let result = inner.bridge.submit_form(url, &payload).await;

        if !inner.modal.is_active(handle) {
            warn!(%handle, url, "submission finished after its modal was closed, ignoring");
            return ConfirmOutcome::StayOpen;
        }

        match result {
            SubmissionResult::Success { message, .. } => {
                inner.notifier.success(
                    message.unwrap_or_else(|| format!("{} saved successfully", config.item_name)),
                );
                state.send_replace(WorkflowState::Succeeded);
                self.spawn_reload();
                ConfirmOutcome::Close
            }
            SubmissionResult::ValidationFailure { field_errors } => {
                inner.notifier.error(validation_summary(&field_errors));
                inner.modal.set_confirm_busy(handle, false);
                inner.bridge.apply_field_errors(handle, &field_errors);
                state.send_replace(WorkflowState::ValidationFailed);
                ConfirmOutcome::StayOpen
            }
            SubmissionResult::TransportError { message } => {
                inner
                    .notifier
                    .error(format!("Failed to save {}: {message}", config.item_name));
                inner.modal.set_confirm_busy(handle, false);
                state.send_replace(WorkflowState::TransportFailed);
                ConfirmOutcome::StayOpen
            }
        }
    }

    fn delete_handler(&self, config: Arc<DeleteConfig>, state: StateTx) -> ConfirmHandler {
        let workflow = self.clone();
        Arc::new(move |handle| {
            let workflow = workflow.clone();
            let config = Arc::clone(&config);
            let state = Arc::clone(&state);
            async move { workflow.delete(handle, &config, &state).await }.boxed()
        })
    }

    async fn delete(&self, handle: ModalHandle, config: &DeleteConfig, state: &StateTx) -> ConfirmOutcome {
        let inner = &self.inner;
        state.send_replace(WorkflowState::Submitting);
        inner.modal.set_confirm_busy(handle, true);
        debug!(%handle, url = %config.delete_url, "deleting record");

        let result = inner.bridge.delete(&config.delete_url).await;

        if !inner.modal.is_active(handle) {
            warn!(%handle, url = %config.delete_url, "delete finished after its modal was closed, ignoring");
            return ConfirmOutcome::StayOpen;
        }

        match result {
            Ok(reply) => {
                inner.notifier.success(
                    reply
                        .message
                        .unwrap_or_else(|| format!("{} deleted successfully", config.item_name)),
                );
                state.send_replace(WorkflowState::Succeeded);
                self.spawn_reload();
                ConfirmOutcome::Close
            }
            Err(e) => {
                inner.notifier.error(format!(
                    "Failed to delete {}: {}",
                    config.item_name,
                    e.user_message()
                ));
                inner.modal.set_confirm_busy(handle, false);
                state.send_replace(WorkflowState::TransportFailed);
                ConfirmOutcome::StayOpen
            }
        }
    }

    fn spawn_reload(&self) {
        let tabs = self.inner.tabs.clone();
        let delay = self.inner.settings.reload_delay;
        let cache_bust = self.inner.settings.cache_bust;
        tokio::spawn(async move { tabs.reload(delay, cache_bust).await });
    }
}

/// Toast text for a validation failure.
fn validation_summary(errors: &FieldErrors) -> String {
    errors
        .get(NON_FIELD_ERRORS)
        .cloned()
        .unwrap_or_else(|| "Please correct the highlighted fields".to_owned())
}

// ── Sessions ────────────────────────────────────────────────────────

/// A mounted add/edit form.
pub struct CrudSession {
    config: Arc<CrudRequestConfig>,
    context: FormContext,
    state: StateTx,
    on_load: Option<JoinHandle<()>>,
}

impl CrudSession {
    pub fn handle(&self) -> ModalHandle {
        self.context.handle
    }

    pub fn config(&self) -> &CrudRequestConfig {
        &self.config
    }

    pub fn state(&self) -> WorkflowState {
        *self.state.borrow()
    }

    pub fn is_open(&self) -> bool {
        self.context.is_active()
    }

    pub fn form(&self) -> Option<FormDocument> {
        self.context.modal.form(self.context.handle)
    }

    /// Wait for the on-load hook, if one was scheduled.
    pub async fn ready(&mut self) {
        if let Some(task) = self.on_load.take() {
            if let Err(e) = task.await {
                warn!(error = %e, "on-load hook panicked");
            }
        }
    }

    /// Change a field as the user would, then run the field-change hook.
    pub async fn set_field(&self, name: &str, value: &str) -> Result<(), CoreError> {
        self.context
            .with_form(|form| form.set_value(name, value))
            .ok_or(CoreError::ModalClosed)??;

        if let Some(hook) = self.config.on_field_change.clone() {
            hook(self.context.clone(), name.to_owned()).await;
        }
        Ok(())
    }

    /// Append an empty owner row to a property form; returns its index.
    pub fn add_owner_row(&self) -> Result<usize, CoreError> {
        self.context
            .with_form(FormDocument::add_owner_row)
            .ok_or(CoreError::ModalClosed)
    }

    /// Remove owner row `index`, renumbering the rows after it. The last
    /// remaining row is kept and a warning is shown.
    pub fn remove_owner_row(&self, index: usize) -> Result<(), CoreError> {
        let removed = self
            .context
            .with_form(|form| form.remove_owner_row(index))
            .ok_or(CoreError::ModalClosed)?;
        if let Err(FormError::LastOwnerRow) = removed {
            self.context
                .notifier
                .warning("At least one owner is required");
        }
        removed.map_err(CoreError::from)
    }

    /// Press Save.
    pub async fn submit(&self) -> Option<ConfirmOutcome> {
        self.context.modal.click_confirm(self.context.handle).await
    }

    pub fn cancel(&self) -> bool {
        self.context
            .modal
            .dismiss(self.context.handle, Dismissal::Cancel)
    }
}

/// A mounted delete confirmation.
pub struct DeleteSession {
    handle: ModalHandle,
    modal: ModalController,
    state: StateTx,
}

impl DeleteSession {
    pub fn handle(&self) -> ModalHandle {
        self.handle
    }

    pub fn state(&self) -> WorkflowState {
        *self.state.borrow()
    }

    pub fn is_open(&self) -> bool {
        self.modal.is_active(self.handle)
    }

    pub async fn confirm(&self) -> Option<ConfirmOutcome> {
        self.modal.click_confirm(self.handle).await
    }

    pub fn cancel(&self) -> bool {
        self.modal.dismiss(self.handle, Dismissal::Cancel)
    }
}
