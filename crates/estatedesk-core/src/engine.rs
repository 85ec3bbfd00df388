// ── Engine ──
//
// Owns one page and wires every component to it. Hosts (the CLI, tests)
// build an `Engine`, subscribe to the page's events, and drive workflows
// by `DomainKind`.

use std::sync::Arc;

use estatedesk_api::{FormClient, TransportConfig};
use secrecy::ExposeSecret;
use tracing::{debug, info};

use crate::batch::BatchDelete;
use crate::bridge::{CSRF_META, FormBridge};
use crate::config::{EngineSettings, SiteConfig};
use crate::detail::{DetailSession, RecordDetail};
use crate::domain::DomainKind;
use crate::error::CoreError;
use crate::modal::ModalController;
use crate::notify::Notifier;
use crate::page::Page;
use crate::tabs::TabMemory;
use crate::transition::{
    ConfirmPrompt, PromptSession, StatusTransition, TransitionAction, TransitionOutcome,
};
use crate::workflow::{CrudSession, CrudWorkflow, DeleteSession};

#[derive(Clone)]
pub struct Engine {
    page: Page,
    notifier: Notifier,
    modal: ModalController,
    bridge: FormBridge,
    crud: CrudWorkflow,
    transitions: StatusTransition,
    batch: BatchDelete,
    detail: RecordDetail,
    settings: EngineSettings,
}

impl Engine {
    /// Connect to a site: build the HTTP client, seed the session cookie
    /// and expose a configured CSRF token the way the page's meta tag would.
    pub fn new(
        site: &SiteConfig,
        settings: EngineSettings,
        page: Page,
        prompt: Arc<dyn ConfirmPrompt>,
    ) -> Result<Self, CoreError> {
        let transport = TransportConfig {
            tls: site.tls.clone(),
            timeout: site.timeout,
            cookie_jar: None,
        }
        .with_cookie_jar();
        let client = FormClient::new(site.base_url.clone(), &transport)?;

        if let Some(session) = &site.session {
            let cookie = format!("{}={}", site.session_cookie_name, session.expose_secret());
            client.add_cookie(&cookie);
            debug!(cookie = %site.session_cookie_name, "seeded session cookie");
        }
        if let Some(token) = &site.csrf_token {
            page.set_meta(CSRF_META, token.clone());
        }

        info!(base_url = %site.base_url, page = %page.location(), "engine ready");
        Ok(Self::with_client(Arc::new(client), page, settings, prompt))
    }

    /// Wire the components around an existing client.
    pub fn with_client(
        client: Arc<FormClient>,
        page: Page,
        settings: EngineSettings,
        prompt: Arc<dyn ConfirmPrompt>,
    ) -> Self {
        let notifier = Notifier::with_ttl(page.clone(), settings.toast_ttl);
        let modal = ModalController::new(page.clone());
        let tabs = TabMemory::new(page.clone());
        let bridge = FormBridge::new(client, page.clone(), modal.clone());

        let crud = CrudWorkflow::new(
            bridge.clone(),
            modal.clone(),
            notifier.clone(),
            tabs.clone(),
            settings.clone(),
        );
        let transitions = StatusTransition::new(
            bridge.clone(),
            modal.clone(),
            notifier.clone(),
            tabs.clone(),
            settings.clone(),
            Arc::clone(&prompt),
        );
        let detail = RecordDetail::new(bridge.clone(), modal.clone(), notifier.clone());
        let batch = BatchDelete::new(
            bridge.clone(),
            notifier.clone(),
            tabs,
            settings.clone(),
            prompt,
        );

        Self {
            page,
            notifier,
            modal,
            bridge,
            crud,
            transitions,
            batch,
            detail,
            settings,
        }
    }

    // ── Components ───────────────────────────────────────────────────

    pub fn page(&self) -> &Page {
        &self.page
    }

    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    pub fn modal(&self) -> &ModalController {
        &self.modal
    }

    pub fn bridge(&self) -> &FormBridge {
        &self.bridge
    }

    pub fn crud(&self) -> &CrudWorkflow {
        &self.crud
    }

    pub fn transitions(&self) -> &StatusTransition {
        &self.transitions
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    // ── Per-domain entry points ──────────────────────────────────────

    /// Open the create form. `Ok(None)` when loading failed (already
    /// reported as a toast).
    pub async fn add(&self, kind: DomainKind) -> Result<Option<CrudSession>, CoreError> {
        let config = kind.crud_config(None)?;
        Ok(self.crud.add_item(config).await)
    }

    pub async fn edit(&self, kind: DomainKind, id: &str) -> Result<Option<CrudSession>, CoreError> {
        let config = kind.crud_config(Some(id))?;
        Ok(self.crud.edit_item(config).await)
    }

    pub fn delete(&self, kind: DomainKind, id: &str, name: Option<&str>) -> DeleteSession {
        self.crud.confirm_delete(kind.delete_config(id, name))
    }

    /// Run a transition, asking its confirmation question. Input actions
    /// need `value`.
    pub async fn transition(
        &self,
        kind: DomainKind,
        id: &str,
        action: &str,
        value: Option<&str>,
    ) -> Result<TransitionOutcome, CoreError> {
        let (base, action) = resolve_action(kind, action)?;
        self.transitions.run(base, id, action, value).await
    }

    /// Open the input form of a transition. `Ok(None)` for actions that
    /// take no input.
    pub fn prompt_transition(
        &self,
        kind: DomainKind,
        id: &str,
        action: &str,
    ) -> Result<Option<PromptSession>, CoreError> {
        let (base, action) = resolve_action(kind, action)?;
        Ok(self.transitions.prompt(base, id, action))
    }

    /// Show a record read-only. `Ok(None)` when loading failed (already
    /// reported as a toast).
    pub async fn view(&self, kind: DomainKind, id: &str) -> Result<Option<DetailSession>, CoreError> {
        let url = kind.detail_url(id).ok_or(CoreError::Unsupported {
            domain: kind.to_string(),
            operation: "view".into(),
        })?;
        Ok(self.detail.show(&url).await)
    }

    pub async fn batch_delete(
        &self,
        kind: DomainKind,
        ids: &[String],
    ) -> Result<TransitionOutcome, CoreError> {
        let plan = kind.batch_plan().ok_or(CoreError::Unsupported {
            domain: kind.to_string(),
            operation: "batch delete".into(),
        })?;
        Ok(self.batch.run(kind.plural(), &plan, ids).await)
    }
}

fn resolve_action(
    kind: DomainKind,
    action: &str,
) -> Result<(&'static str, &'static TransitionAction), CoreError> {
    let base = kind.transition_base().ok_or(CoreError::Unsupported {
        domain: kind.to_string(),
        operation: "transitions".into(),
    })?;
    Ok((base, kind.find_action(action)?))
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("page", &self.page)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}
