// ── Modal controller ──
//
// One modal root per page. Opening a modal tears down whatever was mounted
// before; every later mutation names the `ModalHandle` it was issued, and
// is ignored once that handle is no longer the mounted one. That check is
// what keeps late responses from touching a dialog the user has moved on
// from.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use futures::future::BoxFuture;
use tracing::{debug, trace};

use crate::form::FormDocument;
use crate::page::{MountedModal, Page, PageEvent};

/// Label shown on the confirm button while a request is in flight.
pub const BUSY_LABEL: &str = "Saving...";

/// Generation id of a mounted modal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModalHandle(u64);

impl fmt::Display for ModalHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "modal#{}", self.0)
    }
}

/// Marks one request to show a modal. Goes stale once another request
/// begins or any modal is mounted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntentTicket(u64);

/// What the confirm handler wants done with the modal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmOutcome {
    /// Work finished; tear the modal down.
    Close,
    /// Keep the modal and the user's input (failures).
    StayOpen,
}

/// Ways the user can dismiss a modal without confirming.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "kebab-case")]
pub enum Dismissal {
    Overlay,
    CloseButton,
    Cancel,
    Escape,
}

/// Async confirm callback. Receives the handle of the modal it belongs to.
pub type ConfirmHandler =
    Arc<dyn Fn(ModalHandle) -> BoxFuture<'static, ConfirmOutcome> + Send + Sync>;

/// Everything needed to mount a modal.
#[derive(Clone)]
pub struct ModalSession {
    pub title: String,
    pub body_html: String,
    pub has_footer: bool,
    pub on_confirm: Option<ConfirmHandler>,
    pub confirm_label: String,
    pub cancel_label: String,
    pub escape_closes: bool,
}

impl ModalSession {
    pub fn new(title: impl Into<String>, body_html: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body_html: body_html.into(),
            has_footer: true,
            on_confirm: None,
            confirm_label: "Save".into(),
            cancel_label: "Cancel".into(),
            escape_closes: true,
        }
    }

    pub fn with_confirm(mut self, label: impl Into<String>, handler: ConfirmHandler) -> Self {
        self.confirm_label = label.into();
        self.on_confirm = Some(handler);
        self
    }

    pub fn without_footer(mut self) -> Self {
        self.has_footer = false;
        self
    }

    pub fn escape_closes(mut self, enabled: bool) -> Self {
        self.escape_closes = enabled;
        self
    }
}

impl fmt::Debug for ModalSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModalSession")
            .field("title", &self.title)
            .field("has_footer", &self.has_footer)
            .field("has_confirm", &self.on_confirm.is_some())
            .field("confirm_label", &self.confirm_label)
            .field("escape_closes", &self.escape_closes)
            .finish_non_exhaustive()
    }
}

// ── Controller ──────────────────────────────────────────────────────

#[derive(Clone)]
pub struct ModalController {
    page: Page,
    next: Arc<AtomicU64>,
    intent: Arc<AtomicU64>,
}

impl ModalController {
    pub fn new(page: Page) -> Self {
        Self {
            page,
            next: Arc::new(AtomicU64::new(1)),
            intent: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn page(&self) -> &Page {
        &self.page
    }

    /// Start a request that will open a modal once its content arrives.
    pub fn begin(&self) -> IntentTicket {
        IntentTicket(self.intent.fetch_add(1, Ordering::SeqCst) + 1)
    }

    /// False once a later request began or a modal was opened after
    /// `ticket` was taken.
    pub fn is_current(&self, ticket: IntentTicket) -> bool {
        self.intent.load(Ordering::SeqCst) == ticket.0
    }

    /// Mount `session`, tearing down any modal already open.
    pub fn open(&self, session: ModalSession) -> ModalHandle {
        self.intent.fetch_add(1, Ordering::SeqCst);
        let handle = ModalHandle(self.next.fetch_add(1, Ordering::Relaxed));
        let title = session.title.clone();
        let form = FormDocument::parse(&session.body_html);
        debug!(%handle, %title, "opening modal");

        self.page.update(|doc, events| {
            if let Some(old) = doc.modal.take() {
                events.push(PageEvent::ModalClosed { handle: old.handle });
            }
            doc.modal = Some(MountedModal {
                handle,
                session,
                form,
                busy: false,
            });
            doc.scroll_locked = true;
            events.push(PageEvent::ModalOpened { handle, title });
        });
        handle
    }

    /// Tear down the modal if `handle` is still mounted. Idempotent.
    pub fn close(&self, handle: ModalHandle) -> bool {
        let closed = self.page.update(|doc, events| {
            if doc.modal.as_ref().is_some_and(|m| m.handle == handle) {
                doc.modal = None;
                doc.scroll_locked = false;
                events.push(PageEvent::ModalClosed { handle });
                true
            } else {
                false
            }
        });
        if closed {
            debug!(%handle, "modal closed");
        }
        closed
    }

    pub fn is_active(&self, handle: ModalHandle) -> bool {
        self.active() == Some(handle)
    }

    /// Handle of the mounted modal, if any.
    pub fn active(&self) -> Option<ModalHandle> {
        self.page.read(|doc| doc.modal.as_ref().map(|m| m.handle))
    }

    /// Replace the body of the mounted modal.
    pub fn set_content(&self, handle: ModalHandle, html: impl Into<String>) -> bool {
        let html = html.into();
        let form = FormDocument::parse(&html);
        self.mutate(handle, |modal| {
            modal.session.body_html = html;
            modal.form = form;
        })
        .is_some()
    }

    /// Disable the confirm button (and show the busy label) or re-enable it.
    pub fn set_confirm_busy(&self, handle: ModalHandle, busy: bool) -> bool {
        self.mutate(handle, |modal| modal.busy = busy).is_some()
    }

    /// Scoped access to the mounted form.
    pub fn with_form<R>(
        &self,
        handle: ModalHandle,
        f: impl FnOnce(&mut FormDocument) -> R,
    ) -> Option<R> {
        self.mutate(handle, |modal| f(&mut modal.form))
    }

    /// Copy of the mounted form.
    pub fn form(&self, handle: ModalHandle) -> Option<FormDocument> {
        self.page.read(|doc| {
            doc.modal
                .as_ref()
                .filter(|m| m.handle == handle)
                .map(|m| m.form.clone())
        })
    }

    /// Dismiss without confirming. Escape only counts when the session
    /// allows it.
    pub fn dismiss(&self, handle: ModalHandle, how: Dismissal) -> bool {
        if how == Dismissal::Escape {
            let allowed = self.page.read(|doc| {
                doc.modal
                    .as_ref()
                    .is_some_and(|m| m.handle == handle && m.session.escape_closes)
            });
            if !allowed {
                trace!(%handle, "escape ignored");
                return false;
            }
        }
        debug!(%handle, %how, "modal dismissed");
        self.close(handle)
    }

    /// Press the confirm button.
    ///
    /// Runs the handler and closes the modal only on
    /// [`ConfirmOutcome::Close`]. Returns `None` when the handle is stale
    /// or the button is disabled.
    pub async fn click_confirm(&self, handle: ModalHandle) -> Option<ConfirmOutcome> {
        let handler = self.page.read(|doc| {
            doc.modal
                .as_ref()
                .filter(|m| m.handle == handle && m.session.has_footer && !m.busy)
                .map(|m| m.session.on_confirm.clone())
        })?;

        let outcome = match handler {
            Some(handler) => handler(handle).await,
            None => ConfirmOutcome::Close,
        };

        if outcome == ConfirmOutcome::Close {
            self.close(handle);
        }
        Some(outcome)
    }

    fn mutate<R>(&self, handle: ModalHandle, f: impl FnOnce(&mut MountedModal) -> R) -> Option<R> {
        self.page.update(|doc, events| {
            let modal = doc.modal.as_mut().filter(|m| m.handle == handle)?;
            let result = f(modal);
            events.push(PageEvent::ModalUpdated { handle });
            Some(result)
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use futures::FutureExt;

    use super::*;

    fn controller() -> (Page, ModalController) {
        let page = Page::at("/admin/communities/");
        let modal = ModalController::new(page.clone());
        (page, modal)
    }

    fn counting_handler(outcome: ConfirmOutcome, calls: Arc<AtomicUsize>) -> ConfirmHandler {
        Arc::new(move |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async move { outcome }.boxed()
        })
    }

    #[test]
    fn sequential_opens_keep_one_root() {
        let (page, modal) = controller();
        let first = modal.open(ModalSession::new("First", "<p>a</p>"));
        let second = modal.open(ModalSession::new("Second", "<p>b</p>"));

        assert!(!modal.is_active(first));
        assert!(modal.is_active(second));
        assert_eq!(page.modal_view().unwrap().title, "Second");
        assert!(page.scroll_locked());
    }

    #[test]
    fn close_is_idempotent_and_ignores_stale_handles() {
        let (page, modal) = controller();
        let first = modal.open(ModalSession::new("First", ""));
        let second = modal.open(ModalSession::new("Second", ""));

        assert!(!modal.close(first));
        assert!(modal.is_active(second));

        assert!(modal.close(second));
        assert!(!modal.close(second));
        assert!(page.modal_view().is_none());
        assert!(!page.scroll_locked());
    }

    #[test]
    fn escape_respects_session_flag() {
        let (_, modal) = controller();
        let handle = modal.open(ModalSession::new("Locked", "").escape_closes(false));
        assert!(!modal.dismiss(handle, Dismissal::Escape));
        assert!(modal.is_active(handle));
        assert!(modal.dismiss(handle, Dismissal::Overlay));
        assert!(!modal.is_active(handle));
    }

    #[test]
    fn set_content_reparses_form() {
        let (_, modal) = controller();
        let handle = modal.open(ModalSession::new("Edit", "<p>Loading...</p>"));
        assert!(modal.form(handle).unwrap().fields().is_empty());

        modal.set_content(handle, r#"<input name="name" value="x">"#);
        assert_eq!(modal.form(handle).unwrap().value("name").as_deref(), Some("x"));
    }

    #[tokio::test]
    async fn confirm_closes_only_on_close_outcome() {
        let (_, modal) = controller();
        let calls = Arc::new(AtomicUsize::new(0));

        let handle = modal.open(
            ModalSession::new("Fail", "")
                .with_confirm("Save", counting_handler(ConfirmOutcome::StayOpen, calls.clone())),
        );
        assert_eq!(modal.click_confirm(handle).await, Some(ConfirmOutcome::StayOpen));
        assert!(modal.is_active(handle));

        let handle = modal.open(
            ModalSession::new("Ok", "")
                .with_confirm("Save", counting_handler(ConfirmOutcome::Close, calls.clone())),
        );
        assert_eq!(modal.click_confirm(handle).await, Some(ConfirmOutcome::Close));
        assert!(!modal.is_active(handle));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn opening_any_modal_invalidates_pending_tickets() {
        let (_, modal) = controller();
        let ticket = modal.begin();
        assert!(modal.is_current(ticket));

        modal.open(ModalSession::new("Delete Community", ""));
        assert!(!modal.is_current(ticket));

        let first = modal.begin();
        let second = modal.begin();
        assert!(!modal.is_current(first));
        assert!(modal.is_current(second));
    }

    #[tokio::test]
    async fn busy_confirm_is_ignored() {
        let (page, modal) = controller();
        let calls = Arc::new(AtomicUsize::new(0));
        let handle = modal.open(
            ModalSession::new("Busy", "")
                .with_confirm("Save", counting_handler(ConfirmOutcome::Close, calls.clone())),
        );

        modal.set_confirm_busy(handle, true);
        assert!(page.modal_view().unwrap().busy);
        assert_eq!(modal.click_confirm(handle).await, None);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}
