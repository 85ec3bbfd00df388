// ── Notifier ──
//
// Transient feedback messages. At most one toast is mounted; showing a new
// one evicts the old. Removal after the TTL only touches the toast that
// scheduled it, so a later toast is never cut short by an earlier timer.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tracing::{info, warn};

use crate::page::{MountedToast, Page, PageEvent};

/// Default time a toast stays on screen.
pub const DEFAULT_TOAST_TTL: Duration = Duration::from_millis(3000);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum NoticeKind {
    Success,
    Error,
    Info,
    Warning,
}

/// Identity of one shown toast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ToastId(u64);

#[derive(Clone)]
pub struct Notifier {
    page: Page,
    next_id: Arc<AtomicU64>,
    ttl: Duration,
}

impl Notifier {
    pub fn new(page: Page) -> Self {
        Self::with_ttl(page, DEFAULT_TOAST_TTL)
    }

    pub fn with_ttl(page: Page, ttl: Duration) -> Self {
        Self {
            page,
            next_id: Arc::new(AtomicU64::new(1)),
            ttl,
        }
    }

    /// Show a toast with the default TTL.
    pub fn show(&self, message: impl Into<String>, kind: NoticeKind) -> ToastId {
        self.show_for(message, kind, self.ttl)
    }

    /// Show a toast, replacing any toast on screen.
    ///
    /// Removal is scheduled on the current tokio runtime; outside a
    /// runtime the toast stays until the next one replaces it.
    pub fn show_for(&self, message: impl Into<String>, kind: NoticeKind, ttl: Duration) -> ToastId {
        let message = message.into();
        let id = ToastId(self.next_id.fetch_add(1, Ordering::Relaxed));

        match kind {
            NoticeKind::Success | NoticeKind::Info => info!(%kind, "{message}"),
            NoticeKind::Error | NoticeKind::Warning => warn!(%kind, "{message}"),
        }

        self.page.update(|doc, events| {
            if let Some(old) = doc.toast.take() {
                events.push(PageEvent::ToastRemoved { id: old.id });
            }
            doc.toast = Some(MountedToast {
                id,
                message: message.clone(),
                kind,
            });
            events.push(PageEvent::ToastShown { id, message, kind });
        });

        if let Ok(runtime) = tokio::runtime::Handle::try_current() {
            let page = self.page.clone();
            runtime.spawn(async move {
                tokio::time::sleep(ttl).await;
                remove_if_current(&page, id);
            });
        }

        id
    }

    pub fn success(&self, message: impl Into<String>) -> ToastId {
        self.show(message, NoticeKind::Success)
    }

    pub fn error(&self, message: impl Into<String>) -> ToastId {
        self.show(message, NoticeKind::Error)
    }

    pub fn info(&self, message: impl Into<String>) -> ToastId {
        self.show(message, NoticeKind::Info)
    }

    pub fn warning(&self, message: impl Into<String>) -> ToastId {
        self.show(message, NoticeKind::Warning)
    }
}

fn remove_if_current(page: &Page, id: ToastId) {
    page.update(|doc, events| {
        if doc.toast.as_ref().is_some_and(|t| t.id == id) {
            doc.toast = None;
            events.push(PageEvent::ToastRemoved { id });
        }
    });
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn new_toast_evicts_previous() {
        let page = Page::at("/");
        let notifier = Notifier::new(page.clone());

        notifier.success("A");
        let b = notifier.error("B");

        let toast = page.toast().unwrap();
        assert_eq!(toast.id, b);
        assert_eq!(toast.message, "B");
        assert_eq!(toast.kind, NoticeKind::Error);
    }

    #[tokio::test(start_paused = true)]
    async fn toast_removed_after_ttl() {
        let page = Page::at("/");
        let notifier = Notifier::new(page.clone());

        notifier.info("Loading Owner form...");
        tokio::time::sleep(Duration::from_millis(2999)).await;
        assert!(page.toast().is_some());

        tokio::time::sleep(Duration::from_millis(2)).await;
        assert!(page.toast().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn stale_timer_leaves_newer_toast() {
        let page = Page::at("/");
        let notifier = Notifier::new(page.clone());

        notifier.info("first");
        tokio::time::sleep(Duration::from_millis(2000)).await;
        let second = notifier.success("second");

        // First toast's timer fires here and must not remove the second.
        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert_eq!(page.toast().unwrap().id, second);

        tokio::time::sleep(Duration::from_millis(1600)).await;
        assert!(page.toast().is_none());
    }

    #[test]
    fn kind_parses_from_str() {
        assert_eq!("warning".parse::<NoticeKind>().unwrap(), NoticeKind::Warning);
        assert_eq!(NoticeKind::Success.to_string(), "success");
    }
}
