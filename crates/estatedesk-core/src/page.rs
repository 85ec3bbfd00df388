// ── Page document model ──
//
// The list page the engine operates on: its location, cookies, meta tags,
// tab bar, and the two overlay slots (one modal, one toast). The host owns
// a `Page` and renders it; the engine mutates it and announces every change
// on a broadcast channel.

use std::fmt;
use std::sync::{Arc, LazyLock, Mutex, MutexGuard};

use indexmap::IndexMap;
use regex::Regex;
use tokio::sync::broadcast;
use tracing::debug;
use url::form_urlencoded;

use crate::form::FormDocument;
use crate::modal::{ModalHandle, ModalSession};
use crate::notify::{NoticeKind, ToastId};

const EVENT_CHANNEL_SIZE: usize = 256;

static SWITCH_TAB_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"switchTab\(this,\s*'([^']+)'\)").expect("switchTab regex is valid")
});

// ── Location ────────────────────────────────────────────────────────

/// Path and query of the current page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Location {
    pub path: String,
    pub query: Vec<(String, String)>,
}

impl Location {
    /// Parse `path?query`. A full URL is accepted and reduced to its path.
    pub fn parse(raw: &str) -> Self {
        let raw = match url::Url::parse(raw) {
            Ok(url) => {
                let mut rel = url.path().to_owned();
                if let Some(q) = url.query() {
                    rel.push('?');
                    rel.push_str(q);
                }
                rel
            }
            Err(_) => raw.to_owned(),
        };

        let (path, query) = raw.split_once('?').unwrap_or((raw.as_str(), ""));
        let path = if path.is_empty() { "/" } else { path };
        Self {
            path: path.to_owned(),
            query: form_urlencoded::parse(query.as_bytes())
                .map(|(k, v)| (k.into_owned(), v.into_owned()))
                .collect(),
        }
    }

    pub fn param(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn query_string(&self) -> String {
        form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.query.iter())
            .finish()
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.query.is_empty() {
            write!(f, "{}", self.path)
        } else {
            write!(f, "{}?{}", self.path, self.query_string())
        }
    }
}

// ── Tabs ────────────────────────────────────────────────────────────

/// One entry of the page's tab bar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tab {
    pub label: String,
    /// Explicit key (a `data-tab` style attribute).
    pub key: Option<String>,
    /// Click handler text, e.g. `switchTab(this, 'bills')`.
    pub onclick: Option<String>,
    pub active: bool,
}

impl Tab {
    pub fn new(label: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            key: Some(key.into()),
            onclick: None,
            active: false,
        }
    }

    /// A tab whose key is only known from its click handler.
    pub fn from_onclick(label: impl Into<String>, onclick: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            key: None,
            onclick: Some(onclick.into()),
            active: false,
        }
    }

    /// Explicit key, else the one named in the click handler.
    pub fn resolved_key(&self) -> Option<String> {
        if let Some(key) = self.key.as_ref().filter(|k| !k.is_empty()) {
            return Some(key.clone());
        }
        let onclick = self.onclick.as_deref()?;
        SWITCH_TAB_RE
            .captures(onclick)
            .map(|caps| caps[1].to_owned())
    }
}

// ── Overlays ────────────────────────────────────────────────────────

/// Where the page is sent after a mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Navigation {
    /// Plain reload of the current URL.
    Reload,
    /// Navigate to `path?query`.
    Assign(String),
}

impl fmt::Display for Navigation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Reload => f.write_str("reload"),
            Self::Assign(target) => f.write_str(target),
        }
    }
}

/// The toast currently on screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountedToast {
    pub id: ToastId,
    pub message: String,
    pub kind: NoticeKind,
}

/// The modal currently on screen.
pub struct MountedModal {
    pub handle: ModalHandle,
    pub session: ModalSession,
    /// Controls parsed from the modal body.
    pub form: FormDocument,
    /// Confirm button disabled while a request is in flight.
    pub busy: bool,
}

impl fmt::Debug for MountedModal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MountedModal")
            .field("handle", &self.handle)
            .field("title", &self.session.title)
            .field("fields", &self.form.fields().len())
            .field("busy", &self.busy)
            .finish_non_exhaustive()
    }
}

/// Render-ready copy of the mounted modal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModalView {
    pub handle: ModalHandle,
    pub title: String,
    pub body_html: String,
    pub form: FormDocument,
    pub has_footer: bool,
    pub confirm_label: String,
    pub cancel_label: String,
    pub busy: bool,
}

/// Change notifications for the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageEvent {
    ToastShown {
        id: ToastId,
        message: String,
        kind: NoticeKind,
    },
    ToastRemoved {
        id: ToastId,
    },
    ModalOpened {
        handle: ModalHandle,
        title: String,
    },
    ModalUpdated {
        handle: ModalHandle,
    },
    ModalClosed {
        handle: ModalHandle,
    },
    Navigated(Navigation),
}

// ── Document ────────────────────────────────────────────────────────

/// Mutable page state.
#[derive(Debug, Default)]
pub struct Document {
    pub location: Location,
    /// `document.cookie` equivalent: `name=value; name2=value2`.
    pub cookies: String,
    pub meta: IndexMap<String, String>,
    /// Hidden inputs rendered outside any modal.
    pub hidden_inputs: Vec<(String, String)>,
    pub tabs: Vec<Tab>,
    pub modal: Option<MountedModal>,
    pub toast: Option<MountedToast>,
    pub scroll_locked: bool,
    pub navigations: Vec<Navigation>,
}

impl Document {
    /// Key of the active tab, if the page has a tab bar.
    pub fn active_tab_key(&self) -> Option<String> {
        self.tabs
            .iter()
            .find(|t| t.active)
            .and_then(Tab::resolved_key)
    }

    /// Value of a cookie in the `cookies` string.
    pub fn cookie(&self, name: &str) -> Option<String> {
        self.cookies
            .split(';')
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value.trim().to_owned())
            .filter(|value| !value.is_empty())
    }

    pub fn hidden_input(&self, name: &str) -> Option<&str> {
        self.hidden_inputs
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
            .filter(|v| !v.is_empty())
    }
}

// ── Page ────────────────────────────────────────────────────────────

/// Shared handle to the page document.
///
/// Cheaply cloneable. The document lock is never held across an `.await`.
#[derive(Clone)]
pub struct Page {
    inner: Arc<PageInner>,
}

struct PageInner {
    doc: Mutex<Document>,
    events: broadcast::Sender<PageEvent>,
}

impl Page {
    pub fn new(location: Location) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_SIZE);
        Self {
            inner: Arc::new(PageInner {
                doc: Mutex::new(Document {
                    location,
                    ..Document::default()
                }),
                events,
            }),
        }
    }

    /// A page at `path?query`.
    pub fn at(raw: &str) -> Self {
        Self::new(Location::parse(raw))
    }

    fn lock(&self) -> MutexGuard<'_, Document> {
        self.inner.doc.lock().expect("page document lock poisoned")
    }

    /// Read the document.
    pub fn read<R>(&self, f: impl FnOnce(&Document) -> R) -> R {
        f(&self.lock())
    }

    /// Mutate the document. Events raised by `f` are sent after the lock
    /// is released.
    pub fn update<R>(&self, f: impl FnOnce(&mut Document, &mut Vec<PageEvent>) -> R) -> R {
        let mut events = Vec::new();
        let result = {
            let mut doc = self.lock();
            f(&mut doc, &mut events)
        };
        for event in events {
            self.emit(event);
        }
        result
    }

    /// Subscribe to page changes.
    pub fn subscribe(&self) -> broadcast::Receiver<PageEvent> {
        self.inner.events.subscribe()
    }

    pub(crate) fn emit(&self, event: PageEvent) {
        // No receivers is fine: nobody is rendering.
        let _ = self.inner.events.send(event);
    }

    // ── Setup (host side) ────────────────────────────────────────────

    pub fn set_cookies(&self, cookies: impl Into<String>) {
        let cookies = cookies.into();
        self.update(|doc, _| doc.cookies = cookies);
    }

    /// Merge a `Cookie` header value into the page cookies, replacing
    /// entries with the same name.
    pub fn absorb_cookies(&self, header: &str) {
        self.update(|doc, _| {
            let mut jar: IndexMap<String, String> = doc
                .cookies
                .split(';')
                .filter_map(|pair| pair.trim().split_once('='))
                .map(|(k, v)| (k.to_owned(), v.to_owned()))
                .collect();
            for (k, v) in header
                .split(';')
                .filter_map(|pair| pair.trim().split_once('='))
            {
                jar.insert(k.to_owned(), v.to_owned());
            }
            doc.cookies = jar
                .iter()
                .map(|(k, v)| format!("{k}={v}"))
                .collect::<Vec<_>>()
                .join("; ");
        });
    }

    pub fn set_meta(&self, name: impl Into<String>, content: impl Into<String>) {
        let (name, content) = (name.into(), content.into());
        self.update(|doc, _| {
            doc.meta.insert(name, content);
        });
    }

    pub fn add_hidden_input(&self, name: impl Into<String>, value: impl Into<String>) {
        let (name, value) = (name.into(), value.into());
        self.update(|doc, _| doc.hidden_inputs.push((name, value)));
    }

    pub fn set_tabs(&self, tabs: Vec<Tab>) {
        self.update(|doc, _| doc.tabs = tabs);
    }

    /// Mark the tab with `key` active. Returns `false` if no tab matches.
    pub fn activate_tab(&self, key: &str) -> bool {
        self.update(|doc, _| {
            let found = doc
                .tabs
                .iter()
                .any(|t| t.resolved_key().as_deref() == Some(key));
            if found {
                for tab in &mut doc.tabs {
                    tab.active = tab.resolved_key().as_deref() == Some(key);
                }
            }
            found
        })
    }

    // ── Accessors ────────────────────────────────────────────────────

    pub fn location(&self) -> Location {
        self.read(|doc| doc.location.clone())
    }

    pub fn active_tab_key(&self) -> Option<String> {
        self.read(Document::active_tab_key)
    }

    pub fn toast(&self) -> Option<MountedToast> {
        self.read(|doc| doc.toast.clone())
    }

    pub fn modal_view(&self) -> Option<ModalView> {
        self.read(|doc| {
            doc.modal.as_ref().map(|m| ModalView {
                handle: m.handle,
                title: m.session.title.clone(),
                body_html: m.session.body_html.clone(),
                form: m.form.clone(),
                has_footer: m.session.has_footer,
                confirm_label: m.session.confirm_label.clone(),
                cancel_label: m.session.cancel_label.clone(),
                busy: m.busy,
            })
        })
    }

    pub fn scroll_locked(&self) -> bool {
        self.read(|doc| doc.scroll_locked)
    }

    /// Every navigation requested so far, oldest first.
    pub fn navigations(&self) -> Vec<Navigation> {
        self.read(|doc| doc.navigations.clone())
    }

    /// Record a navigation. A `Assign` also moves the location.
    pub fn navigate(&self, navigation: Navigation) {
        debug!(target_url = %navigation, "navigating");
        self.update(|doc, events| {
            if let Navigation::Assign(target) = &navigation {
                doc.location = Location::parse(target);
            }
            doc.navigations.push(navigation.clone());
            events.push(PageEvent::Navigated(navigation));
        });
    }
}

impl fmt::Debug for Page {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Page")
            .field("location", &self.location())
            .finish_non_exhaustive()
    }
}
