// ── Tab memory ──
//
// List pages with a tab bar lose the active tab on reload unless the URL
// carries it. `save()` snapshots the active key before a mutation starts;
// `reload()` rebuilds the current URL with that key injected.

use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwapOption;
use tracing::debug;

use crate::page::{Navigation, Page};

/// Query parameter carrying the active tab.
pub const TAB_PARAM: &str = "tab";
/// Cache-busting query parameter.
pub const CACHE_BUST_PARAM: &str = "_t";
/// Default delay between a successful mutation and the reload.
pub const DEFAULT_RELOAD_DELAY: Duration = Duration::from_millis(500);

#[derive(Clone)]
pub struct TabMemory {
    page: Page,
    saved: Arc<ArcSwapOption<String>>,
}

impl TabMemory {
    pub fn new(page: Page) -> Self {
        Self {
            page,
            saved: Arc::new(ArcSwapOption::empty()),
        }
    }

    /// Record the active tab key, or clear the record when the page has
    /// no active tab.
    pub fn save(&self) {
        let key = self.page.active_tab_key();
        debug!(tab = ?key, "saving active tab");
        self.saved.store(key.map(Arc::new));
    }

    /// Saved key, else the live one, else `None`.
    pub fn current_tab_key(&self) -> Option<String> {
        self.saved
            .load_full()
            .map(|key| key.as_ref().clone())
            .or_else(|| self.page.active_tab_key())
    }

    /// Where a reload should go right now.
    ///
    /// Existing query parameters are kept in order; `tab` is appended when
    /// absent and a key is known; `_t` replaces any stale value when
    /// cache-busting.
    pub fn reload_target(&self, cache_bust: bool, now_ms: i64) -> Navigation {
        let location = self.page.location();
        let mut target = location.clone();

        if let Some(key) = self.current_tab_key() {
            if target.param(TAB_PARAM).is_none() {
                target.query.push((TAB_PARAM.to_owned(), key));
            }
        }

        if cache_bust {
            target.query.retain(|(k, _)| k != CACHE_BUST_PARAM);
            target
                .query
                .push((CACHE_BUST_PARAM.to_owned(), now_ms.to_string()));
        }

        if target.query.is_empty() {
            Navigation::Reload
        } else {
            Navigation::Assign(target.to_string())
        }
    }

    /// Wait `delay`, then navigate to [`reload_target`](Self::reload_target).
    pub async fn reload(&self, delay: Duration, cache_bust: bool) {
        tokio::time::sleep(delay).await;
        let now_ms = chrono::Utc::now().timestamp_millis();
        let target = self.reload_target(cache_bust, now_ms);
        self.page.navigate(target);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::page::Tab;

    fn payment_page(url: &str) -> (Page, TabMemory) {
        let page = Page::at(url);
        page.set_tabs(vec![
            Tab::from_onclick("Bills", "switchTab(this, 'bills')"),
            Tab::from_onclick("Records", "switchTab(this, 'records')"),
            Tab::from_onclick("Fee standards", "switchTab(this, 'fees')"),
        ]);
        let tabs = TabMemory::new(page.clone());
        (page, tabs)
    }

    #[test]
    fn saved_tab_is_injected() {
        let (page, tabs) = payment_page("/admin/payment/");
        page.activate_tab("bills");
        tabs.save();

        assert_eq!(
            tabs.reload_target(false, 0),
            Navigation::Assign("/admin/payment/?tab=bills".into())
        );
    }

    #[test]
    fn saved_key_wins_over_live_tab() {
        let (page, tabs) = payment_page("/admin/payment/");
        page.activate_tab("records");
        tabs.save();
        page.activate_tab("fees");

        assert_eq!(tabs.current_tab_key().as_deref(), Some("records"));
    }

    #[test]
    fn existing_params_kept_and_tab_not_duplicated() {
        let (page, tabs) = payment_page("/admin/payment/?status=unpaid&tab=records");
        page.activate_tab("bills");
        tabs.save();

        assert_eq!(
            tabs.reload_target(false, 0),
            Navigation::Assign("/admin/payment/?status=unpaid&tab=records".into())
        );
    }

    #[test]
    fn cache_bust_replaces_stale_timestamp() {
        let (_, tabs) = payment_page("/admin/payment/?_t=1&page=2");
        tabs.save();

        assert_eq!(
            tabs.reload_target(true, 1_700_000_000_000),
            Navigation::Assign("/admin/payment/?page=2&_t=1700000000000".into())
        );
    }

    #[test]
    fn plain_reload_without_key_or_params() {
        let page = Page::at("/admin/communities/");
        let tabs = TabMemory::new(page);
        tabs.save();
        assert_eq!(tabs.current_tab_key(), None);
        assert_eq!(tabs.reload_target(false, 0), Navigation::Reload);
    }

    #[tokio::test(start_paused = true)]
    async fn reload_waits_for_delay() {
        let (page, tabs) = payment_page("/admin/payment/");
        page.activate_tab("bills");
        tabs.save();

        let task = tokio::spawn({
            let tabs = tabs.clone();
            async move { tabs.reload(DEFAULT_RELOAD_DELAY, false).await }
        });

        tokio::time::sleep(Duration::from_millis(499)).await;
        assert!(page.navigations().is_empty());

        task.await.unwrap();
        assert_eq!(
            page.navigations(),
            [Navigation::Assign("/admin/payment/?tab=bills".into())]
        );
    }
}
