// ── Batch delete ──
//
// Selected rows of a list page removed in one go. Bills have a dedicated
// endpoint taking the id list; fee standards and payment records are
// deleted one request per record, all awaited before reporting.

use std::sync::Arc;

use futures::future::join_all;
use serde_json::{Map, Value, json};
use tracing::{debug, warn};

use crate::bridge::FormBridge;
use crate::config::EngineSettings;
use crate::notify::Notifier;
use crate::tabs::TabMemory;
use crate::transition::{ConfirmPrompt, TransitionOutcome};

/// How a kind of record is deleted in bulk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchPlan {
    /// One `DELETE` to `url` with `{key: [ids]}`.
    Endpoint {
        url: &'static str,
        key: &'static str,
    },
    /// One `DELETE <record_root><id>/` per record.
    PerRecord { record_root: &'static str },
}

#[derive(Clone)]
pub struct BatchDelete {
    inner: Arc<BatchInner>,
}

struct BatchInner {
    bridge: FormBridge,
    notifier: Notifier,
    tabs: TabMemory,
    settings: EngineSettings,
    prompt: Arc<dyn ConfirmPrompt>,
}

impl BatchDelete {
    pub fn new(
        bridge: FormBridge,
        notifier: Notifier,
        tabs: TabMemory,
        settings: EngineSettings,
        prompt: Arc<dyn ConfirmPrompt>,
    ) -> Self {
        Self {
            inner: Arc::new(BatchInner {
                bridge,
                notifier,
                tabs,
                settings,
                prompt,
            }),
        }
    }

    /// Confirm, delete `ids`, then notify and reload (or notify the failure).
    pub async fn run(&self, plural: &str, plan: &BatchPlan, ids: &[String]) -> TransitionOutcome {
        let inner = &self.inner;
        if ids.is_empty() {
            inner
                .notifier
                .warning(format!("Select the {plural} to delete first"));
            return TransitionOutcome::Declined;
        }

        let question = format!(
            "Delete the {} selected {plural}?\n\nThis action cannot be undone.",
            ids.len()
        );
        if !inner.prompt.confirm(&question) {
            debug!(count = ids.len(), "batch delete declined");
            return TransitionOutcome::Declined;
        }

        inner.tabs.save();
        let result = match plan {
            BatchPlan::Endpoint { url, key } => self.delete_via_endpoint(url, key, ids).await,
            BatchPlan::PerRecord { record_root } => self.delete_each(record_root, ids).await,
        };

        match result {
            Ok(message) => {
                inner
                    .notifier
                    .success(message.unwrap_or_else(|| format!("Deleted {} {plural}", ids.len())));
                inner
                    .tabs
                    .reload(inner.settings.reload_delay, inner.settings.cache_bust)
                    .await;
                TransitionOutcome::Applied
            }
            Err(message) => {
                inner
                    .notifier
                    .error(format!("Failed to delete {plural}: {message}"));
                TransitionOutcome::Failed
            }
        }
    }

    async fn delete_via_endpoint(
        &self,
        url: &str,
        key: &str,
        ids: &[String],
    ) -> Result<Option<String>, String> {
        let mut body = Map::new();
        body.insert(key.to_owned(), json!(ids));
        let body = Value::Object(body);
        self.inner
            .bridge
            .batch_delete(url, &body)
            .await
            .map(|reply| reply.message)
            .map_err(|e| e.user_message())
    }

    async fn delete_each(&self, record_root: &str, ids: &[String]) -> Result<Option<String>, String> {
        let root = record_root.trim_end_matches('/');
        let urls: Vec<String> = ids.iter().map(|id| format!("{root}/{id}/")).collect();
        let results = join_all(urls.iter().map(|url| self.inner.bridge.delete(url))).await;

        let failures: Vec<String> = ids
            .iter()
            .zip(results)
            .filter_map(|(id, result)| result.err().map(|e| format!("#{id}: {}", e.user_message())))
            .collect();

        if failures.is_empty() {
            Ok(None)
        } else {
            warn!(failed = failures.len(), total = ids.len(), "batch delete partially failed");
            Err(format!(
                "{} of {} failed ({})",
                failures.len(),
                ids.len(),
                failures.join("; ")
            ))
        }
    }
}
