//! Shared helpers for command handlers.

use std::time::Duration;

use estatedesk_core::{DomainKind, Engine, Navigation};

use crate::cli::{Domain, GlobalOpts};
use crate::error::CliError;
use crate::host::Host;
use crate::output;

/// Slack on top of the reload delay before giving up on the navigation.
const RELOAD_GRACE: Duration = Duration::from_secs(2);

pub fn domain_kind(domain: Domain) -> DomainKind {
    match domain {
        Domain::Community => DomainKind::Community,
        Domain::Building => DomainKind::Building,
        Domain::Property => DomainKind::Property,
        Domain::Owner => DomainKind::Owner,
        Domain::Tenant => DomainKind::Tenant,
        Domain::Maintenance => DomainKind::Maintenance,
        Domain::FeeStandard => DomainKind::FeeStandard,
        Domain::Bill => DomainKind::Bill,
        Domain::PaymentRecord => DomainKind::PaymentRecord,
    }
}

/// Prompt for confirmation, auto-approving if `--yes` was passed.
///
/// Without a terminal a question can't be asked, so it is an error
/// rather than a silent "no".
pub fn confirm(host: &Host, message: &str, global: &GlobalOpts) -> Result<bool, CliError> {
    if global.yes {
        return Ok(true);
    }
    if !host.interactive() {
        return Err(CliError::NonInteractiveRequiresYes {
            action: message.to_owned(),
        });
    }
    host.confirm(message, false)
}

/// Wait for the reload the engine schedules after a successful mutation.
pub async fn await_reload(engine: &Engine, host: &mut Host) -> Result<Navigation, CliError> {
    host.wait_for_navigation(engine.settings().reload_delay + RELOAD_GRACE)
        .await
}

/// The last error toast, or `fallback`.
pub fn failure_message(host: &mut Host, fallback: impl Into<String>) -> String {
    host.drain();
    host.take_error().unwrap_or_else(|| fallback.into())
}

// ── Reports ──────────────────────────────────────────────────────────

/// What a mutating command did, for `-o json` / `-o plain`.
#[derive(Debug, serde::Serialize)]
pub struct Report {
    pub domain: String,
    pub operation: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub outcome: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reload: Option<String>,
}

impl Report {
    pub fn new(kind: DomainKind, operation: &str, id: Option<&str>, outcome: &str) -> Self {
        Self {
            domain: kind.to_string(),
            operation: operation.to_owned(),
            id: id.map(str::to_owned),
            outcome: outcome.to_owned(),
            message: None,
            reload: None,
        }
    }

    pub fn with_message(mut self, message: Option<&str>) -> Self {
        self.message = message.map(str::to_owned);
        self
    }

    pub fn with_reload(mut self, navigation: &Navigation) -> Self {
        self.reload = Some(navigation.to_string());
        self
    }
}

/// Print a report. The table view is the toast lines already on stderr.
pub fn print_report(report: &Report, global: &GlobalOpts) -> Result<(), CliError> {
    let out = output::render_single(
        global.output,
        report,
        |_| String::new(),
        |r| r.outcome.clone(),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_skips_empty_fields() {
        let report = Report::new(DomainKind::Bill, "batch-delete", None, "applied")
            .with_reload(&Navigation::Assign("/admin/payment/?tab=bills".into()));
        let json = serde_json::to_string(&report).unwrap_or_default();
        assert_eq!(
            json,
            r#"{"domain":"bill","operation":"batch-delete","outcome":"applied","reload":"/admin/payment/?tab=bills"}"#
        );
    }

    #[test]
    fn every_domain_maps() {
        assert_eq!(domain_kind(Domain::FeeStandard), DomainKind::FeeStandard);
        assert_eq!(domain_kind(Domain::PaymentRecord).to_string(), "payment-record");
    }
}
