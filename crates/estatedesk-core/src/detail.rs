// ── Record detail ──
//
// Read-only views of a single record, shown in a footerless modal. Only
// payment records have one: the list page opens it from the row's detail
// button.

use std::fmt::Write as _;
use std::sync::Arc;

use estatedesk_api::PaymentRecordDetail;
use tracing::debug;

use crate::bridge::FormBridge;
use crate::domain::{payment_method_label, record_status_label};
use crate::form::escape_html;
use crate::modal::{Dismissal, ModalController, ModalHandle, ModalSession};
use crate::notify::Notifier;

pub const DETAIL_TITLE: &str = "Payment record details";

#[derive(Clone)]
pub struct RecordDetail {
    inner: Arc<DetailInner>,
}

struct DetailInner {
    bridge: FormBridge,
    modal: ModalController,
    notifier: Notifier,
}

impl RecordDetail {
    pub fn new(bridge: FormBridge, modal: ModalController, notifier: Notifier) -> Self {
        Self {
            inner: Arc::new(DetailInner {
                bridge,
                modal,
                notifier,
            }),
        }
    }

    /// Fetch the record at `url` and show it.
    ///
    /// `None` when the fetch failed (reported as a toast) or another modal
    /// was opened while it was in flight.
    pub async fn show(&self, url: &str) -> Option<DetailSession> {
        let inner = &self.inner;
        let ticket = inner.modal.begin();
        inner.notifier.info("Loading payment record...");

        let result = inner.bridge.payment_record(url).await;
        if !inner.modal.is_current(ticket) {
            debug!(%url, "discarding record from a superseded request");
            return None;
        }

        let record = match result {
            Ok(record) => record,
            Err(e) => {
                inner
                    .notifier
                    .error(format!("Failed to load payment record: {}", e.user_message()));
                return None;
            }
        };

        let rows = detail_rows(&record);
        let handle = inner
            .modal
            .open(ModalSession::new(DETAIL_TITLE, render_rows(&rows)).without_footer());
        debug!(%handle, %url, "record detail shown");

        Some(DetailSession {
            handle,
            modal: inner.modal.clone(),
            rows,
            record,
        })
    }
}

/// Labelled rows of a payment record, in display order.
pub fn detail_rows(record: &PaymentRecordDetail) -> Vec<(&'static str, String)> {
    fn or_dash(value: Option<&str>) -> String {
        value.unwrap_or("-").to_owned()
    }

    let property = match (record.property_unit.as_deref(), record.floor_room.as_deref()) {
        (Some(unit), Some(room)) => format!("{unit} {room}"),
        (unit, room) => or_dash(unit.or(room)),
    };
    let method = record
        .payment_method
        .as_deref()
        .map(|code| payment_method_label(code).unwrap_or(code));

    let mut rows = vec![
        ("Transaction ID", or_dash(record.transaction_id.as_deref())),
        ("Merchant order no.", or_dash(record.out_trade_no.as_deref())),
        ("Property", property),
        ("Owner", or_dash(record.payer.as_deref().or(record.owner.as_deref()))),
        (
            "Amount",
            record
                .amount
                .as_deref()
                .map_or_else(|| "-".to_owned(), |amount| format!("¥{amount}")),
        ),
        ("Payment method", or_dash(method)),
        ("Paid at", or_dash(record.payment_time.as_deref())),
        ("Operator", or_dash(record.operator.as_deref())),
    ];
    if let Some(status) = record.status.as_deref() {
        rows.push(("Status", record_status_label(status).unwrap_or(status).to_owned()));
    }
    rows
}

fn render_rows(rows: &[(&'static str, String)]) -> String {
    let mut html = String::from(r#"<dl class="record-detail">"#);
    for (label, value) in rows {
        let _ = write!(html, "<dt>{label}</dt><dd>{}</dd>", escape_html(value));
    }
    html.push_str("</dl>");
    html
}

/// A mounted detail view.
pub struct DetailSession {
    handle: ModalHandle,
    modal: ModalController,
    rows: Vec<(&'static str, String)>,
    record: PaymentRecordDetail,
}

impl DetailSession {
    pub fn handle(&self) -> ModalHandle {
        self.handle
    }

    pub fn is_open(&self) -> bool {
        self.modal.is_active(self.handle)
    }

    pub fn rows(&self) -> &[(&'static str, String)] {
        &self.rows
    }

    pub fn record(&self) -> &PaymentRecordDetail {
        &self.record
    }

    pub fn close(&self) -> bool {
        self.modal.dismiss(self.handle, Dismissal::CloseButton)
    }
}

impl std::fmt::Debug for DetailSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DetailSession")
            .field("handle", &self.handle)
            .field("record", &self.record.id)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn value<'a>(rows: &'a [(&'static str, String)], label: &str) -> Option<&'a str> {
        rows.iter()
            .find(|(l, _)| *l == label)
            .map(|(_, v)| v.as_str())
    }

    #[test]
    fn labels_codes_and_falls_back_to_dashes() {
        let record = PaymentRecordDetail {
            transaction_id: Some("T-100".into()),
            property_unit: Some("Block 3".into()),
            floor_room: Some("12-04".into()),
            owner: Some("Wang Min".into()),
            amount: Some("356.50".into()),
            payment_method: Some("bank_transfer".into()),
            status: Some("refund".into()),
            ..PaymentRecordDetail::default()
        };
        let rows = detail_rows(&record);

        assert_eq!(value(&rows, "Property"), Some("Block 3 12-04"));
        assert_eq!(value(&rows, "Owner"), Some("Wang Min"));
        assert_eq!(value(&rows, "Amount"), Some("¥356.50"));
        assert_eq!(value(&rows, "Payment method"), Some("Bank transfer"));
        assert_eq!(value(&rows, "Status"), Some("Refunded"));
        assert_eq!(value(&rows, "Operator"), Some("-"));
        assert_eq!(value(&rows, "Merchant order no."), Some("-"));
    }

    #[test]
    fn unknown_codes_show_as_sent_and_status_is_optional() {
        let record = PaymentRecordDetail {
            payer: Some("Li Na".into()),
            owner: Some("Wang Min".into()),
            payment_method: Some("barter".into()),
            ..PaymentRecordDetail::default()
        };
        let rows = detail_rows(&record);

        assert_eq!(value(&rows, "Owner"), Some("Li Na"));
        assert_eq!(value(&rows, "Payment method"), Some("barter"));
        assert_eq!(value(&rows, "Amount"), Some("-"));
        assert_eq!(value(&rows, "Status"), None);
    }

    #[test]
    fn values_are_escaped() {
        let html = render_rows(&[("Operator", "<b>ops</b>".to_owned())]);
        assert!(html.contains("<dd>&lt;b&gt;ops&lt;/b&gt;</dd>"), "{html}");
    }
}
