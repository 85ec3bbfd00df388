// Bill payment fields.
//
// A bill marked paid or partially paid records how and when it was paid,
// and a partial payment also records the amount received. Any other status
// carries no payment details.

use std::sync::Arc;

use chrono::{Local, NaiveDateTime};
use estatedesk_api::FieldErrors;
use futures::FutureExt;
use tracing::debug;

use crate::form::FormDocument;
use crate::workflow::{BeforeSubmitHook, FieldChangeHook, FormContext, OnLoadHook};

pub const STATUS_FIELD: &str = "status";
pub const PAYMENT_METHOD_FIELD: &str = "payment_method";
pub const PAID_AT_FIELD: &str = "paid_at";
pub const PAID_AMOUNT_FIELD: &str = "paid_amount_input";
pub const AMOUNT_FIELD: &str = "amount";

/// `datetime-local` value with seconds.
const PAID_AT_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

fn records_payment(status: &str) -> bool {
    matches!(status, "paid" | "partial")
}

/// Hooks wiring the payment fields into a bill's `CrudRequestConfig`.
pub fn bill_payment_fields() -> (OnLoadHook, FieldChangeHook, BeforeSubmitHook) {
    let on_load: OnLoadHook = Arc::new(|ctx: FormContext| async move { sync(&ctx) }.boxed());
    let on_change: FieldChangeHook = Arc::new(|ctx: FormContext, field: String| {
        async move {
            if field == STATUS_FIELD {
                sync(&ctx);
            }
        }
        .boxed()
    });
    let before_submit: BeforeSubmitHook = Arc::new(check_payment);
    (on_load, on_change, before_submit)
}

fn sync(ctx: &FormContext) {
    let now = Local::now().naive_local();
    ctx.with_form(|form| sync_payment_fields(form, now));
}

/// Make the payment fields match the selected status.
///
/// Paid and partial require a payment method and get `now` as the payment
/// time when none is set; partial also requires the amount received. Other
/// statuses clear all three and drop the requirement.
pub fn sync_payment_fields(form: &mut FormDocument, now: NaiveDateTime) {
    let status = form.value(STATUS_FIELD).unwrap_or_default();
    debug!(%status, "syncing bill payment fields");

    if records_payment(&status) {
        form.set_required(PAYMENT_METHOD_FIELD, true);
        if form.value(PAID_AT_FIELD).is_some_and(|v| v.trim().is_empty()) {
            let _ = form.set_value(PAID_AT_FIELD, &now.format(PAID_AT_FORMAT).to_string());
        }
        form.set_required(PAID_AMOUNT_FIELD, status == "partial");
    } else {
        for name in [PAYMENT_METHOD_FIELD, PAID_AT_FIELD, PAID_AMOUNT_FIELD] {
            let _ = form.set_value(name, "");
            form.set_required(name, false);
        }
    }
}

/// Refuse a paid or partial bill without a payment method, and a partial
/// payment that is not a positive amount within the amount due.
pub fn check_payment(form: &FormDocument) -> Result<(), FieldErrors> {
    let status = form.value(STATUS_FIELD).unwrap_or_default();
    let mut errors = FieldErrors::new();

    if records_payment(&status) && form.missing_required().contains(&PAYMENT_METHOD_FIELD) {
        errors.insert(PAYMENT_METHOD_FIELD.into(), "Select a payment method".into());
    }

    if status == "partial" {
        let due = parse_amount(form.value(AMOUNT_FIELD));
        match parse_amount(form.value(PAID_AMOUNT_FIELD)) {
            Some(paid) if paid > 0.0 => {
                if due.is_some_and(|due| paid > due) {
                    errors.insert(
                        PAID_AMOUNT_FIELD.into(),
                        "Paid amount cannot exceed the amount due".into(),
                    );
                }
            }
            _ => {
                errors.insert(PAID_AMOUNT_FIELD.into(), "Enter the amount paid".into());
            }
        }
    }

    if errors.is_empty() { Ok(()) } else { Err(errors) }
}

fn parse_amount(value: Option<String>) -> Option<f64> {
    value
        .and_then(|v| v.trim().parse::<f64>().ok())
        .filter(|v| v.is_finite())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    const BILL_FORM: &str = r#"
        <input type="number" name="amount" value="120.00">
        <select name="status" id="id_status">
          <option value="unpaid" selected>Unpaid</option>
          <option value="paid">Paid</option>
          <option value="partial">Partially paid</option>
        </select>
        <select name="payment_method" id="id_payment_method">
          <option value="">---------</option>
          <option value="cash">Cash</option>
        </select>
        <input type="datetime-local" name="paid_at" id="id_paid_at">
        <input type="number" name="paid_amount_input" id="id_paid_amount_input">
    "#;

    fn noon() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 3, 14)
            .unwrap()
            .and_hms_opt(12, 30, 5)
            .unwrap()
    }

    #[test]
    fn paid_requires_method_and_stamps_time() {
        let mut form = FormDocument::parse(BILL_FORM);
        form.set_value(STATUS_FIELD, "paid").unwrap();
        sync_payment_fields(&mut form, noon());

        assert!(form.field(PAYMENT_METHOD_FIELD).unwrap().required);
        assert!(!form.field(PAID_AMOUNT_FIELD).unwrap().required);
        assert_eq!(form.value(PAID_AT_FIELD).as_deref(), Some("2026-03-14T12:30:05"));

        // An existing payment time is kept.
        form.set_value(PAID_AT_FIELD, "2026-01-02T08:00:00").unwrap();
        sync_payment_fields(&mut form, noon());
        assert_eq!(form.value(PAID_AT_FIELD).as_deref(), Some("2026-01-02T08:00:00"));
    }

    #[test]
    fn unpaid_clears_payment_details() {
        let mut form = FormDocument::parse(BILL_FORM);
        form.set_value(STATUS_FIELD, "partial").unwrap();
        sync_payment_fields(&mut form, noon());
        form.set_value(PAYMENT_METHOD_FIELD, "cash").unwrap();
        form.set_value(PAID_AMOUNT_FIELD, "40").unwrap();
        assert!(form.field(PAID_AMOUNT_FIELD).unwrap().required);

        form.set_value(STATUS_FIELD, "unpaid").unwrap();
        sync_payment_fields(&mut form, noon());

        for name in [PAYMENT_METHOD_FIELD, PAID_AT_FIELD, PAID_AMOUNT_FIELD] {
            assert_eq!(form.value(name).as_deref(), Some(""), "{name}");
            assert!(!form.field(name).unwrap().required, "{name}");
        }
        assert!(check_payment(&form).is_ok());
    }

    #[test]
    fn partial_amount_must_be_within_amount_due() {
        let mut form = FormDocument::parse(BILL_FORM);
        form.set_value(STATUS_FIELD, "partial").unwrap();
        sync_payment_fields(&mut form, noon());
        form.set_value(PAYMENT_METHOD_FIELD, "cash").unwrap();

        for (paid, message) in [
            ("", "Enter the amount paid"),
            ("0", "Enter the amount paid"),
            ("-5", "Enter the amount paid"),
            ("120.01", "Paid amount cannot exceed the amount due"),
        ] {
            form.set_value(PAID_AMOUNT_FIELD, paid).unwrap();
            let errors = check_payment(&form).unwrap_err();
            assert_eq!(errors.get(PAID_AMOUNT_FIELD).map(String::as_str), Some(message), "{paid}");
        }

        form.set_value(PAID_AMOUNT_FIELD, "120").unwrap();
        assert!(check_payment(&form).is_ok());
    }

    #[test]
    fn settled_status_without_method_is_refused() {
        let mut form = FormDocument::parse(BILL_FORM);
        form.set_value(STATUS_FIELD, "paid").unwrap();
        sync_payment_fields(&mut form, noon());

        let errors = check_payment(&form).unwrap_err();
        assert_eq!(
            errors.get(PAYMENT_METHOD_FIELD).map(String::as_str),
            Some("Select a payment method")
        );
        assert!(errors.get(PAID_AMOUNT_FIELD).is_none());
    }
}
