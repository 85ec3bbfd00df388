// ── Domain catalogue ──
//
// Every admin page drives the same engine; what differs per record kind is
// routing, labels, form hooks, transitions and the bulk-delete strategy.

use crate::batch::BatchPlan;
use crate::cascade::property_cascade;
use crate::error::CoreError;
use crate::payment::bill_payment_fields;
use crate::transition::{ActionInput, TransitionAction};
use crate::workflow::{CrudRequestConfig, DeleteConfig};

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
    strum::AsRefStr,
)]
#[strum(serialize_all = "kebab-case")]
pub enum DomainKind {
    Community,
    Building,
    Property,
    Owner,
    Tenant,
    Maintenance,
    FeeStandard,
    Bill,
    PaymentRecord,
}

const BILL_STATUSES: &[(&str, &str)] = &[
    ("unpaid", "Unpaid"),
    ("paid", "Paid"),
    ("partial", "Partially paid"),
    ("overdue", "Overdue"),
];

const PAYMENT_METHODS: &[(&str, &str)] = &[
    ("wechat", "WeChat Pay"),
    ("alipay", "Alipay"),
    ("cash", "Cash"),
    ("bank_transfer", "Bank transfer"),
];

const RECORD_STATUSES: &[(&str, &str)] = &[
    ("success", "Succeeded"),
    ("refund", "Refunded"),
    ("failed", "Failed"),
];

fn label_of(table: &[(&str, &'static str)], code: &str) -> Option<&'static str> {
    table.iter().find(|(c, _)| *c == code).map(|(_, label)| *label)
}

/// Display name of a payment method code, e.g. `bank_transfer`.
pub fn payment_method_label(code: &str) -> Option<&'static str> {
    label_of(PAYMENT_METHODS, code)
}

/// Display name of a payment record status code.
pub fn record_status_label(code: &str) -> Option<&'static str> {
    label_of(RECORD_STATUSES, code)
}

const MAINTENANCE_ACTIONS: &[TransitionAction] = &[
    TransitionAction {
        name: "assign",
        label: "Assign",
        confirm: None,
        input: Some(ActionInput {
            field: "assigned_to",
            label: "Assigned to",
            multiline: false,
            choices: &[],
        }),
    },
    TransitionAction {
        name: "start",
        label: "Start",
        confirm: Some("Start processing this request?"),
        input: None,
    },
    TransitionAction {
        name: "complete",
        label: "Complete",
        confirm: None,
        input: Some(ActionInput {
            field: "result_description",
            label: "Result",
            multiline: true,
            choices: &[],
        }),
    },
    TransitionAction {
        name: "close",
        label: "Close",
        confirm: Some("Close request #{id}?"),
        input: None,
    },
    TransitionAction {
        name: "reopen",
        label: "Reopen",
        confirm: Some("Reopen request #{id}? It returns to in-progress."),
        input: None,
    },
];

const BILL_ACTIONS: &[TransitionAction] = &[
    TransitionAction {
        name: "update-status",
        label: "Update status",
        confirm: None,
        input: Some(ActionInput {
            field: "status",
            label: "Status",
            multiline: false,
            choices: BILL_STATUSES,
        }),
    },
    TransitionAction {
        name: "update-payment-method",
        label: "Update payment method",
        confirm: None,
        input: Some(ActionInput {
            field: "payment_method",
            label: "Payment method",
            multiline: false,
            choices: PAYMENT_METHODS,
        }),
    },
];

impl DomainKind {
    /// Collection root of the server-rendered form, `None` for read-only kinds.
    pub fn form_root(self) -> Option<&'static str> {
        match self {
            Self::Community => Some("/admin/forms/community/"),
            Self::Building => Some("/admin/forms/building/"),
            Self::Property => Some("/admin/forms/property/"),
            Self::Owner => Some("/admin/forms/owner/"),
            Self::Tenant => Some("/admin/forms/tenant/"),
            Self::Maintenance => Some("/admin/forms/maintenance/"),
            Self::FeeStandard => Some("/admin/forms/fee-standard/"),
            Self::Bill => Some("/admin/forms/payment-bill/"),
            Self::PaymentRecord => None,
        }
    }

    /// REST collection the delete endpoints hang off.
    pub fn record_root(self) -> &'static str {
        match self {
            Self::Community => "/api/community/communities/",
            Self::Building => "/api/community/buildings/",
            Self::Property => "/api/property/properties/",
            Self::Owner => "/api/property/owners/",
            Self::Tenant => "/api/property/tenants/",
            Self::Maintenance => "/api/maintenance/requests/",
            Self::FeeStandard => "/api/payment/fee-standards/",
            Self::Bill => "/api/payment/bills/",
            Self::PaymentRecord => "/api/payment/records/",
        }
    }

    pub fn item_name(self) -> &'static str {
        match self {
            Self::Community => "Community",
            Self::Building => "Building",
            Self::Property => "Property",
            Self::Owner => "Owner",
            Self::Tenant => "Tenant",
            Self::Maintenance => "Maintenance request",
            Self::FeeStandard => "Fee standard",
            Self::Bill => "Bill",
            Self::PaymentRecord => "Payment record",
        }
    }

    pub fn plural(self) -> &'static str {
        match self {
            Self::Community => "communities",
            Self::Building => "buildings",
            Self::Property => "properties",
            Self::Owner => "owners",
            Self::Tenant => "tenants",
            Self::Maintenance => "maintenance requests",
            Self::FeeStandard => "fee standards",
            Self::Bill => "bills",
            Self::PaymentRecord => "payment records",
        }
    }

    /// Forms that pick a property through its community.
    pub fn has_property_cascade(self) -> bool {
        matches!(
            self,
            Self::Owner | Self::Tenant | Self::Maintenance | Self::Bill
        )
    }

    /// Add/edit request with this kind's hooks attached.
    pub fn crud_config(self, record_id: Option<&str>) -> Result<CrudRequestConfig, CoreError> {
        let root = self.form_root().ok_or(CoreError::Unsupported {
            domain: self.to_string(),
            operation: "form".into(),
        })?;

        let mut config = CrudRequestConfig::new(root, self.item_name());
        if let Some(id) = record_id {
            config = config.with_record(id);
        }
        if self.has_property_cascade() {
            let (on_load, on_change) = property_cascade();
            config = config.with_on_load(on_load).with_on_field_change(on_change);
        }
        if self == Self::Bill {
            let (on_load, on_change, before_submit) = bill_payment_fields();
            config = config
                .with_on_load(on_load)
                .with_on_field_change(on_change)
                .with_before_submit(before_submit);
        }
        Ok(config)
    }

    /// JSON detail endpoint, for kinds with a read-only detail view.
    pub fn detail_url(self, id: &str) -> Option<String> {
        match self {
            Self::PaymentRecord => Some(format!("{}{id}/", self.record_root())),
            _ => None,
        }
    }

    pub fn delete_config(self, id: &str, name: Option<&str>) -> DeleteConfig {
        DeleteConfig {
            delete_url: format!("{}{id}/", self.record_root()),
            item_name: self.item_name().to_owned(),
            name: name.map(str::to_owned),
        }
    }

    /// Prefix of the `<id>/<action>/` endpoints.
    pub fn transition_base(self) -> Option<&'static str> {
        match self {
            Self::Maintenance => Some(self.record_root()),
            Self::Bill => Some("/admin/api/bills/"),
            _ => None,
        }
    }

    pub fn transitions(self) -> &'static [TransitionAction] {
        match self {
            Self::Maintenance => MAINTENANCE_ACTIONS,
            Self::Bill => BILL_ACTIONS,
            _ => &[],
        }
    }

    pub fn find_action(self, name: &str) -> Result<&'static TransitionAction, CoreError> {
        self.transitions()
            .iter()
            .find(|a| a.name == name)
            .ok_or_else(|| CoreError::Unsupported {
                domain: self.to_string(),
                operation: name.to_owned(),
            })
    }

    pub fn batch_plan(self) -> Option<BatchPlan> {
        match self {
            Self::Bill => Some(BatchPlan::Endpoint {
                url: "/api/payment/bills/batch_delete/",
                key: "bill_ids",
            }),
            Self::FeeStandard | Self::PaymentRecord => Some(BatchPlan::PerRecord {
                record_root: self.record_root(),
            }),
            _ => None,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::str::FromStr;

    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn names_are_kebab_case() {
        assert_eq!(DomainKind::FeeStandard.to_string(), "fee-standard");
        assert_eq!(
            DomainKind::from_str("payment-record").unwrap(),
            DomainKind::PaymentRecord
        );
        assert!(DomainKind::from_str("invoice").is_err());
    }

    #[test]
    fn record_roots_are_slash_terminated() {
        for kind in DomainKind::iter() {
            assert!(kind.record_root().ends_with('/'), "{kind}");
            if let Some(root) = kind.form_root() {
                assert!(root.starts_with("/admin/forms/"), "{kind}");
            }
        }
    }

    #[test]
    fn crud_config_wires_cascade_for_property_forms() {
        let owner = DomainKind::Owner.crud_config(Some("4")).unwrap();
        assert_eq!(owner.target_url(), "/admin/forms/owner/4/");
        assert!(owner.on_load.is_some());
        assert!(owner.on_field_change.is_some());

        let building = DomainKind::Building.crud_config(None).unwrap();
        assert_eq!(building.target_url(), "/admin/forms/building/new/");
        assert!(building.on_load.is_none());
    }

    #[test]
    fn bill_config_adds_payment_checks() {
        let bill = DomainKind::Bill.crud_config(None).unwrap();
        assert!(bill.on_load.is_some());
        assert!(bill.before_submit.is_some());
        assert!(DomainKind::Owner.crud_config(None).unwrap().before_submit.is_none());
    }

    #[test]
    fn detail_view_and_labels() {
        assert_eq!(
            DomainKind::PaymentRecord.detail_url("e1f2").as_deref(),
            Some("/api/payment/records/e1f2/")
        );
        assert!(DomainKind::Bill.detail_url("1").is_none());
        assert_eq!(payment_method_label("bank_transfer"), Some("Bank transfer"));
        assert_eq!(record_status_label("refund"), Some("Refunded"));
        assert_eq!(payment_method_label("cheque"), None);
    }

    #[test]
    fn payment_records_have_no_form() {
        let err = DomainKind::PaymentRecord.crud_config(None).unwrap_err();
        assert!(matches!(err, CoreError::Unsupported { .. }));
    }

    #[test]
    fn delete_config_targets_record_root() {
        let config = DomainKind::Tenant.delete_config("9", Some("Li Wei"));
        assert_eq!(config.delete_url, "/api/property/tenants/9/");
        assert_eq!(config.item_name, "Tenant");
        assert_eq!(config.name.as_deref(), Some("Li Wei"));
    }

    #[test]
    fn transitions_by_kind() {
        let assign = DomainKind::Maintenance.find_action("assign").unwrap();
        assert_eq!(assign.input.unwrap().field, "assigned_to");
        let status = DomainKind::Bill.find_action("update-status").unwrap();
        assert_eq!(status.input.unwrap().choices.len(), 4);
        assert_eq!(DomainKind::Bill.transition_base(), Some("/admin/api/bills/"));
        assert!(DomainKind::Owner.find_action("assign").is_err());
        assert!(DomainKind::Owner.transition_base().is_none());
    }

    #[test]
    fn batch_plans() {
        assert_eq!(
            DomainKind::Bill.batch_plan(),
            Some(BatchPlan::Endpoint {
                url: "/api/payment/bills/batch_delete/",
                key: "bill_ids",
            })
        );
        assert_eq!(
            DomainKind::FeeStandard.batch_plan(),
            Some(BatchPlan::PerRecord {
                record_root: "/api/payment/fee-standards/"
            })
        );
        assert!(DomainKind::Community.batch_plan().is_none());
    }
}
