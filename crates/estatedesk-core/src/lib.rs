// estatedesk-core: Modal CRUD workflow engine driving the admin Form Service.

pub mod batch;
pub mod bridge;
pub mod cascade;
pub mod config;
pub mod detail;
pub mod domain;
pub mod engine;
pub mod error;
pub mod form;
pub mod modal;
pub mod notify;
pub mod page;
pub mod payment;
pub mod tabs;
pub mod transition;
pub mod workflow;

// ── Primary re-exports ──────────────────────────────────────────────
pub use batch::{BatchDelete, BatchPlan};
pub use bridge::FormBridge;
pub use config::{EngineSettings, SiteConfig};
pub use detail::{DetailSession, RecordDetail};
pub use domain::DomainKind;
pub use engine::Engine;
pub use error::CoreError;
pub use form::{Field, FieldKind, FormDocument, FormError, SelectOption};
pub use modal::{
    ConfirmOutcome, Dismissal, IntentTicket, ModalController, ModalHandle, ModalSession,
};
pub use notify::{NoticeKind, Notifier, ToastId};
pub use page::{Location, ModalView, Navigation, Page, PageEvent, Tab};
pub use tabs::TabMemory;
pub use transition::{
    ActionInput, AutoConfirm, ConfirmPrompt, PromptSession, StatusTransition, TransitionAction,
    TransitionOutcome,
};
pub use workflow::{
    CrudRequestConfig, CrudSession, CrudWorkflow, DeleteConfig, DeleteSession, FormContext,
    WorkflowState,
};

// Transport types hosts need: TLS for a `SiteConfig`, field errors for
// rendering a rejected form, the record behind a detail view.
pub use estatedesk_api::{FieldErrors, NON_FIELD_ERRORS, PaymentRecordDetail, TlsMode};
