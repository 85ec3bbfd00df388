// estatedesk-api: Async client for the admin Form Service and Record API

pub mod client;
pub mod envelope;
pub mod error;
pub mod forms;
pub mod payload;
pub mod records;
pub mod transport;

pub use client::FormClient;
pub use envelope::{ActionReply, FieldErrors, NON_FIELD_ERRORS, SubmissionResult};
pub use error::Error;
pub use payload::FormPayload;
pub use records::{PaymentRecordDetail, PropertyOption};
pub use transport::{TlsMode, TransportConfig};
