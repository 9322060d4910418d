//! Call bounded context - manages the lifecycle of calls

pub mod aggregate;
pub mod event;
pub mod service;
pub mod store;
pub mod value_object;

pub use aggregate::{Call, CallDraft};
pub use event::CallEvent;
pub use service::{CallDomainService, CreateCallRequest};
pub use store::{CallFilters, CallStore};
pub use value_object::{CallDirection, CallStatus};
