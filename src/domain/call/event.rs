//! Call domain events

use crate::domain::call::value_object::CallDirection;
use crate::domain::shared::events::{DomainEvent, EventMetadata};
use crate::domain::shared::value_objects::{CallId, PhoneNumber};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Base struct for all call events
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallEventBase {
    pub metadata: EventMetadata,
    pub call_id: CallId,
}

/// Call started event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallStarted {
    pub base: CallEventBase,
    pub caller_number: PhoneNumber,
    pub callee_number: PhoneNumber,
    pub direction: CallDirection,
}

impl DomainEvent for CallStarted {
    fn event_type(&self) -> &'static str {
        "call.started"
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        self.base.metadata.occurred_at
    }
}

/// Call ended event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallEnded {
    pub base: CallEventBase,
    pub ended_at: DateTime<Utc>,
    pub duration_ms: i64,
}

impl DomainEvent for CallEnded {
    fn event_type(&self) -> &'static str {
        "call.ended"
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        self.base.metadata.occurred_at
    }
}

/// Call record removed from the store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallDeleted {
    pub base: CallEventBase,
    pub was_active: bool,
}

impl DomainEvent for CallDeleted {
    fn event_type(&self) -> &'static str {
        "call.deleted"
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        self.base.metadata.occurred_at
    }
}

/// Union of all call events
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum CallEvent {
    Started(CallStarted),
    Ended(CallEnded),
    Deleted(CallDeleted),
}

impl CallEvent {
    pub fn call_id(&self) -> &CallId {
        match self {
            CallEvent::Started(e) => &e.base.call_id,
            CallEvent::Ended(e) => &e.base.call_id,
            CallEvent::Deleted(e) => &e.base.call_id,
        }
    }

    pub fn event_type(&self) -> &'static str {
        match self {
            CallEvent::Started(e) => e.event_type(),
            CallEvent::Ended(e) => e.event_type(),
            CallEvent::Deleted(e) => e.event_type(),
        }
    }

    pub fn deleted(call_id: CallId, was_active: bool) -> Self {
        CallEvent::Deleted(CallDeleted {
            base: CallEventBase {
                metadata: EventMetadata::new("call.deleted"),
                call_id,
            },
            was_active,
        })
    }
}
