//! Call aggregate root

use crate::domain::call::event::{CallEnded, CallEvent, CallEventBase, CallStarted};
use crate::domain::call::value_object::{CallDirection, CallStatus};
use crate::domain::shared::error::{DomainError, Result};
use crate::domain::shared::events::EventMetadata;
use crate::domain::shared::value_objects::{CallId, PhoneNumber};
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

/// A call that has been validated but not yet persisted
///
/// The store turns a draft into a [`Call`] by assigning its id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallDraft {
    caller_number: PhoneNumber,
    callee_number: PhoneNumber,
    direction: CallDirection,
    started_at: DateTime<Utc>,
}

impl CallDraft {
    /// Create a draft starting now
    pub fn new(
        caller_number: PhoneNumber,
        callee_number: PhoneNumber,
        direction: CallDirection,
    ) -> Result<Self> {
        if caller_number == callee_number {
            return Err(DomainError::InvalidRequest(
                "Callee number should be different from caller number".to_string(),
            ));
        }

        Ok(Self {
            caller_number,
            callee_number,
            direction,
            started_at: Utc::now(),
        })
    }

    /// Override the start time (imports and tests)
    pub fn with_started_at(mut self, started_at: DateTime<Utc>) -> Self {
        self.started_at = started_at;
        self
    }

    /// Materialise the draft as an active call with the given id
    pub fn into_call(self, id: CallId) -> Call {
        let mut call = Call {
            id,
            caller_number: self.caller_number,
            callee_number: self.callee_number,
            direction: self.direction,
            status: CallStatus::Active,
            started_at: self.started_at,
            ended_at: None,
            events: Vec::new(),
        };

        call.record_event(CallEvent::Started(CallStarted {
            base: CallEventBase {
                metadata: EventMetadata::at("call.started", call.started_at),
                call_id: id,
            },
            caller_number: call.caller_number.clone(),
            callee_number: call.callee_number.clone(),
            direction: call.direction,
        }));

        call
    }

    pub fn caller_number(&self) -> &PhoneNumber {
        &self.caller_number
    }

    pub fn callee_number(&self) -> &PhoneNumber {
        &self.callee_number
    }

    pub fn direction(&self) -> CallDirection {
        self.direction
    }

    pub fn started_at(&self) -> &DateTime<Utc> {
        &self.started_at
    }

    /// Both numbers this call occupies
    pub fn numbers(&self) -> [&PhoneNumber; 2] {
        [&self.caller_number, &self.callee_number]
    }
}

/// Call aggregate root
///
/// Owns the `ACTIVE -> ENDED` lifecycle and guarantees that `ended_at` is
/// present exactly when the call has ended, never before `started_at`.
#[derive(Debug, Clone, Serialize)]
pub struct Call {
    id: CallId,
    caller_number: PhoneNumber,
    callee_number: PhoneNumber,
    direction: CallDirection,
    status: CallStatus,
    started_at: DateTime<Utc>,
    ended_at: Option<DateTime<Utc>>,
    /// Pending domain events
    #[serde(skip)]
    events: Vec<CallEvent>,
}

impl Call {
    /// Rebuild a call from persisted state, checking its invariants
    pub fn restore(
        id: CallId,
        caller_number: PhoneNumber,
        callee_number: PhoneNumber,
        direction: CallDirection,
        status: CallStatus,
        started_at: DateTime<Utc>,
        ended_at: Option<DateTime<Utc>>,
    ) -> Result<Self> {
        match (status, ended_at) {
            (CallStatus::Active, Some(_)) => {
                return Err(DomainError::Storage(format!(
                    "Call {} is active but has an end time",
                    id
                )))
            }
            (CallStatus::Ended, None) => {
                return Err(DomainError::Storage(format!(
                    "Call {} is ended but has no end time",
                    id
                )))
            }
            (CallStatus::Ended, Some(end)) if end < started_at => {
                return Err(DomainError::Storage(format!(
                    "Call {} ends before it starts",
                    id
                )))
            }
            _ => {}
        }

        Ok(Self {
            id,
            caller_number,
            callee_number,
            direction,
            status,
            started_at,
            ended_at,
            events: Vec::new(),
        })
    }

    /// End the call now
    pub fn end(&mut self) -> Result<()> {
        // Clock skew between writers must not produce a negative duration
        let ended_at = Utc::now().max(self.started_at);
        self.end_at(ended_at)
    }

    /// End the call at a given instant
    pub fn end_at(&mut self, ended_at: DateTime<Utc>) -> Result<()> {
        if !self.status.is_active() {
            return Err(DomainError::AlreadyEnded(self.id));
        }

        if ended_at < self.started_at {
            return Err(DomainError::InvalidStateTransition(format!(
                "Call {} cannot end before it started",
                self.id
            )));
        }

        self.transition_to(CallStatus::Ended)?;
        self.ended_at = Some(ended_at);

        self.record_event(CallEvent::Ended(CallEnded {
            base: CallEventBase {
                metadata: EventMetadata::at("call.ended", ended_at),
                call_id: self.id,
            },
            ended_at,
            duration_ms: (ended_at - self.started_at).num_milliseconds(),
        }));

        Ok(())
    }

    /// Transition to a new status
    fn transition_to(&mut self, new_status: CallStatus) -> Result<()> {
        if !self.status.can_transition_to(&new_status) {
            return Err(DomainError::InvalidStateTransition(format!(
                "Cannot transition from {} to {}",
                self.status, new_status
            )));
        }

        self.status = new_status;
        Ok(())
    }

    /// Record a domain event
    fn record_event(&mut self, event: CallEvent) {
        self.events.push(event);
    }

    /// Take all pending events
    pub fn take_events(&mut self) -> Vec<CallEvent> {
        std::mem::take(&mut self.events)
    }

    // Getters
    pub fn id(&self) -> CallId {
        self.id
    }

    pub fn caller_number(&self) -> &PhoneNumber {
        &self.caller_number
    }

    pub fn callee_number(&self) -> &PhoneNumber {
        &self.callee_number
    }

    pub fn direction(&self) -> CallDirection {
        self.direction
    }

    pub fn status(&self) -> CallStatus {
        self.status
    }

    pub fn started_at(&self) -> &DateTime<Utc> {
        &self.started_at
    }

    pub fn ended_at(&self) -> Option<&DateTime<Utc>> {
        self.ended_at.as_ref()
    }

    /// Elapsed time between start and end, once ended
    pub fn duration(&self) -> Option<Duration> {
        self.ended_at.map(|ended| ended - self.started_at)
    }

    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }

    /// Whether the number takes part in this call as caller or callee
    pub fn involves(&self, number: &PhoneNumber) -> bool {
        &self.caller_number == number || &self.callee_number == number
    }

    pub fn numbers(&self) -> [&PhoneNumber; 2] {
        [&self.caller_number, &self.callee_number]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn number(n: &str) -> PhoneNumber {
        PhoneNumber::parse(n).unwrap()
    }

    fn create_test_call() -> Call {
        CallDraft::new(number("111"), number("222"), CallDirection::Outbound)
            .unwrap()
            .into_call(CallId::new(1))
    }

    #[test]
    fn test_call_lifecycle() {
        let mut call = create_test_call();

        assert_eq!(call.status(), CallStatus::Active);
        assert!(call.ended_at().is_none());
        assert_eq!(call.events.len(), 1); // Started event

        call.end().unwrap();
        assert_eq!(call.status(), CallStatus::Ended);
        assert!(call.ended_at().is_some());
        assert!(call.ended_at().unwrap() >= call.started_at());
        assert!(call.duration().unwrap() >= Duration::zero());

        let events = call.take_events();
        assert_eq!(events.len(), 2); // Started, Ended
        assert_eq!(events[0].event_type(), "call.started");
        assert_eq!(events[1].event_type(), "call.ended");
        assert!(call.take_events().is_empty());
    }

    #[test]
    fn test_draft_rejects_same_numbers() {
        let result = CallDraft::new(number("A"), number("A"), CallDirection::Inbound);
        assert!(matches!(result, Err(DomainError::InvalidRequest(_))));
    }

    #[test]
    fn test_cannot_end_twice() {
        let mut call = create_test_call();
        call.end().unwrap();
        let first_end = *call.ended_at().unwrap();

        let result = call.end();
        assert_eq!(result, Err(DomainError::AlreadyEnded(CallId::new(1))));
        assert_eq!(call.ended_at(), Some(&first_end));
    }

    #[test]
    fn test_cannot_end_before_start() {
        let mut call = create_test_call();
        let before = *call.started_at() - Duration::seconds(1);

        assert!(matches!(
            call.end_at(before),
            Err(DomainError::InvalidStateTransition(_))
        ));
        assert!(call.is_active());
    }

    #[test]
    fn test_restore_checks_invariants() {
        let start = Utc::now();
        let restore = |status, end| {
            Call::restore(
                CallId::new(9),
                number("111"),
                number("222"),
                CallDirection::Inbound,
                status,
                start,
                end,
            )
        };

        assert!(restore(CallStatus::Active, None).is_ok());
        assert!(restore(CallStatus::Ended, Some(start + Duration::minutes(3))).is_ok());
        assert!(restore(CallStatus::Active, Some(start)).is_err());
        assert!(restore(CallStatus::Ended, None).is_err());
        assert!(restore(CallStatus::Ended, Some(start - Duration::seconds(1))).is_err());
    }

    #[test]
    fn test_involves_either_role() {
        let call = create_test_call();
        assert!(call.involves(&number("111")));
        assert!(call.involves(&number("222")));
        assert!(!call.involves(&number("333")));
    }
}
