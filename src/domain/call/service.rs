//! Call domain service

use crate::domain::call::aggregate::{Call, CallDraft};
use crate::domain::call::value_object::CallDirection;
use crate::domain::shared::error::{DomainError, Result};
use crate::domain::shared::value_objects::PhoneNumber;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Request to place a call, as received from the boundary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCallRequest {
    pub caller_number: String,
    pub callee_number: String,
    pub direction: CallDirection,
}

impl CreateCallRequest {
    pub fn new(
        caller_number: impl Into<String>,
        callee_number: impl Into<String>,
        direction: CallDirection,
    ) -> Self {
        Self {
            caller_number: caller_number.into(),
            callee_number: callee_number.into(),
            direction,
        }
    }
}

/// Domain service for call-related operations
///
/// Domain services contain business logic that doesn't naturally
/// fit within a single aggregate.
pub struct CallDomainService;

impl CallDomainService {
    /// Validate call setup and turn the request into a draft
    pub fn validate_call_setup(request: &CreateCallRequest) -> Result<CallDraft> {
        let caller = PhoneNumber::parse(request.caller_number.as_str())?;
        let callee = PhoneNumber::parse(request.callee_number.as_str())?;

        CallDraft::new(caller, callee, request.direction)
    }

    /// Numbers occupied by the given active calls
    pub fn busy_numbers<'a>(active_calls: impl IntoIterator<Item = &'a Call>) -> HashSet<PhoneNumber> {
        active_calls
            .into_iter()
            .filter(|call| call.is_active())
            .flat_map(|call| call.numbers().map(|number| number.clone()))
            .collect()
    }

    /// Reject the draft if either of its numbers is busy
    ///
    /// The caller is checked first, so a request where both numbers are
    /// busy reports the caller.
    pub fn ensure_lines_free(draft: &CallDraft, busy: &HashSet<PhoneNumber>) -> Result<()> {
        for number in draft.numbers() {
            if busy.contains(number) {
                return Err(DomainError::LineBusy(number.to_string()));
            }
        }

        Ok(())
    }
}
