//! In-memory call store
//!
//! Keeps every call in one map behind a single `RwLock`, together with an
//! index of the numbers currently on an active call. Inserts check and claim
//! lines under the same write lock, so two concurrent creates for one number
//! cannot both succeed.

use crate::domain::call::{Call, CallDirection, CallDraft, CallFilters, CallStatus, CallStore};
use crate::domain::shared::error::{DomainError, Result};
use crate::domain::shared::value_objects::{CallId, PhoneNumber};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;
use tracing::debug;

#[derive(Default)]
struct MemoryState {
    calls: BTreeMap<CallId, Call>,
    /// Number -> active call occupying it
    active_lines: HashMap<PhoneNumber, CallId>,
    last_id: i64,
}

impl MemoryState {
    fn busy_number<'a>(&self, draft: &'a CallDraft) -> Option<&'a PhoneNumber> {
        draft
            .numbers()
            .into_iter()
            .find(|number| self.active_lines.contains_key(*number))
    }

    fn materialise(&mut self, draft: CallDraft) -> Call {
        self.last_id += 1;
        let id = CallId::new(self.last_id);

        for number in draft.numbers() {
            self.active_lines.insert(number.clone(), id);
        }

        let call = draft.into_call(id);
        self.calls.insert(id, without_events(&call));
        call
    }

    fn release_lines(&mut self, id: CallId) {
        self.active_lines.retain(|_, call_id| *call_id != id);
    }

    fn ended_calls(&self) -> impl Iterator<Item = &Call> {
        self.calls.values().filter(|call| !call.is_active())
    }
}

fn without_events(call: &Call) -> Call {
    let mut stored = call.clone();
    stored.take_events();
    stored
}

/// Call store kept in process memory
#[derive(Default)]
pub struct MemoryCallStore {
    state: RwLock<MemoryState>,
}

impl MemoryCallStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CallStore for MemoryCallStore {
    async fn find_active_calls(&self) -> Result<Vec<Call>> {
        let state = self.state.read().await;
        Ok(state.calls.values().filter(|c| c.is_active()).cloned().collect())
    }

    async fn find_by_id(&self, id: CallId) -> Result<Option<Call>> {
        Ok(self.state.read().await.calls.get(&id).cloned())
    }

    async fn find_ended_calls_by_direction(&self, direction: CallDirection) -> Result<Vec<Call>> {
        let state = self.state.read().await;
        Ok(state
            .ended_calls()
            .filter(|c| c.direction() == direction)
            .cloned()
            .collect())
    }

    async fn find_all_ended(&self) -> Result<Vec<Call>> {
        let state = self.state.read().await;
        Ok(state.ended_calls().cloned().collect())
    }

    async fn insert(&self, draft: CallDraft) -> Result<Call> {
        let mut state = self.state.write().await;

        if let Some(number) = state.busy_number(&draft) {
            return Err(DomainError::LineBusy(number.to_string()));
        }

        let call = state.materialise(draft);
        debug!("Stored call {}", call.id());
        Ok(call)
    }

    async fn insert_batch(&self, drafts: Vec<CallDraft>) -> Result<Vec<Call>> {
        let mut state = self.state.write().await;

        // Check the whole batch, members included, before claiming anything
        let mut claimed: HashMap<&PhoneNumber, usize> = HashMap::new();
        for (index, draft) in drafts.iter().enumerate() {
            if let Some(number) = state.busy_number(draft) {
                return Err(DomainError::LineBusy(number.to_string()));
            }
            for number in draft.numbers() {
                if claimed.insert(number, index).is_some() {
                    return Err(DomainError::LineBusy(number.to_string()));
                }
            }
        }

        let calls: Vec<Call> = drafts
            .into_iter()
            .map(|draft| state.materialise(draft))
            .collect();

        debug!("Stored batch of {} calls", calls.len());
        Ok(calls)
    }

    async fn update(&self, call: &Call) -> Result<Call> {
        let mut state = self.state.write().await;

        let stored_status = match state.calls.get(&call.id()) {
            Some(stored) => stored.status(),
            None => return Err(DomainError::NotFound(call.id())),
        };

        match (stored_status, call.status()) {
            (CallStatus::Ended, CallStatus::Ended) => {
                return Err(DomainError::AlreadyEnded(call.id()));
            }
            (CallStatus::Ended, CallStatus::Active) => {
                return Err(DomainError::InvalidStateTransition(format!(
                    "Call {} cannot become active again",
                    call.id()
                )));
            }
            (CallStatus::Active, CallStatus::Ended) => state.release_lines(call.id()),
            (CallStatus::Active, CallStatus::Active) => {}
        }

        let stored = without_events(call);
        state.calls.insert(call.id(), stored.clone());
        debug!("Updated call {}", call.id());
        Ok(stored)
    }

    async fn delete_by_id(&self, id: CallId) -> Result<()> {
        let mut state = self.state.write().await;

        if state.calls.remove(&id).is_none() {
            return Err(DomainError::NotFound(id));
        }

        state.release_lines(id);
        debug!("Deleted call {}", id);
        Ok(())
    }

    async fn list(&self, filters: &CallFilters, limit: i64, offset: i64) -> Result<Vec<Call>> {
        let state = self.state.read().await;

        let mut calls: Vec<&Call> = state.calls.values().filter(|c| filters.matches(c)).collect();
        calls.sort_by(|a, b| b.started_at().cmp(a.started_at()).then(b.id().cmp(&a.id())));

        Ok(calls
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }

    async fn count(&self, filters: &CallFilters) -> Result<u64> {
        let state = self.state.read().await;
        Ok(state.calls.values().filter(|c| filters.matches(c)).count() as u64)
    }
}
