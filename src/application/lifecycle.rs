//! Call lifecycle use cases
//!
//! Creates, ends and deletes calls against the current state of the store.
//! Nothing is cached between operations: every decision is taken on a fresh
//! read, and the store re-checks line availability atomically on insert.

use crate::domain::call::{
    Call, CallDomainService, CallEvent, CallFilters, CallStore, CreateCallRequest,
};
use crate::domain::shared::error::{DomainError, Result};
use crate::domain::shared::value_objects::CallId;
use crate::infrastructure::messaging::CallEventBroadcaster;
use crate::infrastructure::metrics;
use std::sync::Arc;
use tracing::{info, warn};

/// Application service owning the `ACTIVE -> ENDED` lifecycle
pub struct LifecycleManager {
    store: Arc<dyn CallStore>,
    events: Option<Arc<CallEventBroadcaster>>,
}

impl LifecycleManager {
    pub fn new(store: Arc<dyn CallStore>) -> Self {
        Self {
            store,
            events: None,
        }
    }

    pub fn with_event_broadcaster(mut self, events: Arc<CallEventBroadcaster>) -> Self {
        self.events = Some(events);
        self
    }

    /// Start a call between two free numbers
    pub async fn create(&self, request: CreateCallRequest) -> Result<Call> {
        let draft = CallDomainService::validate_call_setup(&request)
            .map_err(|e| Self::rejected("create", e))?;

        let active = self.store.find_active_calls().await?;
        let busy = CallDomainService::busy_numbers(&active);
        CallDomainService::ensure_lines_free(&draft, &busy)
            .map_err(|e| Self::rejected("create", e))?;

        let mut call = self
            .store
            .insert(draft)
            .await
            .map_err(|e| Self::rejected("create", e))?;

        info!(
            call_id = %call.id(),
            caller = %call.caller_number(),
            callee = %call.callee_number(),
            direction = %call.direction(),
            "Call created"
        );
        metrics::record_call_created(call.direction());
        self.publish(call.take_events());

        Ok(call)
    }

    /// Start several calls at once
    ///
    /// Requests are validated in order; each one sees the numbers claimed by
    /// the ones before it. The first failure rejects the whole batch and
    /// nothing is written.
    pub async fn create_bulk(&self, requests: Vec<CreateCallRequest>) -> Result<Vec<Call>> {
        if requests.is_empty() {
            return Ok(Vec::new());
        }

        let active = self.store.find_active_calls().await?;
        let mut busy = CallDomainService::busy_numbers(&active);
        let mut drafts = Vec::with_capacity(requests.len());

        for request in &requests {
            let draft = CallDomainService::validate_call_setup(request)
                .and_then(|draft| {
                    CallDomainService::ensure_lines_free(&draft, &busy)?;
                    Ok(draft)
                })
                .map_err(|e| Self::rejected("create_bulk", e))?;

            busy.extend(draft.numbers().map(|number| number.clone()));
            drafts.push(draft);
        }

        let mut calls = self
            .store
            .insert_batch(drafts)
            .await
            .map_err(|e| Self::rejected("create_bulk", e))?;

        info!(count = calls.len(), "Calls created in bulk");
        for call in &mut calls {
            metrics::record_call_created(call.direction());
            self.publish(call.take_events());
        }

        Ok(calls)
    }

    /// End an active call now
    pub async fn end(&self, id: CallId) -> Result<Call> {
        let mut call = self.find(id, "end").await?;

        call.end().map_err(|e| Self::rejected("end", e))?;

        let events = call.take_events();
        let stored = self
            .store
            .update(&call)
            .await
            .map_err(|e| Self::rejected("end", e))?;

        if let Some(length) = stored.duration() {
            info!(call_id = %id, duration_ms = length.num_milliseconds(), "Call ended");
            metrics::record_call_ended(stored.direction(), length);
        }
        self.publish(events);

        Ok(stored)
    }

    /// Remove a call record whatever its state
    pub async fn delete(&self, id: CallId) -> Result<()> {
        let call = self.find(id, "delete").await?;

        self.store
            .delete_by_id(id)
            .await
            .map_err(|e| Self::rejected("delete", e))?;

        info!(call_id = %id, was_active = call.is_active(), "Call deleted");
        metrics::record_call_deleted();
        self.publish(vec![CallEvent::deleted(id, call.is_active())]);

        Ok(())
    }

    /// Look up one call
    pub async fn get(&self, id: CallId) -> Result<Call> {
        self.find(id, "get").await
    }

    /// List calls, newest first
    pub async fn list(&self, filters: &CallFilters, limit: i64, offset: i64) -> Result<Vec<Call>> {
        if limit < 0 || offset < 0 {
            return Err(Self::rejected(
                "list",
                DomainError::InvalidRequest(format!(
                    "Limit and offset must not be negative (limit {}, offset {})",
                    limit, offset
                )),
            ));
        }

        self.store.list(filters, limit, offset).await
    }

    pub async fn count(&self, filters: &CallFilters) -> Result<u64> {
        self.store.count(filters).await
    }

    async fn find(&self, id: CallId, operation: &'static str) -> Result<Call> {
        self.store
            .find_by_id(id)
            .await?
            .ok_or_else(|| Self::rejected(operation, DomainError::NotFound(id)))
    }

    fn publish(&self, events: Vec<CallEvent>) {
        if let Some(broadcaster) = &self.events {
            for event in events {
                broadcaster.broadcast(event);
            }
        }
    }

    /// Log and count a failed request, passing the error through
    fn rejected(operation: &'static str, error: DomainError) -> DomainError {
        match &error {
            DomainError::Storage(_) => {}
            _ => warn!(operation, reason = error.kind(), "Request rejected: {}", error),
        }
        metrics::record_rejected(operation, error.kind());
        error
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::call::store::MockCallStore;
    use crate::domain::call::{CallDirection, CallStatus};
    use crate::domain::shared::value_objects::PhoneNumber;
    use chrono::{Duration, Utc};

    fn stored_call(id: i64, caller: &str, callee: &str, status: CallStatus) -> Call {
        let start = Utc::now() - Duration::minutes(2);
        let end = match status {
            CallStatus::Active => None,
            CallStatus::Ended => Some(start + Duration::minutes(1)),
        };

        Call::restore(
            CallId::new(id),
            PhoneNumber::parse(caller).unwrap(),
            PhoneNumber::parse(callee).unwrap(),
            CallDirection::Outbound,
            status,
            start,
            end,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_invalid_request_never_reaches_store() {
        let mut store = MockCallStore::new();
        store.expect_find_active_calls().never();
        store.expect_insert().never();

        let manager = LifecycleManager::new(Arc::new(store));
        let result = manager
            .create(CreateCallRequest::new("A", "A", CallDirection::Inbound))
            .await;

        assert!(matches!(result, Err(DomainError::InvalidRequest(_))));
    }

    #[tokio::test]
    async fn test_busy_line_never_reaches_insert() {
        let mut store = MockCallStore::new();
        store
            .expect_find_active_calls()
            .times(1)
            .returning(|| Ok(vec![stored_call(1, "111", "222", CallStatus::Active)]));
        store.expect_insert().never();

        let manager = LifecycleManager::new(Arc::new(store));
        let result = manager
            .create(CreateCallRequest::new("111", "333", CallDirection::Outbound))
            .await;

        assert_eq!(result.unwrap_err(), DomainError::LineBusy("111".to_string()));
    }

    #[tokio::test]
    async fn test_store_guard_conflict_is_reported() {
        // Another writer claimed the line between the check and the insert
        let mut store = MockCallStore::new();
        store.expect_find_active_calls().returning(|| Ok(vec![]));
        store
            .expect_insert()
            .times(1)
            .returning(|_| Err(DomainError::LineBusy("111".to_string())));

        let manager = LifecycleManager::new(Arc::new(store));
        let result = manager
            .create(CreateCallRequest::new("111", "333", CallDirection::Outbound))
            .await;

        assert_eq!(result.unwrap_err(), DomainError::LineBusy("111".to_string()));
    }

    #[tokio::test]
    async fn test_end_already_ended_skips_update() {
        let mut store = MockCallStore::new();
        store
            .expect_find_by_id()
            .returning(|id| Ok(Some(stored_call(id.as_i64(), "111", "222", CallStatus::Ended))));
        store.expect_update().never();

        let manager = LifecycleManager::new(Arc::new(store));
        let result = manager.end(CallId::new(5)).await;

        assert_eq!(result.unwrap_err(), DomainError::AlreadyEnded(CallId::new(5)));
    }

    #[tokio::test]
    async fn test_delete_unknown_id_skips_delete() {
        let mut store = MockCallStore::new();
        store.expect_find_by_id().returning(|_| Ok(None));
        store.expect_delete_by_id().never();

        let manager = LifecycleManager::new(Arc::new(store));
        let result = manager.delete(CallId::new(404)).await;

        assert_eq!(result.unwrap_err(), DomainError::NotFound(CallId::new(404)));
    }

    #[tokio::test]
    async fn test_bulk_failure_writes_nothing() {
        let mut store = MockCallStore::new();
        store.expect_find_active_calls().returning(|| Ok(vec![]));
        store.expect_insert_batch().never();

        let manager = LifecycleManager::new(Arc::new(store));
        let result = manager
            .create_bulk(vec![
                CreateCallRequest::new("111", "222", CallDirection::Outbound),
                CreateCallRequest::new("333", "111", CallDirection::Inbound),
            ])
            .await;

        assert_eq!(result.unwrap_err(), DomainError::LineBusy("111".to_string()));
    }

    #[tokio::test]
    async fn test_storage_errors_propagate() {
        let mut store = MockCallStore::new();
        store
            .expect_find_by_id()
            .returning(|_| Err(DomainError::Storage("connection reset".to_string())));

        let manager = LifecycleManager::new(Arc::new(store));
        let result = manager.get(CallId::new(1)).await;

        assert_eq!(
            result.unwrap_err(),
            DomainError::Storage("connection reset".to_string())
        );
    }

    #[tokio::test]
    async fn test_negative_paging_is_rejected() {
        let mut store = MockCallStore::new();
        store.expect_list().never();

        let manager = LifecycleManager::new(Arc::new(store));
        let result = manager.list(&CallFilters::default(), -1, 0).await;

        assert!(matches!(result, Err(DomainError::InvalidRequest(_))));
    }
}
