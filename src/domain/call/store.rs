//! Call store interface

use crate::domain::call::aggregate::{Call, CallDraft};
use crate::domain::call::value_object::{CallDirection, CallStatus};
use crate::domain::shared::error::Result;
use crate::domain::shared::value_objects::CallId;
use async_trait::async_trait;

/// Persistence port for the Call aggregate
///
/// This is defined in the domain layer as a trait (port),
/// and implemented in the infrastructure layer (adapter).
///
/// Implementations enforce "one active call per number" atomically with
/// their writes: `insert` and `insert_batch` fail with
/// [`DomainError::LineBusy`](crate::domain::shared::DomainError::LineBusy)
/// when a number of the new call is already on an active call, whatever
/// the caller checked beforehand.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CallStore: Send + Sync {
    /// All calls currently in the `ACTIVE` state
    async fn find_active_calls(&self) -> Result<Vec<Call>>;

    /// Find a call by its ID
    async fn find_by_id(&self, id: CallId) -> Result<Option<Call>>;

    /// Ended calls of one direction
    async fn find_ended_calls_by_direction(&self, direction: CallDirection) -> Result<Vec<Call>>;

    /// All ended calls
    async fn find_all_ended(&self) -> Result<Vec<Call>>;

    /// Persist a new active call, assigning its id
    async fn insert(&self, draft: CallDraft) -> Result<Call>;

    /// Persist several new active calls; all of them or none
    async fn insert_batch(&self, drafts: Vec<CallDraft>) -> Result<Vec<Call>>;

    /// Persist the new state of an existing call
    async fn update(&self, call: &Call) -> Result<Call>;

    /// Remove a call whatever its state
    async fn delete_by_id(&self, id: CallId) -> Result<()>;

    /// List calls matching the filters, newest first
    async fn list(&self, filters: &CallFilters, limit: i64, offset: i64) -> Result<Vec<Call>>;

    /// Count calls matching the filters
    async fn count(&self, filters: &CallFilters) -> Result<u64>;
}

/// Filters for call queries
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallFilters {
    pub direction: Option<CallDirection>,
    pub status: Option<CallStatus>,
}

impl CallFilters {
    /// Build filters from raw query values; empty strings mean "any"
    pub fn parse(direction: Option<&str>, status: Option<&str>) -> Result<Self> {
        let direction = match direction {
            Some(d) if !d.is_empty() => Some(d.parse()?),
            _ => None,
        };
        let status = match status {
            Some(s) if !s.is_empty() => Some(s.parse()?),
            _ => None,
        };

        Ok(Self { direction, status })
    }

    pub fn matches(&self, call: &Call) -> bool {
        self.direction.map_or(true, |d| call.direction() == d)
            && self.status.map_or(true, |s| call.status() == s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::shared::DomainError;

    #[test]
    fn test_filters_default() {
        let filters = CallFilters::default();

        assert!(filters.direction.is_none());
        assert!(filters.status.is_none());
    }

    #[test]
    fn test_filters_parse() {
        let filters = CallFilters::parse(Some("OUTBOUND"), Some("")).unwrap();
        assert_eq!(filters.direction, Some(CallDirection::Outbound));
        assert_eq!(filters.status, None);

        let filters = CallFilters::parse(None, Some("ENDED")).unwrap();
        assert_eq!(filters.status, Some(CallStatus::Ended));

        assert!(matches!(
            CallFilters::parse(Some("SIDEWAYS"), None),
            Err(DomainError::InvalidRequest(_))
        ));
    }
}
