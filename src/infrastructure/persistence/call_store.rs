//! PostgreSQL implementation of the call store
//!
//! The one-active-call-per-number rule is held by the `active_lines` table:
//! its primary key is the phone number, and a call claims both of its
//! numbers in the same transaction that inserts it. A conflicting claim
//! fails with a unique violation and the whole insert rolls back.

use crate::domain::call::{Call, CallDirection, CallDraft, CallFilters, CallStatus, CallStore};
use crate::domain::shared::error::{DomainError, Result};
use crate::domain::shared::value_objects::{CallId, PhoneNumber};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use tracing::{debug, error};

const UNIQUE_VIOLATION: &str = "23505";

const SELECT_CALLS: &str = r#"
    SELECT id, caller_number, callee_number, direction, status, start_time, end_time
    FROM calls
"#;

#[derive(FromRow)]
struct CallRow {
    id: i64,
    caller_number: String,
    callee_number: String,
    direction: String,
    status: String,
    start_time: DateTime<Utc>,
    end_time: Option<DateTime<Utc>>,
}

impl TryFrom<CallRow> for Call {
    type Error = DomainError;

    fn try_from(r: CallRow) -> Result<Self> {
        let corrupt = |e: DomainError| DomainError::Storage(format!("Row {}: {}", r.id, e));

        Call::restore(
            CallId::new(r.id),
            PhoneNumber::parse(r.caller_number.as_str()).map_err(corrupt)?,
            PhoneNumber::parse(r.callee_number.as_str()).map_err(corrupt)?,
            r.direction.parse::<CallDirection>().map_err(corrupt)?,
            r.status.parse::<CallStatus>().map_err(corrupt)?,
            r.start_time,
            r.end_time,
        )
    }
}

fn storage_error(e: sqlx::Error) -> DomainError {
    error!("Call store query failed: {}", e);
    DomainError::Storage(format!("Database error: {}", e))
}

fn is_unique_violation(e: &sqlx::Error) -> bool {
    e.as_database_error()
        .and_then(|db| db.code())
        .map_or(false, |code| code == UNIQUE_VIOLATION)
}

fn into_calls(rows: Vec<CallRow>) -> Result<Vec<Call>> {
    rows.into_iter().map(Call::try_from).collect()
}

pub struct PgCallStore {
    pool: PgPool,
}

impl PgCallStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch_calls(&self, condition: &str) -> Result<Vec<Call>> {
        let rows = sqlx::query_as::<_, CallRow>(&format!("{} {} ORDER BY id", SELECT_CALLS, condition))
            .fetch_all(&self.pool)
            .await
            .map_err(storage_error)?;

        into_calls(rows)
    }

    /// Insert a draft and claim its lines inside an open transaction
    async fn insert_in_tx(tx: &mut Transaction<'_, Postgres>, draft: &CallDraft) -> std::result::Result<CallId, sqlx::Error> {
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO calls (caller_number, callee_number, direction, status, start_time)
            VALUES ($1, $2, $3, 'ACTIVE', $4)
            RETURNING id
            "#,
        )
        .bind(draft.caller_number().as_str())
        .bind(draft.callee_number().as_str())
        .bind(draft.direction().as_str())
        .bind(*draft.started_at())
        .fetch_one(&mut **tx)
        .await?;

        sqlx::query("INSERT INTO active_lines (phone_number, call_id) VALUES ($1, $3), ($2, $3)")
            .bind(draft.caller_number().as_str())
            .bind(draft.callee_number().as_str())
            .bind(id)
            .execute(&mut **tx)
            .await?;

        Ok(CallId::new(id))
    }

    /// Resolve which of the numbers lost the race for a line
    async fn busy_line(&self, drafts: &[CallDraft]) -> DomainError {
        let numbers: Vec<String> = drafts
            .iter()
            .flat_map(|d| d.numbers().map(|n| n.to_string()))
            .collect();

        let taken: Option<String> = sqlx::query_scalar(
            "SELECT phone_number FROM active_lines WHERE phone_number = ANY($1) LIMIT 1",
        )
        .bind(&numbers[..])
        .fetch_optional(&self.pool)
        .await
        .ok()
        .flatten();

        // Otherwise the conflict was between two members of the same batch
        let number = taken
            .or_else(|| duplicate_number(&numbers))
            .unwrap_or_else(|| numbers.first().cloned().unwrap_or_default());

        DomainError::LineBusy(number)
    }
}

fn duplicate_number(numbers: &[String]) -> Option<String> {
    numbers
        .iter()
        .enumerate()
        .find(|&(i, n)| numbers[..i].contains(n))
        .map(|(_, n)| n.clone())
}

#[async_trait]
impl CallStore for PgCallStore {
    async fn find_active_calls(&self) -> Result<Vec<Call>> {
        debug!("Loading active calls");
        self.fetch_calls("WHERE status = 'ACTIVE'").await
    }

    async fn find_by_id(&self, id: CallId) -> Result<Option<Call>> {
        debug!("Getting call by id: {}", id);

        let row = sqlx::query_as::<_, CallRow>(&format!("{} WHERE id = $1", SELECT_CALLS))
            .bind(id.as_i64())
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_error)?;

        row.map(Call::try_from).transpose()
    }

    async fn find_ended_calls_by_direction(&self, direction: CallDirection) -> Result<Vec<Call>> {
        debug!("Loading ended {} calls", direction);

        let rows = sqlx::query_as::<_, CallRow>(&format!(
            "{} WHERE status = 'ENDED' AND direction = $1 ORDER BY id",
            SELECT_CALLS
        ))
        .bind(direction.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(storage_error)?;

        into_calls(rows)
    }

    async fn find_all_ended(&self) -> Result<Vec<Call>> {
        debug!("Loading ended calls");
        self.fetch_calls("WHERE status = 'ENDED'").await
    }

    async fn insert(&self, draft: CallDraft) -> Result<Call> {
        let mut tx = self.pool.begin().await.map_err(storage_error)?;

        match Self::insert_in_tx(&mut tx, &draft).await {
            Ok(id) => {
                tx.commit().await.map_err(storage_error)?;
                debug!("Call created: {}", id);
                Ok(draft.into_call(id))
            }
            Err(e) if is_unique_violation(&e) => {
                tx.rollback().await.map_err(storage_error)?;
                Err(self.busy_line(std::slice::from_ref(&draft)).await)
            }
            Err(e) => Err(storage_error(e)),
        }
    }

    async fn insert_batch(&self, drafts: Vec<CallDraft>) -> Result<Vec<Call>> {
        let mut tx = self.pool.begin().await.map_err(storage_error)?;
        let mut ids = Vec::with_capacity(drafts.len());

        for draft in &drafts {
            match Self::insert_in_tx(&mut tx, draft).await {
                Ok(id) => ids.push(id),
                Err(e) if is_unique_violation(&e) => {
                    tx.rollback().await.map_err(storage_error)?;
                    return Err(self.busy_line(&drafts).await);
                }
                Err(e) => return Err(storage_error(e)),
            }
        }

        tx.commit().await.map_err(storage_error)?;
        debug!("Batch of {} calls created", ids.len());

        Ok(drafts
            .into_iter()
            .zip(ids)
            .map(|(draft, id)| draft.into_call(id))
            .collect())
    }

    async fn update(&self, call: &Call) -> Result<Call> {
        debug!("Updating call: {}", call.id());
        let mut tx = self.pool.begin().await.map_err(storage_error)?;

        // Only an active row may change; a concurrent end leaves 0 rows here
        let result = sqlx::query(
            r#"
            UPDATE calls
            SET status = $2, end_time = $3
            WHERE id = $1 AND status = 'ACTIVE'
            "#,
        )
        .bind(call.id().as_i64())
        .bind(call.status().as_str())
        .bind(call.ended_at().copied())
        .execute(&mut *tx)
        .await
        .map_err(storage_error)?;

        if result.rows_affected() == 0 {
            tx.rollback().await.map_err(storage_error)?;
            return match self.find_by_id(call.id()).await? {
                Some(_) if call.status() == CallStatus::Ended => Err(DomainError::AlreadyEnded(call.id())),
                Some(_) => Err(DomainError::InvalidStateTransition(format!(
                    "Call {} cannot become active again",
                    call.id()
                ))),
                None => Err(DomainError::NotFound(call.id())),
            };
        }

        if !call.is_active() {
            sqlx::query("DELETE FROM active_lines WHERE call_id = $1")
                .bind(call.id().as_i64())
                .execute(&mut *tx)
                .await
                .map_err(storage_error)?;
        }

        tx.commit().await.map_err(storage_error)?;

        let mut stored = call.clone();
        stored.take_events();
        Ok(stored)
    }

    async fn delete_by_id(&self, id: CallId) -> Result<()> {
        debug!("Deleting call: {}", id);

        // active_lines rows go with the call (ON DELETE CASCADE)
        let result = sqlx::query("DELETE FROM calls WHERE id = $1")
            .bind(id.as_i64())
            .execute(&self.pool)
            .await
            .map_err(storage_error)?;

        if result.rows_affected() == 0 {
            return Err(DomainError::NotFound(id));
        }

        Ok(())
    }

    async fn list(&self, filters: &CallFilters, limit: i64, offset: i64) -> Result<Vec<Call>> {
        debug!("Listing calls with filters: {:?}", filters);

        let rows = sqlx::query_as::<_, CallRow>(&format!(
            r#"{}
            WHERE ($1::TEXT IS NULL OR direction = $1)
              AND ($2::TEXT IS NULL OR status = $2)
            ORDER BY start_time DESC, id DESC
            LIMIT $3 OFFSET $4
            "#,
            SELECT_CALLS
        ))
        .bind(filters.direction.map(|d| d.as_str()))
        .bind(filters.status.map(|s| s.as_str()))
        .bind(limit.max(0))
        .bind(offset.max(0))
        .fetch_all(&self.pool)
        .await
        .map_err(storage_error)?;

        into_calls(rows)
    }

    async fn count(&self, filters: &CallFilters) -> Result<u64> {
        debug!("Counting calls with filters: {:?}", filters);

        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM calls
            WHERE ($1::TEXT IS NULL OR direction = $1)
              AND ($2::TEXT IS NULL OR status = $2)
            "#,
        )
        .bind(filters.direction.map(|d| d.as_str()))
        .bind(filters.status.map(|s| s.as_str()))
        .fetch_one(&self.pool)
        .await
        .map_err(storage_error)?;

        Ok(count as u64)
    }
}
