//! PostgreSQL call store integration tests

#![cfg(feature = "postgres")]

use calltrack::config::DatabaseConfig;
use calltrack::domain::call::{CallDirection, CallDraft, CallFilters, CallStatus, CallStore};
use calltrack::domain::shared::value_objects::{CallId, PhoneNumber};
use calltrack::infrastructure::persistence::{create_pool, run_migrations, PgCallStore};
use calltrack::DomainError;
use chrono::{Duration, Utc};
use sqlx::PgPool;

// Numbers used here all start with this prefix
const PREFIX: &str = "+999";

fn number(suffix: &str) -> PhoneNumber {
    PhoneNumber::parse(format!("{}{}", PREFIX, suffix)).unwrap()
}

fn draft(caller: &str, callee: &str, direction: CallDirection) -> CallDraft {
    CallDraft::new(number(caller), number(callee), direction).unwrap()
}

#[tokio::test]
#[ignore] // Requires database
async fn test_insert_and_find() {
    let pool = setup_database().await;
    let store = PgCallStore::new(pool.clone());

    let call = store
        .insert(draft("1001", "1002", CallDirection::Outbound))
        .await
        .expect("Failed to insert call");

    let retrieved = store
        .find_by_id(call.id())
        .await
        .expect("Failed to get call")
        .expect("Call not found");

    assert_eq!(retrieved.caller_number(), &number("1001"));
    assert_eq!(retrieved.callee_number(), &number("1002"));
    assert_eq!(retrieved.direction(), CallDirection::Outbound);
    assert_eq!(retrieved.status(), CallStatus::Active);
    assert!(retrieved.ended_at().is_none());

    cleanup_database(pool, "1").await;
}

#[tokio::test]
#[ignore] // Requires database
async fn test_active_line_guard() {
    let pool = setup_database().await;
    let store = PgCallStore::new(pool.clone());

    store
        .insert(draft("2001", "2002", CallDirection::Outbound))
        .await
        .expect("Failed to insert call");

    let result = store.insert(draft("2003", "2001", CallDirection::Inbound)).await;
    assert_eq!(
        result.unwrap_err(),
        DomainError::LineBusy(number("2001").to_string())
    );

    cleanup_database(pool, "2").await;
}

#[tokio::test]
#[ignore] // Requires database
async fn test_batch_is_all_or_nothing() {
    let pool = setup_database().await;
    let store = PgCallStore::new(pool.clone());

    let result = store
        .insert_batch(vec![
            draft("3001", "3002", CallDirection::Outbound),
            draft("3002", "3003", CallDirection::Inbound),
        ])
        .await;
    assert_eq!(
        result.unwrap_err(),
        DomainError::LineBusy(number("3002").to_string())
    );

    let active = store.find_active_calls().await.unwrap();
    assert!(!active.iter().any(|c| c.involves(&number("3001"))));

    let calls = store
        .insert_batch(vec![
            draft("3001", "3002", CallDirection::Outbound),
            draft("3003", "3004", CallDirection::Inbound),
        ])
        .await
        .expect("Failed to insert batch");
    assert_eq!(calls.len(), 2);

    cleanup_database(pool, "3").await;
}

#[tokio::test]
#[ignore] // Requires database
async fn test_end_releases_lines() {
    let pool = setup_database().await;
    let store = PgCallStore::new(pool.clone());

    let started_at = Utc::now() - Duration::minutes(12);
    let mut call = store
        .insert(draft("4001", "4002", CallDirection::Outbound).with_started_at(started_at))
        .await
        .unwrap();

    call.end_at(started_at + Duration::minutes(12)).unwrap();
    let ended = store.update(&call).await.expect("Failed to update call");
    assert_eq!(ended.status(), CallStatus::Ended);

    // Second update of the same call loses
    assert_eq!(
        store.update(&call).await.unwrap_err(),
        DomainError::AlreadyEnded(call.id())
    );

    let ended_outbound = store
        .find_ended_calls_by_direction(CallDirection::Outbound)
        .await
        .unwrap();
    let stored = ended_outbound
        .iter()
        .find(|c| c.id() == call.id())
        .expect("Ended call not listed");
    assert_eq!(stored.duration(), Some(Duration::minutes(12)));

    store
        .insert(draft("4002", "4001", CallDirection::Inbound))
        .await
        .expect("Lines should be free after end");

    cleanup_database(pool, "4").await;
}

#[tokio::test]
#[ignore] // Requires database
async fn test_delete() {
    let pool = setup_database().await;
    let store = PgCallStore::new(pool.clone());

    let call = store
        .insert(draft("5001", "5002", CallDirection::Inbound))
        .await
        .unwrap();

    store.delete_by_id(call.id()).await.expect("Failed to delete call");
    assert!(store.find_by_id(call.id()).await.unwrap().is_none());
    assert_eq!(
        store.delete_by_id(call.id()).await.unwrap_err(),
        DomainError::NotFound(call.id())
    );

    // The deleted active call no longer holds its lines
    store
        .insert(draft("5001", "5002", CallDirection::Inbound))
        .await
        .expect("Lines should be free after delete");

    cleanup_database(pool, "5").await;
}

#[tokio::test]
#[ignore] // Requires database
async fn test_list_and_count() {
    let pool = setup_database().await;
    let store = PgCallStore::new(pool.clone());

    let inbound = CallFilters::parse(Some("INBOUND"), Some("ACTIVE")).unwrap();
    let before = store.count(&inbound).await.unwrap();

    store
        .insert(draft("6001", "6002", CallDirection::Inbound))
        .await
        .unwrap();
    store
        .insert(draft("6003", "6004", CallDirection::Inbound))
        .await
        .unwrap();

    assert_eq!(store.count(&inbound).await.unwrap(), before + 2);

    let page = store.list(&inbound, 1, 0).await.unwrap();
    assert_eq!(page.len(), 1);
    assert_eq!(page[0].direction(), CallDirection::Inbound);

    assert!(store.find_by_id(CallId::new(i64::MAX)).await.unwrap().is_none());

    cleanup_database(pool, "6").await;
}

// Helper functions

async fn setup_database() -> PgPool {
    let config = DatabaseConfig {
        url: std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "postgres://postgres@localhost/calltrack_test".to_string()),
        max_connections: 5,
        min_connections: 1,
        ..DatabaseConfig::default()
    };

    let pool = create_pool(&config).await.expect("Failed to create pool");
    run_migrations(&pool).await.expect("Failed to run migrations");
    pool
}

async fn cleanup_database(pool: PgPool, block: &str) {
    // Each test owns the numbers `PREFIX` + block digit
    sqlx::query("DELETE FROM calls WHERE caller_number LIKE $1")
        .bind(format!("{}{}%", PREFIX, block))
        .execute(&pool)
        .await
        .ok();
    pool.close().await;
}
