//! PostgreSQL integration tests
//!
//! These tests use a shared PostgreSQL container for efficiency.
//! Run with:
//!
//! ```bash
//! cargo test -p payment-store --test postgres_integration -- --test-threads=1
//! ```

use std::sync::Arc;

use payment_store::{
    Money, NewPayment, PageRequest, PaymentId, PaymentStatus, PaymentStore, PostgresPaymentStore,
    StoreError, UserId,
};
use serial_test::serial;
use sqlx::PgPool;
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;

/// Shared container info - container stays alive for all tests
struct ContainerInfo {
    #[allow(dead_code)] // Container must stay alive for tests
    container: ContainerAsync<Postgres>,
    connection_string: String,
}

/// Global shared container
static CONTAINER: OnceCell<Arc<ContainerInfo>> = OnceCell::const_new();

async fn get_container_info() -> Arc<ContainerInfo> {
    CONTAINER
        .get_or_init(|| async {
            let container = Postgres::default().start().await.unwrap();

            let host = container.get_host().await.unwrap();
            let port = container.get_host_port_ipv4(5432).await.unwrap();

            let connection_string =
                format!("postgres://postgres:postgres@{}:{}/postgres", host, port);

            let temp_pool = PgPool::connect(&connection_string).await.unwrap();
            sqlx::raw_sql(include_str!("../../../migrations/001_create_payments_table.sql"))
                .execute(&temp_pool)
                .await
                .unwrap();
            temp_pool.close().await;

            Arc::new(ContainerInfo {
                container,
                connection_string,
            })
        })
        .await
        .clone()
}

async fn store() -> PostgresPaymentStore {
    let info = get_container_info().await;
    let pool = PgPool::connect(&info.connection_string).await.unwrap();
    PostgresPaymentStore::new(pool)
}

fn new_payment(user_id: UserId, cents: i64) -> NewPayment {
    NewPayment::new("ord_pg", user_id, Money::from_cents(cents))
}

#[tokio::test]
#[serial]
async fn test_create_and_get_roundtrip() {
    let store = store().await;
    let owner = UserId::new();

    let created = store.create(new_payment(owner, 4999)).await.unwrap();
    assert_eq!(created.status, PaymentStatus::Pending);
    assert!(created.transaction_id.is_well_formed());

    let fetched = store.get(created.id, owner).await.unwrap().unwrap();
    assert_eq!(fetched.id, created.id);
    assert_eq!(fetched.amount, Money::from_cents(4999));
    assert_eq!(fetched.transaction_id, created.transaction_id);
}

#[tokio::test]
#[serial]
async fn test_get_scopes_by_owner() {
    let store = store().await;
    let owner = UserId::new();
    let stranger = UserId::new();

    let created = store.create(new_payment(owner, 100)).await.unwrap();

    assert!(store.get(created.id, stranger).await.unwrap().is_none());
    assert!(store.get(PaymentId::new(), owner).await.unwrap().is_none());
}

#[tokio::test]
#[serial]
async fn test_update_status_guards_transitions() {
    let store = store().await;
    let owner = UserId::new();
    let created = store.create(new_payment(owner, 100)).await.unwrap();

    let updated = store
        .update_status(created.id, PaymentStatus::Approved)
        .await
        .unwrap();
    assert_eq!(updated.status, PaymentStatus::Approved);
    assert!(updated.updated_at >= created.updated_at);

    // Terminal status is never overwritten.
    let result = store.update_status(created.id, PaymentStatus::Rejected).await;
    assert!(matches!(
        result,
        Err(StoreError::InvalidTransition {
            from: PaymentStatus::Approved,
            to: PaymentStatus::Rejected,
        })
    ));

    let result = store.update_status(created.id, PaymentStatus::Pending).await;
    assert!(matches!(result, Err(StoreError::InvalidTransition { .. })));
}

#[tokio::test]
#[serial]
async fn test_update_status_missing_record() {
    let store = store().await;
    let result = store
        .update_status(PaymentId::new(), PaymentStatus::Approved)
        .await;
    assert!(matches!(result, Err(StoreError::NotFound(_))));
}

#[tokio::test]
#[serial]
async fn test_list_and_stats() {
    let store = store().await;
    let owner = UserId::new();

    let a = store.create(new_payment(owner, 1000)).await.unwrap();
    store.create(new_payment(owner, 2500)).await.unwrap();
    store.create(new_payment(owner, 4999)).await.unwrap();
    store
        .update_status(a.id, PaymentStatus::Rejected)
        .await
        .unwrap();

    let page = store
        .list(owner, PageRequest::new(1, 2), None)
        .await
        .unwrap();
    assert_eq!(page.total, 3);
    assert_eq!(page.items.len(), 2);
    assert_eq!(page.pages(), 2);
    for window in page.items.windows(2) {
        assert!(window[0].created_at >= window[1].created_at);
    }

    let rejected = store
        .list(owner, PageRequest::default(), Some(PaymentStatus::Rejected))
        .await
        .unwrap();
    assert_eq!(rejected.total, 1);
    assert_eq!(rejected.items[0].id, a.id);

    let stats = store.stats(owner).await.unwrap();
    assert_eq!(stats[&PaymentStatus::Pending].count, 2);
    assert_eq!(stats[&PaymentStatus::Pending].total, Money::from_cents(7499));
    assert_eq!(stats[&PaymentStatus::Rejected].count, 1);
}

#[tokio::test]
#[serial]
async fn test_concurrent_terminal_writes_single_winner() {
    let store = store().await;
    let owner = UserId::new();
    let created = store.create(new_payment(owner, 100)).await.unwrap();

    let approve = {
        let store = store.clone();
        let id = created.id;
        tokio::spawn(async move { store.update_status(id, PaymentStatus::Approved).await })
    };
    let reject = {
        let store = store.clone();
        let id = created.id;
        tokio::spawn(async move { store.update_status(id, PaymentStatus::Rejected).await })
    };

    let results = [approve.await.unwrap(), reject.await.unwrap()];
    let winners = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(winners, 1, "exactly one terminal write must win");

    let stored = store.get(created.id, owner).await.unwrap().unwrap();
    assert!(stored.status.is_terminal());
}
