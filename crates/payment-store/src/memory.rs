use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use common::{PaymentId, TransactionId, UserId};
use tokio::sync::RwLock;

use crate::error::{Result, StoreError};
use crate::payment::{NewPayment, Payment, PaymentStatus};
use crate::store::{Page, PageRequest, PaymentStore, StatusTotals, validate_new_payment};

#[derive(Default)]
struct Inner {
    payments: HashMap<PaymentId, Payment>,
    fail_on_update: bool,
}

/// In-memory payment store implementation.
///
/// Stores all records behind a single async lock and provides the same
/// interface as the PostgreSQL implementation. The write lock makes every
/// status update an atomic read-modify-write.
#[derive(Clone, Default)]
pub struct InMemoryPaymentStore {
    inner: Arc<RwLock<Inner>>,
}

impl InMemoryPaymentStore {
    /// Creates a new empty in-memory payment store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the total number of payments stored.
    pub async fn payment_count(&self) -> usize {
        self.inner.read().await.payments.len()
    }

    /// Configures the store to fail status updates with `Unavailable`.
    pub async fn set_fail_on_update(&self, fail: bool) {
        self.inner.write().await.fail_on_update = fail;
    }

    /// Removes a record, simulating an out-of-band administrative delete.
    pub async fn remove(&self, id: PaymentId) -> bool {
        self.inner.write().await.payments.remove(&id).is_some()
    }

    /// Clears all payments.
    pub async fn clear(&self) {
        self.inner.write().await.payments.clear();
    }
}

#[async_trait]
impl PaymentStore for InMemoryPaymentStore {
    async fn create(&self, new: NewPayment) -> Result<Payment> {
        validate_new_payment(&new)?;

        let now = Utc::now();
        let payment = Payment {
            id: PaymentId::new(),
            order_id: new.order_id,
            user_id: new.user_id,
            amount: new.amount,
            status: PaymentStatus::Pending,
            transaction_id: TransactionId::generate(),
            created_at: now,
            updated_at: now,
        };

        let mut inner = self.inner.write().await;
        inner.payments.insert(payment.id, payment.clone());
        Ok(payment)
    }

    async fn get(&self, id: PaymentId, user_id: UserId) -> Result<Option<Payment>> {
        let inner = self.inner.read().await;
        Ok(inner
            .payments
            .get(&id)
            .filter(|p| p.user_id == user_id)
            .cloned())
    }

    async fn update_status(&self, id: PaymentId, status: PaymentStatus) -> Result<Payment> {
        let mut inner = self.inner.write().await;

        if inner.fail_on_update {
            return Err(StoreError::Unavailable("store rejected write".to_string()));
        }

        let payment = inner
            .payments
            .get_mut(&id)
            .ok_or(StoreError::NotFound(id))?;

        if !payment.status.can_transition_to(status) {
            return Err(StoreError::InvalidTransition {
                from: payment.status,
                to: status,
            });
        }

        payment.status = status;
        payment.updated_at = Utc::now();
        Ok(payment.clone())
    }

    async fn list(
        &self,
        user_id: UserId,
        page: PageRequest,
        status: Option<PaymentStatus>,
    ) -> Result<Page<Payment>> {
        let inner = self.inner.read().await;

        let mut matching: Vec<&Payment> = inner
            .payments
            .values()
            .filter(|p| p.user_id == user_id)
            .filter(|p| status.is_none_or(|s| p.status == s))
            .collect();

        // Newest first; the id tiebreak keeps ordering stable for records
        // created within the same timestamp tick.
        matching.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.as_uuid().cmp(&a.id.as_uuid()))
        });

        let total = matching.len() as u64;
        let items = matching
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.limit as usize)
            .cloned()
            .collect();

        Ok(Page {
            items,
            total,
            page: page.page,
            limit: page.limit,
        })
    }

    async fn stats(&self, user_id: UserId) -> Result<HashMap<PaymentStatus, StatusTotals>> {
        let inner = self.inner.read().await;

        let mut stats: HashMap<PaymentStatus, StatusTotals> = HashMap::new();
        for payment in inner.payments.values().filter(|p| p.user_id == user_id) {
            let entry = stats.entry(payment.status).or_default();
            entry.count += 1;
            entry.total += payment.amount;
        }
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::Money;

    fn new_payment(user_id: UserId, cents: i64) -> NewPayment {
        NewPayment::new("ord_1", user_id, Money::from_cents(cents))
    }

    #[tokio::test]
    async fn test_create_assigns_pending_status_and_ids() {
        let store = InMemoryPaymentStore::new();
        let user_id = UserId::new();

        let payment = store.create(new_payment(user_id, 4999)).await.unwrap();

        assert_eq!(payment.status, PaymentStatus::Pending);
        assert_eq!(payment.amount, Money::from_cents(4999));
        assert!(payment.transaction_id.is_well_formed());
        assert_eq!(payment.created_at, payment.updated_at);
    }

    #[tokio::test]
    async fn test_create_never_reuses_ids() {
        let store = InMemoryPaymentStore::new();
        let user_id = UserId::new();

        let a = store.create(new_payment(user_id, 100)).await.unwrap();
        let b = store.create(new_payment(user_id, 100)).await.unwrap();

        assert_ne!(a.id, b.id);
        assert_ne!(a.transaction_id, b.transaction_id);
    }

    #[tokio::test]
    async fn test_create_rejects_invalid_amount() {
        let store = InMemoryPaymentStore::new();
        let result = store.create(new_payment(UserId::new(), 0)).await;
        assert!(matches!(result, Err(StoreError::Validation(_))));
        assert_eq!(store.payment_count().await, 0);
    }

    #[tokio::test]
    async fn test_get_is_owner_scoped() {
        let store = InMemoryPaymentStore::new();
        let owner = UserId::new();
        let stranger = UserId::new();

        let payment = store.create(new_payment(owner, 100)).await.unwrap();

        assert!(store.get(payment.id, owner).await.unwrap().is_some());
        // Foreign ownership is indistinguishable from absence.
        assert!(store.get(payment.id, stranger).await.unwrap().is_none());
        assert!(store.get(PaymentId::new(), owner).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_get_is_idempotent() {
        let store = InMemoryPaymentStore::new();
        let owner = UserId::new();
        let payment = store.create(new_payment(owner, 100)).await.unwrap();

        let first = store.get(payment.id, owner).await.unwrap().unwrap();
        let second = store.get(payment.id, owner).await.unwrap().unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_update_status_to_terminal() {
        let store = InMemoryPaymentStore::new();
        let owner = UserId::new();
        let payment = store.create(new_payment(owner, 100)).await.unwrap();

        let updated = store
            .update_status(payment.id, PaymentStatus::Approved)
            .await
            .unwrap();

        assert_eq!(updated.status, PaymentStatus::Approved);
        assert!(updated.updated_at >= payment.updated_at);
    }

    #[tokio::test]
    async fn test_update_status_rejects_terminal_overwrite() {
        let store = InMemoryPaymentStore::new();
        let owner = UserId::new();
        let payment = store.create(new_payment(owner, 100)).await.unwrap();

        store
            .update_status(payment.id, PaymentStatus::Approved)
            .await
            .unwrap();

        for next in [
            PaymentStatus::Pending,
            PaymentStatus::Rejected,
            PaymentStatus::Approved,
        ] {
            let result = store.update_status(payment.id, next).await;
            assert!(matches!(
                result,
                Err(StoreError::InvalidTransition {
                    from: PaymentStatus::Approved,
                    ..
                })
            ));
        }

        // The stored record is untouched.
        let stored = store.get(payment.id, owner).await.unwrap().unwrap();
        assert_eq!(stored.status, PaymentStatus::Approved);
    }

    #[tokio::test]
    async fn test_update_status_missing_record() {
        let store = InMemoryPaymentStore::new();
        let result = store
            .update_status(PaymentId::new(), PaymentStatus::Approved)
            .await;
        assert!(matches!(result, Err(StoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_list_newest_first_with_filter() {
        let store = InMemoryPaymentStore::new();
        let owner = UserId::new();

        let first = store.create(new_payment(owner, 100)).await.unwrap();
        let second = store.create(new_payment(owner, 200)).await.unwrap();
        let third = store.create(new_payment(owner, 300)).await.unwrap();
        store
            .update_status(second.id, PaymentStatus::Rejected)
            .await
            .unwrap();

        let page = store
            .list(owner, PageRequest::default(), None)
            .await
            .unwrap();
        assert_eq!(page.total, 3);
        assert_eq!(page.items.len(), 3);
        for window in page.items.windows(2) {
            assert!(window[0].created_at >= window[1].created_at);
        }

        let pending = store
            .list(owner, PageRequest::default(), Some(PaymentStatus::Pending))
            .await
            .unwrap();
        assert_eq!(pending.total, 2);
        let ids: Vec<_> = pending.items.iter().map(|p| p.id).collect();
        assert!(ids.contains(&first.id));
        assert!(ids.contains(&third.id));
    }

    #[tokio::test]
    async fn test_list_pagination() {
        let store = InMemoryPaymentStore::new();
        let owner = UserId::new();
        for _ in 0..5 {
            store.create(new_payment(owner, 100)).await.unwrap();
        }

        let page = store
            .list(owner, PageRequest::new(2, 2), None)
            .await
            .unwrap();
        assert_eq!(page.total, 5);
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.page, 2);
        assert_eq!(page.pages(), 3);

        let last = store
            .list(owner, PageRequest::new(3, 2), None)
            .await
            .unwrap();
        assert_eq!(last.items.len(), 1);
    }

    #[tokio::test]
    async fn test_list_excludes_other_owners() {
        let store = InMemoryPaymentStore::new();
        let owner = UserId::new();
        let other = UserId::new();

        store.create(new_payment(owner, 100)).await.unwrap();
        store.create(new_payment(other, 200)).await.unwrap();

        let page = store
            .list(owner, PageRequest::default(), None)
            .await
            .unwrap();
        assert_eq!(page.total, 1);
    }

    #[tokio::test]
    async fn test_stats_groups_by_status() {
        let store = InMemoryPaymentStore::new();
        let owner = UserId::new();

        let a = store.create(new_payment(owner, 1000)).await.unwrap();
        let b = store.create(new_payment(owner, 2500)).await.unwrap();
        store.create(new_payment(owner, 4999)).await.unwrap();
        store
            .update_status(a.id, PaymentStatus::Approved)
            .await
            .unwrap();
        store
            .update_status(b.id, PaymentStatus::Approved)
            .await
            .unwrap();

        let stats = store.stats(owner).await.unwrap();
        assert_eq!(
            stats[&PaymentStatus::Approved],
            StatusTotals {
                count: 2,
                total: Money::from_cents(3500),
            }
        );
        assert_eq!(
            stats[&PaymentStatus::Pending],
            StatusTotals {
                count: 1,
                total: Money::from_cents(4999),
            }
        );
        assert!(!stats.contains_key(&PaymentStatus::Rejected));
    }

    #[tokio::test]
    async fn test_fail_on_update_switch() {
        let store = InMemoryPaymentStore::new();
        let owner = UserId::new();
        let payment = store.create(new_payment(owner, 100)).await.unwrap();

        store.set_fail_on_update(true).await;
        let result = store.update_status(payment.id, PaymentStatus::Approved).await;
        assert!(matches!(result, Err(StoreError::Unavailable(_))));

        store.set_fail_on_update(false).await;
        assert!(
            store
                .update_status(payment.id, PaymentStatus::Approved)
                .await
                .is_ok()
        );
    }
}
