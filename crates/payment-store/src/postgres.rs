use std::collections::HashMap;
use std::str::FromStr;

use async_trait::async_trait;
use common::{Money, OrderId, PaymentId, TransactionId, UserId};
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use crate::error::{Result, StoreError};
use crate::payment::{NewPayment, Payment, PaymentStatus};
use crate::store::{Page, PageRequest, PaymentStore, StatusTotals, validate_new_payment};

/// PostgreSQL-backed payment store implementation.
///
/// Status updates are issued as a single guarded `UPDATE` so the
/// pending-to-terminal transition is atomic per row even under racing
/// writers.
#[derive(Clone)]
pub struct PostgresPaymentStore {
    pool: PgPool,
}

impl PostgresPaymentStore {
    /// Creates a new PostgreSQL payment store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await
    }

    fn row_to_payment(row: PgRow) -> Result<Payment> {
        let status_raw: String = row.try_get("status")?;
        let status = PaymentStatus::from_str(&status_raw)
            .map_err(|e| StoreError::Validation(format!("corrupt status column: {e}")))?;

        Ok(Payment {
            id: PaymentId::from_uuid(row.try_get::<Uuid, _>("id")?),
            order_id: OrderId::new(row.try_get::<String, _>("order_id")?),
            user_id: UserId::from_uuid(row.try_get::<Uuid, _>("user_id")?),
            amount: Money::from_cents(row.try_get("amount_cents")?),
            status,
            transaction_id: TransactionId::from_string(row.try_get::<String, _>("transaction_id")?),
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    async fn current_status(&self, id: PaymentId) -> Result<Option<PaymentStatus>> {
        let row = sqlx::query("SELECT status FROM payments WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => {
                let raw: String = row.try_get("status")?;
                let status = PaymentStatus::from_str(&raw)
                    .map_err(|e| StoreError::Validation(format!("corrupt status column: {e}")))?;
                Ok(Some(status))
            }
            None => Ok(None),
        }
    }
}

#[async_trait]
impl PaymentStore for PostgresPaymentStore {
    async fn create(&self, new: NewPayment) -> Result<Payment> {
        validate_new_payment(&new)?;

        let id = PaymentId::new();
        let transaction_id = TransactionId::generate();

        let row = sqlx::query(
            r#"
            INSERT INTO payments (id, order_id, user_id, amount_cents, status, transaction_id, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, NOW(), NOW())
            RETURNING id, order_id, user_id, amount_cents, status, transaction_id, created_at, updated_at
            "#,
        )
        .bind(id.as_uuid())
        .bind(new.order_id.as_str())
        .bind(new.user_id.as_uuid())
        .bind(new.amount.cents())
        .bind(PaymentStatus::Pending.as_str())
        .bind(transaction_id.as_str())
        .fetch_one(&self.pool)
        .await?;

        Self::row_to_payment(row)
    }

    async fn get(&self, id: PaymentId, user_id: UserId) -> Result<Option<Payment>> {
        let row = sqlx::query(
            r#"
            SELECT id, order_id, user_id, amount_cents, status, transaction_id, created_at, updated_at
            FROM payments
            WHERE id = $1 AND user_id = $2
            "#,
        )
        .bind(id.as_uuid())
        .bind(user_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_payment).transpose()
    }

    async fn update_status(&self, id: PaymentId, status: PaymentStatus) -> Result<Payment> {
        if !PaymentStatus::Pending.can_transition_to(status) {
            let from = self
                .current_status(id)
                .await?
                .ok_or(StoreError::NotFound(id))?;
            return Err(StoreError::InvalidTransition { from, to: status });
        }

        // Guarding on the current status makes the read-modify-write atomic:
        // of two racing terminal writes, exactly one matches the row.
        let row = sqlx::query(
            r#"
            UPDATE payments
            SET status = $2, updated_at = NOW()
            WHERE id = $1 AND status = $3
            RETURNING id, order_id, user_id, amount_cents, status, transaction_id, created_at, updated_at
            "#,
        )
        .bind(id.as_uuid())
        .bind(status.as_str())
        .bind(PaymentStatus::Pending.as_str())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Self::row_to_payment(row),
            None => match self.current_status(id).await? {
                Some(from) => Err(StoreError::InvalidTransition { from, to: status }),
                None => Err(StoreError::NotFound(id)),
            },
        }
    }

    async fn list(
        &self,
        user_id: UserId,
        page: PageRequest,
        status: Option<PaymentStatus>,
    ) -> Result<Page<Payment>> {
        let status_filter = status.map(|s| s.as_str());

        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM payments
            WHERE user_id = $1 AND ($2::text IS NULL OR status = $2)
            "#,
        )
        .bind(user_id.as_uuid())
        .bind(status_filter)
        .fetch_one(&self.pool)
        .await?;

        let rows = sqlx::query(
            r#"
            SELECT id, order_id, user_id, amount_cents, status, transaction_id, created_at, updated_at
            FROM payments
            WHERE user_id = $1 AND ($2::text IS NULL OR status = $2)
            ORDER BY created_at DESC, id DESC
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(user_id.as_uuid())
        .bind(status_filter)
        .bind(i64::from(page.limit))
        .bind(page.offset() as i64)
        .fetch_all(&self.pool)
        .await?;

        let items = rows
            .into_iter()
            .map(Self::row_to_payment)
            .collect::<Result<Vec<_>>>()?;

        Ok(Page {
            items,
            total: total as u64,
            page: page.page,
            limit: page.limit,
        })
    }

    async fn stats(&self, user_id: UserId) -> Result<HashMap<PaymentStatus, StatusTotals>> {
        let rows = sqlx::query(
            r#"
            SELECT status, COUNT(*) AS count, COALESCE(SUM(amount_cents), 0) AS total_cents
            FROM payments
            WHERE user_id = $1
            GROUP BY status
            "#,
        )
        .bind(user_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        let mut stats = HashMap::new();
        for row in rows {
            let raw: String = row.try_get("status")?;
            let status = PaymentStatus::from_str(&raw)
                .map_err(|e| StoreError::Validation(format!("corrupt status column: {e}")))?;
            let count: i64 = row.try_get("count")?;
            let total_cents: i64 = row.try_get("total_cents")?;
            stats.insert(
                status,
                StatusTotals {
                    count: count as u64,
                    total: Money::from_cents(total_cents),
                },
            );
        }
        Ok(stats)
    }
}
