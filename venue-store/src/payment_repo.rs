use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use venue_core::models::{PaymentRecord, PaymentStatus};
use venue_core::ports::{BoxError, PaymentRepository};

pub struct PostgresPaymentRepository {
    pool: PgPool,
}

impl PostgresPaymentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch_by_key(&self, idempotency_key: &str) -> Result<Option<PaymentRecord>, BoxError> {
        let row = sqlx::query_as::<_, PaymentRow>(
            r#"
            SELECT booking_id, idempotency_key, status, created_at
            FROM payments WHERE idempotency_key = $1
            "#,
        )
        .bind(idempotency_key)
        .fetch_optional(&self.pool)
        .await?;

        row.map(PaymentRow::into_record).transpose()
    }
}

#[derive(sqlx::FromRow)]
struct PaymentRow {
    booking_id: Uuid,
    idempotency_key: String,
    status: String,
    created_at: DateTime<Utc>,
}

impl PaymentRow {
    fn into_record(self) -> Result<PaymentRecord, BoxError> {
        let status = PaymentStatus::parse(&self.status)
            .ok_or_else(|| BoxError::from(format!("unknown payment status '{}'", self.status)))?;
        Ok(PaymentRecord {
            booking_id: self.booking_id,
            idempotency_key: self.idempotency_key,
            status,
            created_at: self.created_at,
        })
    }
}

#[async_trait]
impl PaymentRepository for PostgresPaymentRepository {
    async fn get_by_key(&self, idempotency_key: &str) -> Result<Option<PaymentRecord>, BoxError> {
        self.fetch_by_key(idempotency_key).await
    }

    /// Unique-key-enforced idempotent insert: a key conflict leaves the
    /// existing record in place, and the read-back returns it.
    async fn save(&self, record: &PaymentRecord) -> Result<PaymentRecord, BoxError> {
        sqlx::query(
            r#"
            INSERT INTO payments (booking_id, idempotency_key, status, created_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (idempotency_key) DO NOTHING
            "#,
        )
        .bind(record.booking_id)
        .bind(&record.idempotency_key)
        .bind(record.status.as_str())
        .bind(record.created_at)
        .execute(&self.pool)
        .await?;

        self.fetch_by_key(&record.idempotency_key)
            .await?
            .ok_or_else(|| "payment record missing after insert".into())
    }
}
