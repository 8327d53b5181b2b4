use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use venue_core::models::Booking;
use venue_core::ports::{BookingRepository, BoxError};

pub struct PostgresBookingRepository {
    pool: PgPool,
}

impl PostgresBookingRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct BookingRow {
    booking_id: Uuid,
    seat_id: String,
    section_id: String,
    user_id: String,
    created_at: DateTime<Utc>,
}

#[async_trait]
impl BookingRepository for PostgresBookingRepository {
    /// Seat flip and booking insert commit together. Retry-safe: the primary
    /// key conflict on (booking_id, seat_id) means the write already landed.
    async fn persist_booking(&self, booking: &Booking) -> Result<(), BoxError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("UPDATE seats SET status = 'BOOKED' WHERE seat_id = $1")
            .bind(&booking.seat_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            r#"
            INSERT INTO bookings (booking_id, seat_id, section_id, user_id, status, created_at)
            VALUES ($1, $2, $3, $4, 'BOOKED', $5)
            ON CONFLICT (booking_id, seat_id) DO NOTHING
            "#,
        )
        .bind(booking.booking_id)
        .bind(&booking.seat_id)
        .bind(&booking.section_id)
        .bind(&booking.user_id)
        .bind(booking.created_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn get_bookings(&self, booking_id: Uuid) -> Result<Vec<Booking>, BoxError> {
        let rows = sqlx::query_as::<_, BookingRow>(
            r#"
            SELECT booking_id, seat_id, section_id, user_id, created_at
            FROM bookings WHERE booking_id = $1 ORDER BY seat_id
            "#,
        )
        .bind(booking_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| Booking {
                booking_id: row.booking_id,
                seat_id: row.seat_id,
                section_id: row.section_id,
                user_id: row.user_id,
                created_at: row.created_at,
            })
            .collect())
    }
}
