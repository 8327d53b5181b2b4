use async_trait::async_trait;
use sqlx::PgPool;

use venue_core::models::{Seat, SeatStatus};
use venue_core::ports::{BoxError, SeatRepository};

pub struct PostgresSeatRepository {
    pool: PgPool,
}

impl PostgresSeatRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct SeatRow {
    seat_id: String,
    section_id: String,
    status: String,
}

impl SeatRow {
    fn into_seat(self) -> Result<Seat, BoxError> {
        let status = SeatStatus::parse(&self.status)
            .ok_or_else(|| BoxError::from(format!("unknown seat status '{}'", self.status)))?;
        Ok(Seat {
            seat_id: self.seat_id,
            section_id: self.section_id,
            status,
        })
    }
}

#[async_trait]
impl SeatRepository for PostgresSeatRepository {
    async fn get_seat(&self, seat_id: &str) -> Result<Option<Seat>, BoxError> {
        let row = sqlx::query_as::<_, SeatRow>(
            "SELECT seat_id, section_id, status FROM seats WHERE seat_id = $1",
        )
        .bind(seat_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(SeatRow::into_seat).transpose()
    }

    async fn list_seats(&self) -> Result<Vec<Seat>, BoxError> {
        let rows = sqlx::query_as::<_, SeatRow>(
            "SELECT seat_id, section_id, status FROM seats ORDER BY section_id, seat_id",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(SeatRow::into_seat).collect()
    }
}
