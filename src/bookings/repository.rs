use crate::bookings::{Booking, BookingError};
use sqlx::PgPool;

const BOOKING_COLUMNS: &str = "id, tour_id, user_id, price, paid, created_at";

/// Repository for database operations on bookings
#[derive(Clone)]
pub struct BookingRepository {
    pool: PgPool,
}

impl BookingRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(
        &self,
        tour_id: i32,
        user_id: i32,
        price: f64,
        paid: bool,
    ) -> Result<Booking, BookingError> {
        let booking = sqlx::query_as::<_, Booking>(&format!(
            "INSERT INTO bookings (tour_id, user_id, price, paid) \
             VALUES ($1, $2, $3, $4) \
             RETURNING {BOOKING_COLUMNS}"
        ))
        .bind(tour_id)
        .bind(user_id)
        .bind(price)
        .bind(paid)
        .fetch_one(&self.pool)
        .await?;

        Ok(booking)
    }

    pub async fn find_by_id(&self, id: i32) -> Result<Option<Booking>, BookingError> {
        let booking = sqlx::query_as::<_, Booking>(&format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(booking)
    }

    pub async fn list_all(&self) -> Result<Vec<Booking>, BookingError> {
        let bookings = sqlx::query_as::<_, Booking>(&format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings ORDER BY created_at DESC"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(bookings)
    }

    pub async fn list_for_user(&self, user_id: i32) -> Result<Vec<Booking>, BookingError> {
        let bookings = sqlx::query_as::<_, Booking>(&format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings WHERE user_id = $1 ORDER BY created_at DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(bookings)
    }

    pub async fn update(
        &self,
        id: i32,
        price: Option<f64>,
        paid: Option<bool>,
    ) -> Result<Option<Booking>, BookingError> {
        let booking = sqlx::query_as::<_, Booking>(&format!(
            "UPDATE bookings SET \
             price = COALESCE($1, price), \
             paid = COALESCE($2, paid) \
             WHERE id = $3 \
             RETURNING {BOOKING_COLUMNS}"
        ))
        .bind(price)
        .bind(paid)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(booking)
    }

    pub async fn delete(&self, id: i32) -> Result<bool, BookingError> {
        let result = sqlx::query("DELETE FROM bookings WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Current price of a non-secret tour, None when it does not exist
    pub async fn tour_price(&self, tour_id: i32) -> Result<Option<f64>, BookingError> {
        let price: Option<f64> =
            sqlx::query_scalar("SELECT price FROM tours WHERE id = $1 AND secret = FALSE")
                .bind(tour_id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(price)
    }
}
