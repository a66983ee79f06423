use crate::reviews::{Review, ServiceError};
use sqlx::PgPool;

const REVIEW_COLUMNS: &str = "id, user_id, tour_id, rating, review, created_at, updated_at";

/// A concurrent insert can beat the service-level duplicate check; the
/// UNIQUE (user_id, tour_id) constraint is the backstop.
fn map_insert_error(e: sqlx::Error) -> ServiceError {
    if let sqlx::Error::Database(db_err) = &e {
        if db_err.is_unique_violation() {
            return ServiceError::DuplicateReview;
        }
    }
    ServiceError::DatabaseError(e)
}

/// Repository for database operations on reviews
#[derive(Clone)]
pub struct ReviewRepository {
    pool: PgPool,
}

impl ReviewRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(
        &self,
        user_id: i32,
        tour_id: i32,
        rating: i16,
        review: &str,
    ) -> Result<Review, ServiceError> {
        let review = sqlx::query_as::<_, Review>(&format!(
            "INSERT INTO reviews (user_id, tour_id, rating, review) \
             VALUES ($1, $2, $3, $4) \
             RETURNING {REVIEW_COLUMNS}"
        ))
        .bind(user_id)
        .bind(tour_id)
        .bind(rating)
        .bind(review)
        .fetch_one(&self.pool)
        .await
        .map_err(map_insert_error)?;

        Ok(review)
    }

    pub async fn find_by_id(&self, id: i32) -> Result<Option<Review>, ServiceError> {
        let review = sqlx::query_as::<_, Review>(&format!(
            "SELECT {REVIEW_COLUMNS} FROM reviews WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(review)
    }

    /// Find a review by user and tour, for duplicate detection
    pub async fn find_by_user_and_tour(
        &self,
        user_id: i32,
        tour_id: i32,
    ) -> Result<Option<Review>, ServiceError> {
        let review = sqlx::query_as::<_, Review>(&format!(
            "SELECT {REVIEW_COLUMNS} FROM reviews WHERE user_id = $1 AND tour_id = $2"
        ))
        .bind(user_id)
        .bind(tour_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(review)
    }

    pub async fn update(
        &self,
        id: i32,
        rating: Option<i16>,
        review: Option<&str>,
    ) -> Result<Review, ServiceError> {
        let review = sqlx::query_as::<_, Review>(&format!(
            "UPDATE reviews SET \
             rating = COALESCE($1, rating), \
             review = COALESCE($2, review), \
             updated_at = NOW() \
             WHERE id = $3 \
             RETURNING {REVIEW_COLUMNS}"
        ))
        .bind(rating)
        .bind(review)
        .bind(id)
        .fetch_one(&self.pool)
        .await?;

        Ok(review)
    }

    pub async fn delete(&self, id: i32) -> Result<(), ServiceError> {
        let result = sqlx::query("DELETE FROM reviews WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(ServiceError::NotFound);
        }

        Ok(())
    }

    /// All reviews, newest first
    pub async fn list_all(&self) -> Result<Vec<Review>, ServiceError> {
        let reviews = sqlx::query_as::<_, Review>(&format!(
            "SELECT {REVIEW_COLUMNS} FROM reviews ORDER BY created_at DESC"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(reviews)
    }

    /// All reviews for one tour, newest first
    pub async fn list_for_tour(&self, tour_id: i32) -> Result<Vec<Review>, ServiceError> {
        let reviews = sqlx::query_as::<_, Review>(&format!(
            "SELECT {REVIEW_COLUMNS} FROM reviews WHERE tour_id = $1 ORDER BY created_at DESC"
        ))
        .bind(tour_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(reviews)
    }

    /// All rating values for a tour, for average calculation
    pub async fn ratings_for_tour(&self, tour_id: i32) -> Result<Vec<i16>, ServiceError> {
        let ratings: Vec<i16> = sqlx::query_scalar("SELECT rating FROM reviews WHERE tour_id = $1")
            .bind(tour_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(ratings)
    }

    /// Write the recalculated rating aggregate back onto the tour
    pub async fn update_tour_rating(
        &self,
        tour_id: i32,
        average: f64,
        quantity: i32,
    ) -> Result<(), ServiceError> {
        sqlx::query("UPDATE tours SET ratings_average = $1, ratings_quantity = $2 WHERE id = $3")
            .bind(average)
            .bind(quantity)
            .bind(tour_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Check that the tour exists and is not secret
    pub async fn tour_exists(&self, tour_id: i32) -> Result<bool, ServiceError> {
        let exists: Option<bool> =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM tours WHERE id = $1 AND secret = FALSE)")
                .bind(tour_id)
                .fetch_one(&self.pool)
                .await?;

        Ok(exists.unwrap_or(false))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::borrow::Cow;

    #[derive(Debug)]
    struct UniqueViolation;

    impl std::fmt::Display for UniqueViolation {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "duplicate key value violates unique constraint")
        }
    }

    impl std::error::Error for UniqueViolation {}

    impl sqlx::error::DatabaseError for UniqueViolation {
        fn message(&self) -> &str {
            "duplicate key value violates unique constraint"
        }

        fn code(&self) -> Option<Cow<'_, str>> {
            Some(Cow::Borrowed("23505"))
        }

        fn kind(&self) -> sqlx::error::ErrorKind {
            sqlx::error::ErrorKind::UniqueViolation
        }

        fn as_error(&self) -> &(dyn std::error::Error + Send + Sync + 'static) {
            self
        }

        fn as_error_mut(&mut self) -> &mut (dyn std::error::Error + Send + Sync + 'static) {
            self
        }

        fn into_error(self: Box<Self>) -> Box<dyn std::error::Error + Send + Sync + 'static> {
            self
        }
    }

    #[test]
    fn test_concurrent_duplicate_insert_maps_to_duplicate_review() {
        let err = sqlx::Error::Database(Box::new(UniqueViolation));
        assert!(matches!(
            map_insert_error(err),
            ServiceError::DuplicateReview
        ));
    }

    #[test]
    fn test_other_database_errors_stay_database_errors() {
        assert!(matches!(
            map_insert_error(sqlx::Error::RowNotFound),
            ServiceError::DatabaseError(_)
        ));
    }
}
