// Data access for tours, their start dates and the aggregate queries

use crate::query::{QueryOptions, SqlQueryBuilder};
use crate::tours::models::{
    CreateTourRequest, MonthlyPlanEntry, Tour, TourDistance, TourStats, UpdateTourRequest,
};
use chrono::{DateTime, Utc};
use sqlx::PgPool;

const TOUR_COLUMNS: &str = "id, name, slug, duration, max_group_size, difficulty, \
     ratings_average, ratings_quantity, price, price_discount, summary, description, \
     image_cover, images, secret, start_lat, start_lng, start_address, start_description, \
     created_at";

/// Haversine distance between a bound point ($1 lat, $2 lng) and a tour's
/// start point, scaled by an earth radius bound as $3 (mi or km).
const DISTANCE_EXPR: &str = "2 * $3 * ASIN(SQRT( \
     POWER(SIN(RADIANS(start_lat - $1) / 2), 2) + \
     COS(RADIANS($1)) * COS(RADIANS(start_lat)) * \
     POWER(SIN(RADIANS(start_lng - $2) / 2), 2)))";

#[derive(Clone)]
pub struct TourRepository {
    pool: PgPool,
}

impl TourRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a tour and its start dates in one transaction.
    pub async fn create(
        &self,
        request: &CreateTourRequest,
        slug: &str,
    ) -> Result<(Tour, Vec<DateTime<Utc>>), sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let location = request.start_location.as_ref();
        let tour = sqlx::query_as::<_, Tour>(&format!(
            "INSERT INTO tours (name, slug, duration, max_group_size, difficulty, price, \
             price_discount, summary, description, image_cover, images, secret, \
             start_lat, start_lng, start_address, start_description) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16) \
             RETURNING {TOUR_COLUMNS}"
        ))
        .bind(&request.name)
        .bind(slug)
        .bind(request.duration)
        .bind(request.max_group_size)
        .bind(request.difficulty)
        .bind(request.price)
        .bind(request.price_discount)
        .bind(&request.summary)
        .bind(&request.description)
        .bind(&request.image_cover)
        .bind(&request.images)
        .bind(request.secret)
        .bind(location.map(|l| l.lat))
        .bind(location.map(|l| l.lng))
        .bind(location.and_then(|l| l.address.clone()))
        .bind(location.and_then(|l| l.description.clone()))
        .fetch_one(&mut *tx)
        .await?;

        for starts_at in &request.start_dates {
            sqlx::query("INSERT INTO tour_start_dates (tour_id, starts_at) VALUES ($1, $2)")
                .bind(tour.id)
                .bind(starts_at)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        let start_dates = request.start_dates.clone();
        Ok((tour, start_dates))
    }

    /// Fetch one non-secret tour by id.
    pub async fn find_by_id(&self, id: i32) -> Result<Option<Tour>, sqlx::Error> {
        sqlx::query_as::<_, Tour>(&format!(
            "SELECT {TOUR_COLUMNS} FROM tours WHERE id = $1 AND secret = FALSE"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    pub async fn start_dates(&self, tour_id: i32) -> Result<Vec<DateTime<Utc>>, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT starts_at FROM tour_start_dates WHERE tour_id = $1 ORDER BY starts_at",
        )
        .bind(tour_id)
        .fetch_all(&self.pool)
        .await
    }

    /// List tours through the query features; secret tours never show up.
    pub async fn list(&self, options: &QueryOptions) -> Result<Vec<Tour>, sqlx::Error> {
        let mut builder = SqlQueryBuilder::new(TOUR_COLUMNS, "tours");
        builder.add_base_clause("secret = FALSE");
        builder.apply(options);
        let (query, params) = builder.build();

        let mut query = sqlx::query_as::<_, Tour>(&query);
        for param in params {
            query = query.bind(param);
        }
        query.fetch_all(&self.pool).await
    }

    /// Partial update. Start dates, when present, replace the existing set.
    pub async fn update(
        &self,
        id: i32,
        request: &UpdateTourRequest,
        slug: Option<&str>,
    ) -> Result<Option<Tour>, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let location = request.start_location.as_ref();
        let tour = sqlx::query_as::<_, Tour>(&format!(
            "UPDATE tours SET \
             name = COALESCE($1, name), \
             slug = COALESCE($2, slug), \
             duration = COALESCE($3, duration), \
             max_group_size = COALESCE($4, max_group_size), \
             difficulty = COALESCE($5, difficulty), \
             price = COALESCE($6, price), \
             price_discount = COALESCE($7, price_discount), \
             summary = COALESCE($8, summary), \
             description = COALESCE($9, description), \
             image_cover = COALESCE($10, image_cover), \
             images = COALESCE($11, images), \
             secret = COALESCE($12, secret), \
             start_lat = COALESCE($13, start_lat), \
             start_lng = COALESCE($14, start_lng), \
             start_address = COALESCE($15, start_address), \
             start_description = COALESCE($16, start_description) \
             WHERE id = $17 RETURNING {TOUR_COLUMNS}"
        ))
        .bind(request.name.as_deref())
        .bind(slug)
        .bind(request.duration)
        .bind(request.max_group_size)
        .bind(request.difficulty)
        .bind(request.price)
        .bind(request.price_discount)
        .bind(request.summary.as_deref())
        .bind(request.description.as_deref())
        .bind(request.image_cover.as_deref())
        .bind(request.images.as_deref())
        .bind(request.secret)
        .bind(location.map(|l| l.lat))
        .bind(location.map(|l| l.lng))
        .bind(location.and_then(|l| l.address.as_deref()))
        .bind(location.and_then(|l| l.description.as_deref()))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(tour) = tour else {
            return Ok(None);
        };

        if let Some(dates) = &request.start_dates {
            sqlx::query("DELETE FROM tour_start_dates WHERE tour_id = $1")
                .bind(id)
                .execute(&mut *tx)
                .await?;
            for starts_at in dates {
                sqlx::query("INSERT INTO tour_start_dates (tour_id, starts_at) VALUES ($1, $2)")
                    .bind(id)
                    .bind(starts_at)
                    .execute(&mut *tx)
                    .await?;
            }
        }

        tx.commit().await?;
        Ok(Some(tour))
    }

    pub async fn delete(&self, id: i32) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM tours WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Per-difficulty aggregates over tours rated 4.5 and up.
    pub async fn stats(&self) -> Result<Vec<TourStats>, sqlx::Error> {
        sqlx::query_as::<_, TourStats>(
            "SELECT difficulty::text AS difficulty, \
             COUNT(*) AS num_tours, \
             COALESCE(SUM(ratings_quantity), 0)::BIGINT AS num_ratings, \
             AVG(ratings_average) AS avg_rating, \
             AVG(price) AS avg_price, \
             MIN(price) AS min_price, \
             MAX(price) AS max_price \
             FROM tours \
             WHERE ratings_average >= 4.5 AND secret = FALSE \
             GROUP BY difficulty \
             ORDER BY avg_price DESC",
        )
        .fetch_all(&self.pool)
        .await
    }

    /// Tour starts per month of a year, busiest month first, capped at 12.
    pub async fn monthly_plan(&self, year: i32) -> Result<Vec<MonthlyPlanEntry>, sqlx::Error> {
        sqlx::query_as::<_, MonthlyPlanEntry>(
            "SELECT CAST(EXTRACT(MONTH FROM d.starts_at) AS INT) AS month, \
             COUNT(*) AS num_tour_starts, \
             ARRAY_AGG(t.name) AS tours \
             FROM tour_start_dates d \
             JOIN tours t ON t.id = d.tour_id \
             WHERE EXTRACT(YEAR FROM d.starts_at) = $1 AND t.secret = FALSE \
             GROUP BY month \
             ORDER BY num_tour_starts DESC \
             LIMIT 12",
        )
        .bind(year)
        .fetch_all(&self.pool)
        .await
    }

    /// Tours whose start point lies within `distance` of (lat, lng).
    /// `earth_radius` selects the unit (miles or kilometres).
    pub async fn within(
        &self,
        lat: f64,
        lng: f64,
        earth_radius: f64,
        distance: f64,
    ) -> Result<Vec<Tour>, sqlx::Error> {
        sqlx::query_as::<_, Tour>(&format!(
            "SELECT {TOUR_COLUMNS} FROM tours \
             WHERE secret = FALSE \
             AND start_lat IS NOT NULL AND start_lng IS NOT NULL \
             AND {DISTANCE_EXPR} <= $4"
        ))
        .bind(lat)
        .bind(lng)
        .bind(earth_radius)
        .bind(distance)
        .fetch_all(&self.pool)
        .await
    }

    /// Name and distance from (lat, lng) for every located tour, nearest first.
    pub async fn distances(
        &self,
        lat: f64,
        lng: f64,
        earth_radius: f64,
    ) -> Result<Vec<TourDistance>, sqlx::Error> {
        sqlx::query_as::<_, TourDistance>(&format!(
            "SELECT name, {DISTANCE_EXPR} AS distance FROM tours \
             WHERE secret = FALSE \
             AND start_lat IS NOT NULL AND start_lng IS NOT NULL \
             ORDER BY distance ASC"
        ))
        .bind(lat)
        .bind(lng)
        .bind(earth_radius)
        .fetch_all(&self.pool)
        .await
    }
}
