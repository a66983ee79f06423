// HTTP handlers for the tour catalog

use crate::db;
use crate::error::ApiError;
use crate::query::project_fields;
use crate::tours::models::{
    slugify, CreateTourRequest, MonthlyPlanEntry, Tour, TourDetail, TourDistance, TourStats,
    UpdateTourRequest, TOURS_QUERY_SCHEMA,
};
use crate::validation::validate_discount_below_price;
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde_json::Value;
use std::collections::HashMap;
use validator::Validate;

/// Earth radius in miles, for haversine distances
const EARTH_RADIUS_MI: f64 = 3963.2;
/// Earth radius in kilometres
const EARTH_RADIUS_KM: f64 = 6378.1;

fn earth_radius_for_unit(unit: &str) -> Result<f64, ApiError> {
    match unit {
        "mi" => Ok(EARTH_RADIUS_MI),
        "km" => Ok(EARTH_RADIUS_KM),
        other => Err(ApiError::BadRequest {
            message: format!("Unknown unit '{}', expected 'mi' or 'km'", other),
        }),
    }
}

/// Parse "lat,lng" path segments.
fn parse_latlng(latlng: &str) -> Result<(f64, f64), ApiError> {
    let malformed = || ApiError::BadRequest {
        message: "Provide the location as lat,lng".to_string(),
    };
    let (lat, lng) = latlng.split_once(',').ok_or_else(malformed)?;
    let lat: f64 = lat.trim().parse().map_err(|_| malformed())?;
    let lng: f64 = lng.trim().parse().map_err(|_| malformed())?;
    if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lng) {
        return Err(malformed());
    }
    Ok((lat, lng))
}

/// Handler for POST /api/v1/tours
/// Creates a new tour (admin / lead-guide only)
#[utoipa::path(
    post,
    path = "/api/v1/tours",
    request_body = CreateTourRequest,
    responses(
        (status = 201, description = "Tour created successfully", body = Tour),
        (status = 400, description = "Invalid input data"),
        (status = 409, description = "Tour name already taken")
    ),
    security(("bearer_auth" = [])),
    tag = "tours"
)]
pub async fn create_tour(
    State(state): State<AppState>,
    Json(payload): Json<CreateTourRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    tracing::debug!("Creating new tour: {}", payload.name);
    payload.validate()?;

    if db::check_duplicate_tour(&state.db, &payload.name).await? {
        tracing::warn!("Attempt to create duplicate tour: {}", payload.name);
        return Err(ApiError::Conflict {
            message: format!("Tour with name '{}' already exists", payload.name),
        });
    }

    let slug = slugify(&payload.name);
    let (tour, start_dates) = state.tour_repository.create(&payload, &slug).await?;

    tracing::info!("Successfully created tour with id: {}", tour.id);
    let mut body = serde_json::to_value(&tour)
        .map_err(|e| ApiError::InternalError(format!("Serialization failed: {}", e)))?;
    body["start_dates"] = serde_json::to_value(start_dates)
        .map_err(|e| ApiError::InternalError(format!("Serialization failed: {}", e)))?;
    Ok((StatusCode::CREATED, Json(body)))
}

/// Handler for GET /api/v1/tours
/// Supports filtering, sorting, field limiting and pagination
#[utoipa::path(
    get,
    path = "/api/v1/tours",
    responses(
        (status = 200, description = "List of tours", body = Vec<Tour>),
        (status = 400, description = "Invalid query parameters")
    ),
    tag = "tours"
)]
pub async fn list_tours(
    State(state): State<AppState>,
    Query(raw): Query<HashMap<String, String>>,
) -> Result<Json<Value>, ApiError> {
    tracing::debug!("Fetching tours with query parameters: {:?}", raw);
    list_with_params(&state, raw).await
}

/// Handler for GET /api/v1/tours/top-5-cheap
/// Preset listing: the five best-rated tours, cheapest first on ties
pub async fn top_five_cheap(
    State(state): State<AppState>,
    Query(mut raw): Query<HashMap<String, String>>,
) -> Result<Json<Value>, ApiError> {
    raw.insert("limit".to_string(), "5".to_string());
    raw.insert("sort".to_string(), "-ratings_average,price".to_string());
    raw.insert(
        "fields".to_string(),
        "name,price,difficulty,summary".to_string(),
    );
    list_with_params(&state, raw).await
}

async fn list_with_params(
    state: &AppState,
    raw: HashMap<String, String>,
) -> Result<Json<Value>, ApiError> {
    let options = TOURS_QUERY_SCHEMA.parse(&raw)?;
    let tours = state.tour_repository.list(&options).await?;
    tracing::debug!("Query returned {} tours", tours.len());

    let mut body = serde_json::to_value(tours)
        .map_err(|e| ApiError::InternalError(format!("Serialization failed: {}", e)))?;
    if let Some(fields) = &options.fields {
        body = project_fields(body, fields);
    }
    Ok(Json(body))
}

/// Handler for GET /api/v1/tours/:id
/// Returns the tour together with its start dates and reviews
#[utoipa::path(
    get,
    path = "/api/v1/tours/{id}",
    params(("id" = i32, Path, description = "Tour ID")),
    responses(
        (status = 200, description = "Tour found", body = TourDetail),
        (status = 404, description = "Tour not found")
    ),
    tag = "tours"
)]
pub async fn get_tour(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<TourDetail>, ApiError> {
    tracing::debug!("Fetching tour with id: {}", id);

    let tour = state
        .tour_repository
        .find_by_id(id)
        .await?
        .ok_or_else(|| ApiError::NotFound {
            resource: "Tour".to_string(),
            id: id.to_string(),
        })?;

    let start_dates = state.tour_repository.start_dates(id).await?;
    let reviews = state.review_repository.list_for_tour(id).await?;

    Ok(Json(TourDetail {
        tour,
        start_dates,
        reviews,
    }))
}

/// Handler for PATCH /api/v1/tours/:id
/// Partial update (admin / lead-guide only)
#[utoipa::path(
    patch,
    path = "/api/v1/tours/{id}",
    params(("id" = i32, Path, description = "Tour ID")),
    request_body = UpdateTourRequest,
    responses(
        (status = 200, description = "Tour updated successfully", body = Tour),
        (status = 400, description = "Invalid input data"),
        (status = 404, description = "Tour not found"),
        (status = 409, description = "Tour name already taken")
    ),
    security(("bearer_auth" = [])),
    tag = "tours"
)]
pub async fn update_tour(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateTourRequest>,
) -> Result<Json<Tour>, ApiError> {
    tracing::debug!("Updating tour with id: {}", id);
    payload.validate()?;

    let existing = state
        .tour_repository
        .find_by_id(id)
        .await?
        .ok_or_else(|| ApiError::NotFound {
            resource: "Tour".to_string(),
            id: id.to_string(),
        })?;

    // The discount must stay below whichever price the row ends up with
    let effective_price = payload.price.unwrap_or(existing.price);
    let effective_discount = payload.price_discount.or(existing.price_discount);
    if payload.price.is_some() || payload.price_discount.is_some() {
        if effective_price <= 0.0 || !effective_price.is_finite() {
            return Err(ApiError::BadRequest {
                message: "Price must be a positive number".to_string(),
            });
        }
        validate_discount_below_price(effective_discount, effective_price).map_err(|_| {
            ApiError::BadRequest {
                message: "Discount price must be below the regular price".to_string(),
            }
        })?;
    }

    let mut slug = None;
    if let Some(new_name) = &payload.name {
        if new_name != &existing.name {
            if db::check_duplicate_tour_excluding_id(&state.db, new_name, id).await? {
                tracing::warn!("Attempt to rename tour {} to duplicate name: {}", id, new_name);
                return Err(ApiError::Conflict {
                    message: format!("Tour with name '{}' already exists", new_name),
                });
            }
            slug = Some(slugify(new_name));
        }
    }

    let updated = state
        .tour_repository
        .update(id, &payload, slug.as_deref())
        .await?
        .ok_or_else(|| ApiError::NotFound {
            resource: "Tour".to_string(),
            id: id.to_string(),
        })?;

    tracing::info!("Successfully updated tour with id: {}", id);
    Ok(Json(updated))
}

/// Handler for DELETE /api/v1/tours/:id (admin / lead-guide only)
#[utoipa::path(
    delete,
    path = "/api/v1/tours/{id}",
    params(("id" = i32, Path, description = "Tour ID")),
    responses(
        (status = 204, description = "Tour deleted successfully"),
        (status = 404, description = "Tour not found")
    ),
    security(("bearer_auth" = [])),
    tag = "tours"
)]
pub async fn delete_tour(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<StatusCode, ApiError> {
    tracing::debug!("Deleting tour with id: {}", id);

    if !state.tour_repository.delete(id).await? {
        return Err(ApiError::NotFound {
            resource: "Tour".to_string(),
            id: id.to_string(),
        });
    }

    tracing::info!("Successfully deleted tour with id: {}", id);
    Ok(StatusCode::NO_CONTENT)
}

/// Handler for GET /api/v1/tours/stats
#[utoipa::path(
    get,
    path = "/api/v1/tours/stats",
    responses((status = 200, description = "Per-difficulty statistics", body = Vec<TourStats>)),
    tag = "tours"
)]
pub async fn tour_stats(State(state): State<AppState>) -> Result<Json<Vec<TourStats>>, ApiError> {
    let stats = state.tour_repository.stats().await?;
    Ok(Json(stats))
}

/// Handler for GET /api/v1/tours/monthly-plan/:year
pub async fn monthly_plan(
    State(state): State<AppState>,
    Path(year): Path<i32>,
) -> Result<Json<Vec<MonthlyPlanEntry>>, ApiError> {
    if !(1900..=2100).contains(&year) {
        return Err(ApiError::BadRequest {
            message: "Year must be between 1900 and 2100".to_string(),
        });
    }
    let plan = state.tour_repository.monthly_plan(year).await?;
    Ok(Json(plan))
}

/// Handler for GET /api/v1/tours/within/:distance/center/:latlng/unit/:unit
pub async fn tours_within(
    State(state): State<AppState>,
    Path((distance, latlng, unit)): Path<(f64, String, String)>,
) -> Result<Json<Vec<Tour>>, ApiError> {
    if distance <= 0.0 || !distance.is_finite() {
        return Err(ApiError::BadRequest {
            message: "Distance must be a positive number".to_string(),
        });
    }
    let (lat, lng) = parse_latlng(&latlng)?;
    let radius = earth_radius_for_unit(&unit)?;

    let tours = state
        .tour_repository
        .within(lat, lng, radius, distance)
        .await?;
    Ok(Json(tours))
}

/// Handler for GET /api/v1/tours/distances/:latlng/unit/:unit
pub async fn tour_distances(
    State(state): State<AppState>,
    Path((latlng, unit)): Path<(String, String)>,
) -> Result<Json<Vec<TourDistance>>, ApiError> {
    let (lat, lng) = parse_latlng(&latlng)?;
    let radius = earth_radius_for_unit(&unit)?;

    let distances = state.tour_repository.distances(lat, lng, radius).await?;
    Ok(Json(distances))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_latlng_valid() {
        let (lat, lng) = parse_latlng("34.111745,-118.113491").expect("valid latlng");
        assert!((lat - 34.111745).abs() < f64::EPSILON);
        assert!((lng - -118.113491).abs() < f64::EPSILON);
    }

    #[test]
    fn test_parse_latlng_malformed() {
        assert!(parse_latlng("34.111745").is_err());
        assert!(parse_latlng("north,west").is_err());
        assert!(parse_latlng("").is_err());
        assert!(parse_latlng("95.0,10.0").is_err());
        assert!(parse_latlng("10.0,181.0").is_err());
    }

    #[test]
    fn test_earth_radius_units() {
        assert_eq!(earth_radius_for_unit("mi").expect("mi"), EARTH_RADIUS_MI);
        assert_eq!(earth_radius_for_unit("km").expect("km"), EARTH_RADIUS_KM);
        assert!(earth_radius_for_unit("furlongs").is_err());
    }
}
