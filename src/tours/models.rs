// Tour domain types, request payloads and the query whitelist

use crate::query::{Column, ColumnKind, QuerySchema};
use crate::validation::{validate_discount_below_price, validate_positive_price};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::{Validate, ValidationError};

/// How demanding a tour is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "tour_difficulty", rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Difficult,
}

impl std::fmt::Display for Difficulty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Difficult => "difficult",
        };
        write!(f, "{}", s)
    }
}

/// A tour as stored in the database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Tour {
    #[schema(example = 1)]
    pub id: i32,
    #[schema(example = "The Forest Hiker")]
    pub name: String,
    #[schema(example = "the-forest-hiker")]
    pub slug: String,
    /// Duration in days
    #[schema(example = 5)]
    pub duration: i32,
    #[schema(example = 25)]
    pub max_group_size: i32,
    pub difficulty: Difficulty,
    #[schema(example = 4.7, minimum = 1.0, maximum = 5.0)]
    pub ratings_average: f64,
    #[schema(example = 37)]
    pub ratings_quantity: i32,
    #[schema(example = 497.0)]
    pub price: f64,
    pub price_discount: Option<f64>,
    #[schema(example = "Breathtaking hike through the Canadian Banff National Park")]
    pub summary: String,
    pub description: String,
    #[schema(example = "tour-1-cover.jpg")]
    pub image_cover: String,
    pub images: Vec<String>,
    #[serde(skip_serializing, default)]
    pub secret: bool,
    pub start_lat: Option<f64>,
    pub start_lng: Option<f64>,
    pub start_address: Option<String>,
    pub start_description: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A tour with its start dates and reviews, returned by the detail endpoint
#[derive(Debug, Serialize, ToSchema)]
pub struct TourDetail {
    #[serde(flatten)]
    pub tour: Tour,
    pub start_dates: Vec<DateTime<Utc>>,
    pub reviews: Vec<crate::reviews::models::Review>,
}

/// Where a tour starts
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct StartLocation {
    #[validate(range(min = -90.0, max = 90.0, message = "Latitude must be within -90..90"))]
    pub lat: f64,
    #[validate(range(min = -180.0, max = 180.0, message = "Longitude must be within -180..180"))]
    pub lng: f64,
    pub address: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[validate(schema(function = "validate_create_pricing"))]
pub struct CreateTourRequest {
    #[validate(length(min = 10, max = 40, message = "Name must be 10-40 characters"))]
    pub name: String,
    #[validate(range(min = 1, message = "Duration must be at least 1 day"))]
    pub duration: i32,
    #[validate(range(min = 1, message = "Group size must be at least 1"))]
    pub max_group_size: i32,
    pub difficulty: Difficulty,
    #[schema(example = 497.0)]
    pub price: f64,
    pub price_discount: Option<f64>,
    #[validate(length(min = 1, message = "Summary is required"))]
    pub summary: String,
    #[serde(default)]
    pub description: String,
    #[validate(length(min = 1, message = "Cover image is required"))]
    pub image_cover: String,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub secret: bool,
    #[validate]
    pub start_location: Option<StartLocation>,
    #[serde(default)]
    pub start_dates: Vec<DateTime<Utc>>,
}

fn validate_create_pricing(tour: &CreateTourRequest) -> Result<(), ValidationError> {
    validate_positive_price(tour.price)?;
    validate_discount_below_price(tour.price_discount, tour.price)
}

/// Partial update; the discount-below-price check against the stored price
/// happens in the handler where the current row is known.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateTourRequest {
    #[validate(length(min = 10, max = 40, message = "Name must be 10-40 characters"))]
    pub name: Option<String>,
    #[validate(range(min = 1, message = "Duration must be at least 1 day"))]
    pub duration: Option<i32>,
    #[validate(range(min = 1, message = "Group size must be at least 1"))]
    pub max_group_size: Option<i32>,
    pub difficulty: Option<Difficulty>,
    pub price: Option<f64>,
    pub price_discount: Option<f64>,
    #[validate(length(min = 1, message = "Summary cannot be empty"))]
    pub summary: Option<String>,
    pub description: Option<String>,
    #[validate(length(min = 1, message = "Cover image cannot be empty"))]
    pub image_cover: Option<String>,
    pub images: Option<Vec<String>>,
    pub secret: Option<bool>,
    #[validate]
    pub start_location: Option<StartLocation>,
    pub start_dates: Option<Vec<DateTime<Utc>>>,
}

/// Per-difficulty aggregates over well-rated tours
#[derive(Debug, Serialize, FromRow, ToSchema)]
pub struct TourStats {
    pub difficulty: String,
    pub num_tours: i64,
    pub num_ratings: i64,
    pub avg_rating: f64,
    pub avg_price: f64,
    pub min_price: f64,
    pub max_price: f64,
}

/// One month of the yearly starting plan
#[derive(Debug, Serialize, FromRow, ToSchema)]
pub struct MonthlyPlanEntry {
    pub month: i32,
    pub num_tour_starts: i64,
    pub tours: Vec<String>,
}

/// Tour name and its great-circle distance from a reference point
#[derive(Debug, Serialize, FromRow, ToSchema)]
pub struct TourDistance {
    pub name: String,
    pub distance: f64,
}

/// Derive a URL slug from a tour name: lowercase, with every run of
/// non-alphanumeric characters collapsed to a single '-'.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut last_was_dash = true;
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
            last_was_dash = false;
        } else if !last_was_dash {
            slug.push('-');
            last_was_dash = true;
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

const FILTERABLE: &[Column] = &[
    Column {
        name: "name",
        kind: ColumnKind::Text,
    },
    Column {
        name: "difficulty",
        kind: ColumnKind::Enum,
    },
    Column {
        name: "duration",
        kind: ColumnKind::Numeric,
    },
    Column {
        name: "max_group_size",
        kind: ColumnKind::Numeric,
    },
    Column {
        name: "price",
        kind: ColumnKind::Numeric,
    },
    Column {
        name: "ratings_average",
        kind: ColumnKind::Numeric,
    },
    Column {
        name: "ratings_quantity",
        kind: ColumnKind::Numeric,
    },
];

const SORTABLE: &[&str] = &[
    "id",
    "name",
    "duration",
    "max_group_size",
    "price",
    "ratings_average",
    "ratings_quantity",
    "created_at",
];

const SELECTABLE: &[&str] = &[
    "id",
    "name",
    "slug",
    "duration",
    "max_group_size",
    "difficulty",
    "ratings_average",
    "ratings_quantity",
    "price",
    "price_discount",
    "summary",
    "description",
    "image_cover",
    "images",
    "created_at",
];

pub const TOURS_QUERY_SCHEMA: QuerySchema = QuerySchema::new(FILTERABLE, SORTABLE, SELECTABLE);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify_basic() {
        assert_eq!(slugify("The Forest Hiker"), "the-forest-hiker");
        assert_eq!(slugify("The Sea Explorer!"), "the-sea-explorer");
        assert_eq!(slugify("  Spaced   Out  "), "spaced-out");
    }

    #[test]
    fn test_slugify_collapses_symbol_runs() {
        assert_eq!(slugify("Rock & Roll Tour"), "rock-roll-tour");
        assert_eq!(slugify("100% Alpine"), "100-alpine");
    }

    #[test]
    fn test_create_tour_name_length() {
        let request = valid_create_request();
        assert!(request.validate().is_ok());

        let mut short = valid_create_request();
        short.name = "Too short".to_string();
        assert!(short.validate().is_err());
    }

    #[test]
    fn test_create_tour_rejects_discount_at_or_above_price() {
        let mut request = valid_create_request();
        request.price_discount = Some(497.0);
        assert!(request.validate().is_err());

        request.price_discount = Some(99.0);
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_create_tour_rejects_non_positive_price() {
        let mut request = valid_create_request();
        request.price = 0.0;
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_start_location_bounds() {
        let mut request = valid_create_request();
        request.start_location = Some(StartLocation {
            lat: 91.0,
            lng: 0.0,
            address: None,
            description: None,
        });
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_difficulty_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&Difficulty::Difficult).expect("serialize"),
            "\"difficult\""
        );
        let parsed: Difficulty = serde_json::from_str("\"easy\"").expect("deserialize");
        assert_eq!(parsed, Difficulty::Easy);
    }

    #[test]
    fn test_tours_schema_rejects_secret_column() {
        let mut raw = std::collections::HashMap::new();
        raw.insert("secret".to_string(), "true".to_string());
        assert!(TOURS_QUERY_SCHEMA.parse(&raw).is_err());
    }

    fn valid_create_request() -> CreateTourRequest {
        CreateTourRequest {
            name: "The Forest Hiker".to_string(),
            duration: 5,
            max_group_size: 25,
            difficulty: Difficulty::Easy,
            price: 497.0,
            price_discount: None,
            summary: "Breathtaking hike".to_string(),
            description: String::new(),
            image_cover: "cover.jpg".to_string(),
            images: Vec::new(),
            secret: false,
            start_location: None,
            start_dates: Vec::new(),
        }
    }
}
