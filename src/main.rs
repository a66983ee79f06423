pub mod auth;
pub mod bookings;
pub mod db;
pub mod error;
pub mod query;
pub mod reviews;
pub mod tours;
pub mod users;
pub mod validation;

use axum::{
    extract::{DefaultBodyLimit, Request, State},
    http::StatusCode,
    middleware::Next,
    response::Json,
    routing::{delete, get, patch, post},
    Router,
};
use serde_json::json;
use sqlx::PgPool;
use std::net::SocketAddr;
use tower_governor::{governor::GovernorConfigBuilder, GovernorLayer};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

use auth::{
    middleware::RequireRole,
    models::Role,
    repository::UserRepository,
    service::AuthService,
    token::{TokenService, DEFAULT_EXPIRES_IN_SECS},
};
use bookings::repository::BookingRepository;
use reviews::{rating_calculator::RatingCalculator, repository::ReviewRepository, service::ReviewService};
use tours::repository::TourRepository;

/// Requests larger than this are rejected before deserialization
const MAX_JSON_BODY_BYTES: usize = 10 * 1024;

/// OpenAPI documentation structure
#[derive(OpenApi)]
#[openapi(
    paths(
        tours::handlers::create_tour,
        tours::handlers::list_tours,
        tours::handlers::get_tour,
        tours::handlers::update_tour,
        tours::handlers::delete_tour,
        tours::handlers::tour_stats,
    ),
    components(
        schemas(
            tours::models::Tour,
            tours::models::TourDetail,
            tours::models::CreateTourRequest,
            tours::models::UpdateTourRequest,
            tours::models::StartLocation,
            tours::models::Difficulty,
            tours::models::TourStats,
            tours::models::MonthlyPlanEntry,
            tours::models::TourDistance,
            reviews::models::Review,
            reviews::models::CreateReviewRequest,
            reviews::models::UpdateReviewRequest,
            bookings::models::Booking,
            bookings::models::CreateBookingRequest,
            bookings::models::UpdateBookingRequest,
            users::models::UpdateMeRequest,
            users::models::AdminCreateUserRequest,
            users::models::AdminUpdateUserRequest,
            auth::models::Role,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "tours", description = "Tour catalog endpoints")
    ),
    info(
        title = "Tours API",
        version = "1.0.0",
        description = "RESTful API for a tour-booking product"
    )
)]
struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub token_service: TokenService,
    pub user_repository: UserRepository,
    pub auth_service: AuthService,
    pub tour_repository: TourRepository,
    pub review_repository: ReviewRepository,
    pub review_service: ReviewService,
    pub booking_repository: BookingRepository,
}

impl AppState {
    pub fn new(db: PgPool, token_service: TokenService) -> Self {
        let user_repository = UserRepository::new(db.clone());
        let auth_service = AuthService::new(user_repository.clone(), token_service.clone());
        let tour_repository = TourRepository::new(db.clone());
        let review_repository = ReviewRepository::new(db.clone());
        let review_service = ReviewService::new(
            review_repository.clone(),
            RatingCalculator::new(review_repository.clone()),
        );
        let booking_repository = BookingRepository::new(db.clone());

        Self {
            db,
            token_service,
            user_repository,
            auth_service,
            tour_repository,
            review_repository,
            review_service,
            booking_repository,
        }
    }
}

/// Role-guard middleware; the allowed roles travel in the layer state.
async fn role_guard(
    State((state, role_guard)): State<(AppState, RequireRole)>,
    request: Request,
    next: Next,
) -> Result<axum::response::Response, auth::error::AuthError> {
    role_guard.handle(state, request, next).await
}

macro_rules! require_roles {
    ($state:expr, $($role:expr),+) => {
        axum::middleware::from_fn_with_state(
            ($state.clone(), RequireRole::any_of(&[$($role),+])),
            role_guard,
        )
    };
}

/// Routes under /api/v1/tours, including the nested review routes
pub fn tour_routes(state: AppState) -> Router<AppState> {
    let staff = require_roles!(state, Role::Admin, Role::LeadGuide);
    let planners = require_roles!(state, Role::Admin, Role::LeadGuide, Role::Guide);
    let reviewers = require_roles!(state, Role::User);

    Router::new()
        .route(
            "/",
            get(tours::handlers::list_tours)
                .merge(post(tours::handlers::create_tour).route_layer(staff.clone())),
        )
        .route("/top-5-cheap", get(tours::handlers::top_five_cheap))
        .route("/stats", get(tours::handlers::tour_stats))
        .route(
            "/monthly-plan/:year",
            get(tours::handlers::monthly_plan).route_layer(planners),
        )
        .route(
            "/within/:distance/center/:latlng/unit/:unit",
            get(tours::handlers::tours_within),
        )
        .route(
            "/distances/:latlng/unit/:unit",
            get(tours::handlers::tour_distances),
        )
        .route(
            "/:id",
            get(tours::handlers::get_tour).merge(
                patch(tours::handlers::update_tour)
                    .delete(tours::handlers::delete_tour)
                    .route_layer(staff),
            ),
        )
        .route(
            "/:id/reviews",
            get(reviews::handlers::list_reviews_for_tour)
                .merge(post(reviews::handlers::create_review_for_tour).route_layer(reviewers)),
        )
}

/// Routes under /api/v1/users: auth flows, profile self-service, admin CRUD
pub fn user_routes(state: AppState) -> Router<AppState> {
    let admin = require_roles!(state, Role::Admin);

    Router::new()
        .route("/signup", post(auth::handlers::signup))
        .route("/login", post(auth::handlers::login))
        .route("/forgot-password", post(auth::handlers::forgot_password))
        .route("/reset-password/:token", patch(auth::handlers::reset_password))
        .route("/update-my-password", patch(auth::handlers::update_password))
        .route("/me", get(users::handlers::get_me))
        .route("/update-me", patch(users::handlers::update_me))
        .route("/delete-me", delete(users::handlers::delete_me))
        .route(
            "/",
            get(users::handlers::list_users)
                .post(users::handlers::create_user)
                .route_layer(admin.clone()),
        )
        .route(
            "/:id",
            get(users::handlers::get_user)
                .patch(users::handlers::update_user)
                .delete(users::handlers::delete_user)
                .route_layer(admin),
        )
}

/// Routes under /api/v1/reviews
pub fn review_routes(state: AppState) -> Router<AppState> {
    let reviewers = require_roles!(state, Role::User);
    let editors = require_roles!(state, Role::User, Role::Admin);

    Router::new()
        .route(
            "/",
            get(reviews::handlers::list_reviews)
                .merge(post(reviews::handlers::create_review).route_layer(reviewers)),
        )
        .route(
            "/:id",
            get(reviews::handlers::get_review).merge(
                patch(reviews::handlers::update_review)
                    .delete(reviews::handlers::delete_review)
                    .route_layer(editors),
            ),
        )
}

/// Routes under /api/v1/bookings
pub fn booking_routes(state: AppState) -> Router<AppState> {
    let staff = require_roles!(state, Role::Admin, Role::LeadGuide);

    Router::new()
        .route("/checkout/:id", post(bookings::handlers::checkout))
        .route("/me", get(bookings::handlers::my_bookings))
        .route(
            "/",
            get(bookings::handlers::list_bookings)
                .post(bookings::handlers::create_booking)
                .route_layer(staff.clone()),
        )
        .route(
            "/:id",
            get(bookings::handlers::get_booking)
                .patch(bookings::handlers::update_booking)
                .delete(bookings::handlers::delete_booking)
                .route_layer(staff),
        )
}

/// JSON 404 for unknown routes
async fn not_found() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "error": "Route not found" })),
    )
}

/// Creates and configures the application router
/// Maps all API endpoints to their handlers and adds the shared middleware
pub fn create_router(state: AppState) -> Router {
    use tower_http::cors::{Any, CorsLayer};

    // Allow all origins, methods, and headers
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Per-IP rate limit on the API: 100 requests, one replenished every 36s
    let governor_config = Box::new(
        GovernorConfigBuilder::default()
            .per_second(36)
            .burst_size(100)
            .finish()
            .expect("Invalid rate limiter configuration"),
    );

    let api = Router::new()
        .nest("/api/v1/tours", tour_routes(state.clone()))
        .nest("/api/v1/users", user_routes(state.clone()))
        .nest("/api/v1/reviews", review_routes(state.clone()))
        .nest("/api/v1/bookings", booking_routes(state.clone()))
        .layer(GovernorLayer {
            config: Box::leak(governor_config),
        });

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(api)
        .fallback(not_found)
        .layer(cors)
        .layer(DefaultBodyLimit::max(MAX_JSON_BODY_BYTES))
        .with_state(state)
}

#[tokio::main]
async fn main() {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    // Initialize tracing subscriber for logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    tracing::info!("Tours API - Starting...");

    // Get configuration from environment variables
    let database_url = std::env::var("DATABASE_URL")
        .expect("DATABASE_URL must be set in environment");
    let jwt_secret = std::env::var("JWT_SECRET")
        .expect("JWT_SECRET must be set in environment");
    let jwt_expires_in: i64 = std::env::var("JWT_EXPIRES_IN_SECS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(DEFAULT_EXPIRES_IN_SECS);
    let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port = std::env::var("PORT").unwrap_or_else(|_| "8080".to_string());

    // Create database connection pool
    tracing::info!("Connecting to database...");
    let db_pool = db::create_pool(&database_url)
        .await
        .expect("Failed to create database pool");

    // Run SQLx migrations on startup
    tracing::info!("Running database migrations...");
    sqlx::migrate!("./migrations")
        .run(&db_pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Migrations completed successfully");

    let token_service = TokenService::new(jwt_secret, jwt_expires_in);
    let state = AppState::new(db_pool, token_service);
    let app = create_router(state);

    // Start the Axum server
    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind to address");

    tracing::info!("Tours API is running on http://{}", addr);
    tracing::info!("Swagger UI available at http://{}/swagger-ui", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .expect("Server error");
}

#[cfg(test)]
mod tests;
