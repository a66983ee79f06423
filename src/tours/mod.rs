// Tour catalog module: CRUD, query features, aggregate stats and geo lookups

pub mod handlers;
pub mod models;
pub mod repository;

pub use models::{CreateTourRequest, Difficulty, Tour, UpdateTourRequest};
pub use repository::TourRepository;
