pub mod error;
pub mod handlers;
pub mod models;
pub mod repository;

pub use error::*;
pub use models::*;
pub use repository::*;
