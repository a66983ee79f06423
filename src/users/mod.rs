// User management module (profile self-service + admin CRUD)

pub mod handlers;
pub mod models;

pub use models::{AdminCreateUserRequest, AdminUpdateUserRequest, UpdateMeRequest};
