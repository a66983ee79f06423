// Request types and query whitelist for user management

use crate::auth::models::Role;
use crate::query::{Column, ColumnKind, QuerySchema};
use serde::Deserialize;
use utoipa::ToSchema;
use validator::Validate;

/// Columns a client may filter users by
const FILTERABLE: &[Column] = &[
    Column {
        name: "name",
        kind: ColumnKind::Text,
    },
    Column {
        name: "email",
        kind: ColumnKind::Text,
    },
    Column {
        name: "role",
        kind: ColumnKind::Enum,
    },
];

const SORTABLE: &[&str] = &["id", "name", "email", "role", "created_at"];

const SELECTABLE: &[&str] = &["id", "name", "email", "photo", "role", "created_at"];

pub const USERS_QUERY_SCHEMA: QuerySchema = QuerySchema::new(FILTERABLE, SORTABLE, SELECTABLE);

/// Self-service profile update. Password fields are deserialized only so
/// they can be rejected with a pointer to the password route.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateMeRequest {
    #[validate(length(min = 5, max = 15, message = "Name must be 5-15 characters"))]
    pub name: Option<String>,
    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub password_confirm: Option<String>,
}

impl UpdateMeRequest {
    pub fn contains_password_fields(&self) -> bool {
        self.password.is_some() || self.password_confirm.is_some()
    }
}

/// Admin user creation
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct AdminCreateUserRequest {
    #[validate(length(min = 5, max = 15, message = "Name must be 5-15 characters"))]
    pub name: String,
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
    pub role: Option<Role>,
}

/// Admin user update (name, email, role)
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct AdminUpdateUserRequest {
    #[validate(length(min = 5, max = 15, message = "Name must be 5-15 characters"))]
    pub name: Option<String>,
    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,
    pub role: Option<Role>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_me_detects_password_fields() {
        let req: UpdateMeRequest =
            serde_json::from_str(r#"{"name": "Alice Smith", "password": "hunter22"}"#)
                .expect("valid json");
        assert!(req.contains_password_fields());

        let req: UpdateMeRequest =
            serde_json::from_str(r#"{"email": "alice@example.com"}"#).expect("valid json");
        assert!(!req.contains_password_fields());
    }

    #[test]
    fn test_update_me_rejects_bad_email() {
        let req: UpdateMeRequest =
            serde_json::from_str(r#"{"email": "not-an-email"}"#).expect("valid json");
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_admin_create_validates_password_length() {
        let req = AdminCreateUserRequest {
            name: "Alice Smith".to_string(),
            email: "alice@example.com".to_string(),
            password: "short".to_string(),
            role: None,
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_users_query_schema_rejects_secret_columns() {
        let mut raw = std::collections::HashMap::new();
        raw.insert("password_hash".to_string(), "x".to_string());
        assert!(USERS_QUERY_SCHEMA.parse(&raw).is_err());

        let mut raw = std::collections::HashMap::new();
        raw.insert("fields".to_string(), "password_hash".to_string());
        assert!(USERS_QUERY_SCHEMA.parse(&raw).is_err());
    }
}
