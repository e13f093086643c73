use serde::Deserialize;
use validator::{Validate, ValidationError};

use super::{default_page, empty_as_none};
use crate::db::models::UserRole;

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct LoginInput {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// ERP credentials supplied alongside a user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErpCredentialInput {
    pub erp_domain: String,
    pub api_key: String,
    pub api_secret: String,
}

fn client_needs_erp(input: &CreateUserInput) -> Result<(), ValidationError> {
    if input.role == UserRole::Client && input.erp_credentials().is_none() {
        return Err(ValidationError::new("erpDomain").with_message(
            "ERP domain, API key, and API secret are required for client role".into(),
        ));
    }
    Ok(())
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "client_needs_erp", skip_on_field_errors = false))]
pub struct CreateUserInput {
    #[validate(
        email(message = "Invalid email format"),
        length(max = 255, message = "Email too long")
    )]
    pub email: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
    pub role: UserRole,
    #[validate(length(min = 1, message = "ERP domain is required"))]
    pub erp_domain: Option<String>,
    #[validate(length(min = 1, message = "API key is required"))]
    pub api_key: Option<String>,
    #[validate(length(min = 1, message = "API secret is required"))]
    pub api_secret: Option<String>,
}

impl CreateUserInput {
    /// All three ERP fields, when every one is filled in.
    pub fn erp_credentials(&self) -> Option<ErpCredentialInput> {
        let filled = |v: &Option<String>| v.clone().filter(|s| !s.is_empty());
        Some(ErpCredentialInput {
            erp_domain: filled(&self.erp_domain)?,
            api_key: filled(&self.api_key)?,
            api_secret: filled(&self.api_secret)?,
        })
    }
}

/// Profile edit. Empty strings count as "not supplied".
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct EditUserInput {
    #[serde(default, deserialize_with = "empty_as_none")]
    #[validate(
        email(message = "Invalid email format"),
        length(max = 255, message = "Email too long")
    )]
    pub email: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none")]
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: Option<String>,
    pub role: Option<UserRole>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub erp_domain: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub api_key: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub api_secret: Option<String>,
}

impl EditUserInput {
    pub fn touches_erp(&self) -> bool {
        self.erp_domain.is_some() || self.api_key.is_some() || self.api_secret.is_some()
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UserListQuery {
    #[serde(default = "default_page")]
    #[validate(range(min = 1))]
    pub page: u32,
    #[serde(default = "default_user_limit")]
    #[validate(range(min = 1, max = 100))]
    pub limit: u32,
    pub search: Option<String>,
}

fn default_user_limit() -> u32 {
    10
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn client_users_need_erp_credentials() {
        let input: CreateUserInput = serde_json::from_value(json!({
            "email": "c@example.com",
            "password": "longenough",
            "role": "client",
            "erpDomain": "erp.example.com"
        }))
        .unwrap();
        let err = input.validate().unwrap_err();
        assert!(err.to_string().contains("required for client role"));
    }

    #[test]
    fn admins_need_no_erp_credentials() {
        let input: CreateUserInput = serde_json::from_value(json!({
            "email": "a@example.com",
            "password": "longenough",
            "role": "admin"
        }))
        .unwrap();
        assert!(input.validate().is_ok());
        assert!(input.erp_credentials().is_none());
    }

    #[test]
    fn complete_client_input_exposes_credentials() {
        let input: CreateUserInput = serde_json::from_value(json!({
            "email": "c@example.com",
            "password": "longenough",
            "role": "client",
            "erpDomain": "erp.example.com",
            "apiKey": "k",
            "apiSecret": "s"
        }))
        .unwrap();
        assert!(input.validate().is_ok());
        let creds = input.erp_credentials().unwrap();
        assert_eq!(creds.erp_domain, "erp.example.com");
    }

    #[test]
    fn short_passwords_fail() {
        let input: CreateUserInput = serde_json::from_value(json!({
            "email": "a@example.com", "password": "short", "role": "admin"
        }))
        .unwrap();
        assert!(input.validate().is_err());
    }

    #[test]
    fn edit_treats_empty_strings_as_absent() {
        let input: EditUserInput = serde_json::from_value(json!({
            "email": "",
            "password": "",
            "apiKey": "new-key"
        }))
        .unwrap();
        assert!(input.validate().is_ok());
        assert!(input.email.is_none());
        assert!(input.password.is_none());
        assert_eq!(input.api_key.as_deref(), Some("new-key"));
        assert!(input.touches_erp());
    }

    #[test]
    fn list_query_defaults_to_ten() {
        let query: UserListQuery = serde_json::from_value(json!({})).unwrap();
        assert_eq!((query.page, query.limit), (1, 10));
        let query: UserListQuery = serde_json::from_value(json!({ "page": 0 })).unwrap();
        assert!(query.validate().is_err());
    }
}
