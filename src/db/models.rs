use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Admin,
    #[default]
    Client,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Admin => "admin",
            UserRole::Client => "client",
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(UserRole::Admin),
            "client" => Ok(UserRole::Client),
            other => Err(format!("unknown user role `{other}`")),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DbUser {
    pub id: String,
    pub email: String,
    pub password_hash: String,
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
}

/// User projection returned by the API; never carries the password hash.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PublicUser {
    pub id: String,
    pub email: String,
    pub role: UserRole,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

impl From<DbUser> for PublicUser {
    fn from(u: DbUser) -> Self {
        Self {
            id: u.id,
            email: u.email,
            role: u.role,
            created_at: u.created_at,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
    pub role: UserRole,
}

/// Partial user update; `None` leaves the column untouched.
#[derive(Debug, Clone, Default)]
pub struct UserChanges {
    pub email: Option<String>,
    pub password_hash: Option<String>,
    pub role: Option<UserRole>,
}

impl UserChanges {
    pub fn is_empty(&self) -> bool {
        self.email.is_none() && self.password_hash.is_none() && self.role.is_none()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DbErpConnection {
    pub id: i64,
    pub user_id: String,
    pub erp_domain: String,
    pub encrypted_api_key: String,
    pub encrypted_api_secret: String,
    pub created_at: DateTime<Utc>,
}

/// Connection columns as written; secrets are already sealed.
#[derive(Debug, Clone)]
pub struct NewErpConnection {
    pub erp_domain: String,
    pub encrypted_api_key: String,
    pub encrypted_api_secret: String,
}

#[derive(Debug, Clone, Default)]
pub struct ConnectionChanges {
    pub erp_domain: Option<String>,
    pub encrypted_api_key: Option<String>,
    pub encrypted_api_secret: Option<String>,
}

impl ConnectionChanges {
    pub fn is_empty(&self) -> bool {
        self.erp_domain.is_none()
            && self.encrypted_api_key.is_none()
            && self.encrypted_api_secret.is_none()
    }

    pub fn is_complete(&self) -> bool {
        self.erp_domain.is_some()
            && self.encrypted_api_key.is_some()
            && self.encrypted_api_secret.is_some()
    }

    /// All three columns present, enough to create a missing row.
    pub fn into_complete(self) -> Option<NewErpConnection> {
        Some(NewErpConnection {
            erp_domain: self.erp_domain?,
            encrypted_api_key: self.encrypted_api_key?,
            encrypted_api_secret: self.encrypted_api_secret?,
        })
    }
}
