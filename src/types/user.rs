//! User records

use super::ids::UserId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Role of a ledger user
///
/// Only administrators may move approval workflows out of `pending`
/// or change other users' flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Customer,
    Admin,
}

/// Registered user
///
/// Created at registration and never deleted. The credential is stored as a
/// salted SHA-256 digest; the plain password is never kept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    #[serde(skip_serializing)]
    pub salt: String,
    pub full_name: String,
    pub email: String,
    pub is_verified: bool,
    pub is_approved: bool,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Registration input
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NewUser {
    pub username: String,
    pub password: String,
    pub full_name: String,
    pub email: String,
}

impl NewUser {
    /// Registration input with the name fields derived from the username
    pub fn with_credentials(username: &str, password: &str) -> Self {
        NewUser {
            username: username.to_string(),
            password: password.to_string(),
            full_name: username.to_string(),
            email: format!("{}@example.com", username),
        }
    }
}
