//! User and trainer models

use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use sqlx::FromRow;

use crate::utils::helpers::has_contact_address;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Trainer {
    pub id: i64,
    pub name: String,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Email usable as a meeting identity, if any
    pub fn meeting_identity(&self) -> Option<&str> {
        self.email.as_deref().filter(|e| has_contact_address(e))
    }
}

impl Trainer {
    /// Email usable as a meeting identity, if any
    pub fn meeting_identity(&self) -> Option<&str> {
        self.email.as_deref().filter(|e| has_contact_address(e))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUserRequest {
    pub name: String,
    pub email: Option<String>,
    pub phone_number: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTrainerRequest {
    pub name: String,
    pub email: Option<String>,
    pub phone_number: Option<String>,
}
