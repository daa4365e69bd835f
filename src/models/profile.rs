// src/models/profile.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Represents the 'profiles' table. One row per user; the source of a
/// student's cohort (`year_of_study`).
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub id: i64,
    pub user_id: i64,
    pub first_name: String,
    pub last_name: String,
    pub year_of_study: i32,
    pub department: String,
    pub roll_number: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Profile {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// DTO for creating or replacing the caller's profile.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ProfileRequest {
    #[validate(length(min = 1, max = 100, message = "Please add a first name"))]
    pub first_name: String,
    #[validate(length(min = 1, max = 100, message = "Please add a last name"))]
    pub last_name: String,
    #[validate(range(min = 0, max = 4))]
    pub year_of_study: i32,
    #[validate(length(min = 1, max = 100, message = "Please add a department"))]
    pub department: String,
    #[validate(length(min = 1, max = 50, message = "Please add a roll number"))]
    pub roll_number: String,
}

impl ProfileRequest {
    /// Trims the free-text fields the way they are stored.
    pub fn trimmed(self) -> Self {
        Self {
            first_name: self.first_name.trim().to_string(),
            last_name: self.last_name.trim().to_string(),
            year_of_study: self.year_of_study,
            department: self.department.trim().to_string(),
            roll_number: self.roll_number.trim().to_string(),
        }
    }
}
