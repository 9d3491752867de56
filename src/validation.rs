use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::{Category, ConfirmationStatus, Role};

/// 24h wall-clock time, e.g. "19:00". Single-digit hours are accepted.
pub static TIME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([0-1]?[0-9]|2[0-3]):[0-5][0-9]$").unwrap());

/// Payloads arrive here already deserialized by the boundary layer; the
/// derive checks reject malformed input before any repository call.

#[derive(Debug, Deserialize, Validate)]
pub struct NewPlayer {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
    #[validate(length(min = 1, message = "Last name is required"))]
    pub last_name: String,
    pub category: Category,
    pub phone: Option<String>,
    pub position: Option<String>,
    pub birth_date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize, Validate, Default)]
pub struct PlayerUpdate {
    #[validate(length(min = 1, message = "Name cannot be empty"))]
    pub name: Option<String>,
    #[validate(length(min = 1, message = "Last name cannot be empty"))]
    pub last_name: Option<String>,
    pub category: Option<Category>,
    pub phone: Option<String>,
    pub position: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub active: Option<bool>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct NewTraining {
    #[validate(range(min = 0, max = 6, message = "Day of week must be between 0 and 6"))]
    pub day_of_week: i64,
    #[validate(regex(path = *TIME_RE, message = "Invalid start time"))]
    pub start_time: String,
    #[validate(regex(path = *TIME_RE, message = "Invalid end time"))]
    pub end_time: String,
    pub name: Option<String>,
}

#[derive(Debug, Deserialize, Validate, Default)]
pub struct TrainingUpdate {
    #[validate(range(min = 0, max = 6, message = "Day of week must be between 0 and 6"))]
    pub day_of_week: Option<i64>,
    #[validate(regex(path = *TIME_RE, message = "Invalid start time"))]
    pub start_time: Option<String>,
    #[validate(regex(path = *TIME_RE, message = "Invalid end time"))]
    pub end_time: Option<String>,
    pub name: Option<String>,
    pub active: Option<bool>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct NewUser {
    #[validate(email(message = "Invalid email"))]
    pub email: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
    pub role: Role,
}

#[derive(Debug, Deserialize, Validate, Default)]
pub struct UserUpdate {
    #[validate(email(message = "Invalid email"))]
    pub email: Option<String>,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: Option<String>,
    #[validate(length(min = 1, message = "Name cannot be empty"))]
    pub name: Option<String>,
    pub role: Option<Role>,
    pub active: Option<bool>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct SessionRequest {
    pub date: NaiveDate,
    pub training_id: Option<i64>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct AttendanceInput {
    pub session_id: i64,
    pub player_id: i64,
    pub attended: bool,
    pub absence_reason: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct BulkAttendanceItem {
    pub player_id: i64,
    pub attended: bool,
    pub absence_reason: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct BulkAttendanceInput {
    pub session_id: i64,
    #[validate(length(min = 1, message = "Attendance list is required"))]
    pub attendance: Vec<BulkAttendanceItem>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ConfirmationInput {
    pub session_id: i64,
    pub player_id: i64,
    pub status: ConfirmationStatus,
    pub notes: Option<String>,
}
