use anyhow::Error;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

pub const DAYS_OF_WEEK: [&str; 7] = [
    "Sunday",
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    User,
}

impl Role {
    pub fn as_str(&self) -> &str {
        match self {
            Role::Admin => "admin",
            Role::User => "user",
        }
    }

    pub fn from_str(s: &str) -> Result<Self, Error> {
        match s {
            "admin" => Ok(Role::Admin),
            "user" => Ok(Role::User),
            _ => Err(Error::msg(format!("Unknown role: {}", s))),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Cadete,
    Juvenil,
    Junior,
    Senior,
}

impl Category {
    pub fn as_str(&self) -> &str {
        match self {
            Category::Cadete => "cadete",
            Category::Juvenil => "juvenil",
            Category::Junior => "junior",
            Category::Senior => "senior",
        }
    }

    pub fn from_str(s: &str) -> Result<Self, Error> {
        match s {
            "cadete" => Ok(Category::Cadete),
            "juvenil" => Ok(Category::Juvenil),
            "junior" => Ok(Category::Junior),
            "senior" => Ok(Category::Senior),
            _ => Err(Error::msg(format!("Unknown category: {}", s))),
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfirmationStatus {
    Confirmed,
    Declined,
    Pending,
}

impl ConfirmationStatus {
    pub fn as_str(&self) -> &str {
        match self {
            ConfirmationStatus::Confirmed => "confirmed",
            ConfirmationStatus::Declined => "declined",
            ConfirmationStatus::Pending => "pending",
        }
    }

    pub fn from_str(s: &str) -> Result<Self, Error> {
        match s {
            "confirmed" => Ok(ConfirmationStatus::Confirmed),
            "declined" => Ok(ConfirmationStatus::Declined),
            "pending" => Ok(ConfirmationStatus::Pending),
            _ => Err(Error::msg(format!("Unknown confirmation status: {}", s))),
        }
    }
}

impl fmt::Display for ConfirmationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Serialize, Clone)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub name: String,
    pub role: Role,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow, Clone)]
pub struct DbUser {
    pub id: Option<i64>,
    pub email: Option<String>,
    pub name: Option<String>,
    pub role: Option<String>,
    pub active: Option<bool>,
    pub created_at: Option<NaiveDateTime>,
}

impl From<DbUser> for User {
    fn from(user: DbUser) -> Self {
        Self {
            id: user.id.unwrap_or_default(),
            email: user.email.unwrap_or_default(),
            name: user.name.unwrap_or_default(),
            role: Role::from_str(&user.role.unwrap_or_default()).unwrap(),
            active: user.active.unwrap_or_default(),
            created_at: utc_or_now(user.created_at),
        }
    }
}

#[derive(Debug, Serialize, Clone)]
pub struct Player {
    pub id: i64,
    pub name: String,
    pub last_name: String,
    pub category: Category,
    pub phone: Option<String>,
    pub position: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub active: bool,
    pub user_id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow, Clone)]
pub struct DbPlayer {
    pub id: Option<i64>,
    pub name: Option<String>,
    pub last_name: Option<String>,
    pub category: Option<String>,
    pub phone: Option<String>,
    pub position: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub active: Option<bool>,
    pub user_id: Option<i64>,
    pub created_at: Option<NaiveDateTime>,
    pub updated_at: Option<NaiveDateTime>,
}

impl From<DbPlayer> for Player {
    fn from(player: DbPlayer) -> Self {
        Self {
            id: player.id.unwrap_or_default(),
            name: player.name.unwrap_or_default(),
            last_name: player.last_name.unwrap_or_default(),
            category: Category::from_str(&player.category.unwrap_or_default()).unwrap(),
            phone: player.phone,
            position: player.position,
            birth_date: player.birth_date,
            active: player.active.unwrap_or_default(),
            user_id: player.user_id.unwrap_or_default(),
            created_at: utc_or_now(player.created_at),
            updated_at: utc_or_now(player.updated_at),
        }
    }
}

/// A recurring weekly slot. Concrete dated occurrences live in
/// `TrainingSession`.
#[derive(Debug, Serialize, Clone)]
pub struct Training {
    pub id: i64,
    pub day_of_week: i64,
    pub day_name: String,
    pub start_time: String,
    pub end_time: String,
    pub name: String,
    pub active: bool,
    pub user_id: i64,
}

#[derive(sqlx::FromRow, Clone)]
pub struct DbTraining {
    pub id: Option<i64>,
    pub day_of_week: Option<i64>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub name: Option<String>,
    pub active: Option<bool>,
    pub user_id: Option<i64>,
}

impl From<DbTraining> for Training {
    fn from(training: DbTraining) -> Self {
        let day_of_week = training.day_of_week.unwrap_or_default();
        Self {
            id: training.id.unwrap_or_default(),
            day_of_week,
            day_name: DAYS_OF_WEEK
                .get(day_of_week as usize)
                .copied()
                .unwrap_or_default()
                .to_string(),
            start_time: training.start_time.unwrap_or_default(),
            end_time: training.end_time.unwrap_or_default(),
            name: training.name.unwrap_or_default(),
            active: training.active.unwrap_or_default(),
            user_id: training.user_id.unwrap_or_default(),
        }
    }
}

/// One concrete dated occurrence of training, optionally tied to the weekly
/// slot it was spawned from. Template fields come along via LEFT JOIN.
#[derive(Debug, Serialize, Clone)]
pub struct TrainingSession {
    pub id: i64,
    pub training_id: Option<i64>,
    pub date: NaiveDate,
    pub notes: Option<String>,
    pub user_id: i64,
    pub training_name: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
}

#[derive(sqlx::FromRow, Clone)]
pub struct DbTrainingSession {
    pub id: Option<i64>,
    pub training_id: Option<i64>,
    pub date: Option<NaiveDate>,
    pub notes: Option<String>,
    pub user_id: Option<i64>,
    pub training_name: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
}

impl From<DbTrainingSession> for TrainingSession {
    fn from(session: DbTrainingSession) -> Self {
        Self {
            id: session.id.unwrap_or_default(),
            training_id: session.training_id,
            date: session.date.unwrap_or_default(),
            notes: session.notes,
            user_id: session.user_id.unwrap_or_default(),
            training_name: session.training_name,
            start_time: session.start_time,
            end_time: session.end_time,
        }
    }
}

#[derive(Debug, Serialize, Clone)]
pub struct AttendanceRecord {
    pub id: i64,
    pub session_id: i64,
    pub player_id: i64,
    pub attended: bool,
    pub absence_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow, Clone)]
pub struct DbAttendanceRecord {
    pub id: Option<i64>,
    pub session_id: Option<i64>,
    pub player_id: Option<i64>,
    pub attended: Option<bool>,
    pub absence_reason: Option<String>,
    pub created_at: Option<NaiveDateTime>,
    pub updated_at: Option<NaiveDateTime>,
}

impl From<DbAttendanceRecord> for AttendanceRecord {
    fn from(record: DbAttendanceRecord) -> Self {
        Self {
            id: record.id.unwrap_or_default(),
            session_id: record.session_id.unwrap_or_default(),
            player_id: record.player_id.unwrap_or_default(),
            attended: record.attended.unwrap_or_default(),
            absence_reason: record.absence_reason,
            created_at: utc_or_now(record.created_at),
            updated_at: utc_or_now(record.updated_at),
        }
    }
}

/// Attendance row joined with the player it belongs to, for session detail
/// views.
#[derive(Debug, Serialize, Clone)]
pub struct AttendanceEntry {
    pub id: i64,
    pub session_id: i64,
    pub player_id: i64,
    pub attended: bool,
    pub absence_reason: Option<String>,
    pub name: String,
    pub last_name: String,
    pub category: Category,
    pub position: Option<String>,
}

#[derive(sqlx::FromRow, Clone)]
pub struct DbAttendanceEntry {
    pub id: Option<i64>,
    pub session_id: Option<i64>,
    pub player_id: Option<i64>,
    pub attended: Option<bool>,
    pub absence_reason: Option<String>,
    pub name: Option<String>,
    pub last_name: Option<String>,
    pub category: Option<String>,
    pub position: Option<String>,
}

impl From<DbAttendanceEntry> for AttendanceEntry {
    fn from(entry: DbAttendanceEntry) -> Self {
        Self {
            id: entry.id.unwrap_or_default(),
            session_id: entry.session_id.unwrap_or_default(),
            player_id: entry.player_id.unwrap_or_default(),
            attended: entry.attended.unwrap_or_default(),
            absence_reason: entry.absence_reason,
            name: entry.name.unwrap_or_default(),
            last_name: entry.last_name.unwrap_or_default(),
            category: Category::from_str(&entry.category.unwrap_or_default()).unwrap(),
            position: entry.position,
        }
    }
}

/// Pre-session RSVP, independent of the post-session attendance fact.
#[derive(Debug, Serialize, Clone)]
pub struct ConfirmationRecord {
    pub id: i64,
    pub session_id: i64,
    pub player_id: i64,
    pub status: ConfirmationStatus,
    pub notes: Option<String>,
}

#[derive(sqlx::FromRow, Clone)]
pub struct DbConfirmationRecord {
    pub id: Option<i64>,
    pub session_id: Option<i64>,
    pub player_id: Option<i64>,
    pub status: Option<String>,
    pub notes: Option<String>,
}

impl From<DbConfirmationRecord> for ConfirmationRecord {
    fn from(record: DbConfirmationRecord) -> Self {
        Self {
            id: record.id.unwrap_or_default(),
            session_id: record.session_id.unwrap_or_default(),
            player_id: record.player_id.unwrap_or_default(),
            status: ConfirmationStatus::from_str(&record.status.unwrap_or_default()).unwrap(),
            notes: record.notes,
        }
    }
}

/// Everything the boundary layer needs to render one session: the session
/// itself, who has an attendance row, who is still pending, and the RSVPs.
#[derive(Debug, Serialize)]
pub struct SessionDetail {
    pub session: TrainingSession,
    pub attendance: Vec<AttendanceEntry>,
    pub pending_players: Vec<Player>,
    pub confirmations: Vec<ConfirmationRecord>,
}

/// Result of a bulk attendance upsert. `skipped` holds the player ids that
/// were dropped for not belonging to the calling tenant.
#[derive(Debug, Serialize)]
pub struct BulkOutcome {
    pub applied: u64,
    pub skipped: Vec<i64>,
}

fn utc_or_now(dt: Option<NaiveDateTime>) -> DateTime<Utc> {
    dt.map(|dt| DateTime::<Utc>::from_naive_utc_and_offset(dt, Utc))
        .unwrap_or_else(Utc::now)
}
