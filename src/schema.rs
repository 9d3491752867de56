use sqlx::{Pool, Sqlite};
use tracing::{info, instrument};

use crate::error::AppError;

/// Base schema as first shipped. Tenant ownership columns and the
/// confirmations table arrive through the migration ledger, so a database
/// created from this DDL must still go through `run_migrations`.
pub const BASE_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    email TEXT UNIQUE NOT NULL,
    password TEXT NOT NULL,
    name TEXT NOT NULL,
    role TEXT DEFAULT 'user' CHECK(role IN ('admin', 'user')),
    active INTEGER DEFAULT 1,
    created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
    updated_at DATETIME DEFAULT CURRENT_TIMESTAMP
);

CREATE TABLE IF NOT EXISTS players (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    last_name TEXT NOT NULL,
    phone TEXT,
    position TEXT,
    birth_date DATE,
    category TEXT NOT NULL CHECK(category IN ('cadete', 'juvenil', 'junior', 'senior')),
    active INTEGER DEFAULT 1,
    created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
    updated_at DATETIME DEFAULT CURRENT_TIMESTAMP
);

CREATE TABLE IF NOT EXISTS trainings (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    day_of_week INTEGER NOT NULL CHECK(day_of_week BETWEEN 0 AND 6),
    start_time TEXT NOT NULL,
    end_time TEXT NOT NULL,
    name TEXT,
    active INTEGER DEFAULT 1,
    created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
    updated_at DATETIME DEFAULT CURRENT_TIMESTAMP
);

CREATE TABLE IF NOT EXISTS training_sessions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    training_id INTEGER,
    date DATE NOT NULL,
    notes TEXT,
    created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
    FOREIGN KEY (training_id) REFERENCES trainings(id)
);

CREATE TABLE IF NOT EXISTS attendance (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    session_id INTEGER NOT NULL,
    player_id INTEGER NOT NULL,
    attended INTEGER DEFAULT 0,
    absence_reason TEXT,
    created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
    updated_at DATETIME DEFAULT CURRENT_TIMESTAMP,
    FOREIGN KEY (session_id) REFERENCES training_sessions(id),
    FOREIGN KEY (player_id) REFERENCES players(id),
    UNIQUE(session_id, player_id)
);

CREATE INDEX IF NOT EXISTS idx_attendance_session ON attendance(session_id);
CREATE INDEX IF NOT EXISTS idx_attendance_player ON attendance(player_id);
CREATE INDEX IF NOT EXISTS idx_sessions_date ON training_sessions(date);
CREATE INDEX IF NOT EXISTS idx_players_category ON players(category);
"#;

const DEFAULT_TRAININGS: [(i64, &str, &str, &str); 4] = [
    (1, "19:00", "21:00", "Monday"),
    (3, "21:00", "23:00", "Wednesday"),
    (4, "20:00", "22:00", "Thursday"),
    (5, "20:30", "22:00", "Friday"),
];

/// Applies the base DDL and seeds the default admin and weekly slots. Safe to
/// call on every boot; existing rows are left alone.
#[instrument(skip(pool, admin_password))]
pub async fn init_database(
    pool: &Pool<Sqlite>,
    admin_email: &str,
    admin_password: &str,
) -> Result<(), AppError> {
    info!("Initialising database schema");

    sqlx::raw_sql(BASE_SCHEMA).execute(pool).await?;

    let existing_admin = sqlx::query("SELECT id FROM users WHERE email = ?")
        .bind(admin_email)
        .fetch_optional(pool)
        .await?;

    if existing_admin.is_none() {
        let hashed_password = bcrypt::hash(admin_password, bcrypt::DEFAULT_COST)?;

        sqlx::query("INSERT INTO users (email, password, name, role) VALUES (?, ?, ?, ?)")
            .bind(admin_email)
            .bind(&hashed_password)
            .bind("Administrator")
            .bind("admin")
            .execute(pool)
            .await?;

        info!(email = %admin_email, "Default admin user created");
    }

    let training_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM trainings")
        .fetch_one(pool)
        .await?;

    if training_count == 0 {
        for (day, start, end, name) in DEFAULT_TRAININGS {
            sqlx::query(
                "INSERT INTO trainings (day_of_week, start_time, end_time, name) VALUES (?, ?, ?, ?)",
            )
            .bind(day)
            .bind(start)
            .bind(end)
            .bind(name)
            .execute(pool)
            .await?;
        }

        info!("Default weekly trainings created");
    }

    Ok(())
}
