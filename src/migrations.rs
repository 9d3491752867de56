use sqlx::{Pool, Row, Sqlite};
use tracing::{error, info, instrument};

use crate::error::AppError;

/// Ordered list of schema upgrades. Names are the ledger key; never rename or
/// reorder entries that have shipped.
pub const MIGRATIONS: [&str; 5] = [
    "001_add_user_id_to_players",
    "002_add_user_id_to_trainings",
    "003_add_user_id_to_training_sessions",
    "004_create_user_id_indexes",
    "005_create_training_confirmations",
];

const CONFIRMATIONS_DDL: &str = r#"
CREATE TABLE IF NOT EXISTS training_confirmations (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    session_id INTEGER NOT NULL,
    player_id INTEGER NOT NULL,
    status TEXT NOT NULL DEFAULT 'pending' CHECK(status IN ('confirmed', 'declined', 'pending')),
    notes TEXT,
    created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
    updated_at DATETIME DEFAULT CURRENT_TIMESTAMP,
    FOREIGN KEY (session_id) REFERENCES training_sessions(id),
    FOREIGN KEY (player_id) REFERENCES players(id),
    UNIQUE(session_id, player_id)
);

CREATE INDEX IF NOT EXISTS idx_confirmations_session ON training_confirmations(session_id);
"#;

/// Runs pending migrations in declared order, recording each applied name in
/// the `migrations` ledger. A failing migration is logged and skipped without
/// a ledger row, so it retries on the next boot; later migrations still run.
#[instrument(skip(pool))]
pub async fn run_migrations(pool: &Pool<Sqlite>) -> Result<(), AppError> {
    info!("Running database migrations");

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS migrations (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT UNIQUE NOT NULL,
            executed_at DATETIME DEFAULT CURRENT_TIMESTAMP
        )",
    )
    .execute(pool)
    .await?;

    let executed: Vec<String> = sqlx::query_scalar("SELECT name FROM migrations")
        .fetch_all(pool)
        .await?;

    for name in MIGRATIONS {
        if executed.iter().any(|n| n == name) {
            continue;
        }

        match apply_and_record(pool, name).await {
            Ok(()) => info!(migration = name, "Migration executed"),
            Err(e) => {
                // Best-effort: the ledger row was not written, so this
                // migration runs again on the next boot.
                error!(migration = name, error = %e, "Migration failed, continuing");
            }
        }
    }

    Ok(())
}

async fn apply_and_record(pool: &Pool<Sqlite>, name: &str) -> Result<(), AppError> {
    match name {
        "001_add_user_id_to_players" => add_owner_column(pool, "players").await?,
        "002_add_user_id_to_trainings" => add_owner_column(pool, "trainings").await?,
        "003_add_user_id_to_training_sessions" => {
            add_owner_column(pool, "training_sessions").await?
        }
        "004_create_user_id_indexes" => {
            sqlx::raw_sql(
                "CREATE INDEX IF NOT EXISTS idx_players_user ON players(user_id);
                 CREATE INDEX IF NOT EXISTS idx_trainings_user ON trainings(user_id);
                 CREATE INDEX IF NOT EXISTS idx_sessions_user ON training_sessions(user_id);",
            )
            .execute(pool)
            .await?;
        }
        "005_create_training_confirmations" => {
            sqlx::raw_sql(CONFIRMATIONS_DDL).execute(pool).await?;
        }
        _ => {
            return Err(AppError::Internal(format!("Unknown migration: {}", name)));
        }
    }

    sqlx::query("INSERT INTO migrations (name) VALUES (?)")
        .bind(name)
        .execute(pool)
        .await?;

    Ok(())
}

/// Adds the tenant ownership column and assigns pre-tenancy rows to the first
/// admin. The column check keeps the body re-runnable after a partial failure
/// where the ALTER succeeded but the ledger write did not.
async fn add_owner_column(pool: &Pool<Sqlite>, table: &str) -> Result<(), AppError> {
    if column_exists(pool, table, "user_id").await? {
        return Ok(());
    }

    sqlx::query(&format!(
        "ALTER TABLE {} ADD COLUMN user_id INTEGER REFERENCES users(id)",
        table
    ))
    .execute(pool)
    .await?;

    let admin_id: Option<i64> = sqlx::query_scalar(
        "SELECT id FROM users WHERE role = 'admin' ORDER BY id ASC LIMIT 1",
    )
    .fetch_optional(pool)
    .await?;

    if let Some(admin_id) = admin_id {
        sqlx::query(&format!(
            "UPDATE {} SET user_id = ? WHERE user_id IS NULL",
            table
        ))
        .bind(admin_id)
        .execute(pool)
        .await?;
    }

    Ok(())
}

pub async fn column_exists(
    pool: &Pool<Sqlite>,
    table: &str,
    column: &str,
) -> Result<bool, AppError> {
    let rows = sqlx::query(&format!("PRAGMA table_info({})", table))
        .fetch_all(pool)
        .await?;

    Ok(rows.iter().any(|row| row.get::<String, _>(1) == column))
}
