use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use tracing::info;

use attendance_tracker::{env, migrations, schema, telemetry};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env::load_environment()?;
    telemetry::init_tracing();

    let database_url = env::database_url();

    let options = SqliteConnectOptions::from_str(&database_url)?
        .journal_mode(SqliteJournalMode::Wal)
        .foreign_keys(true)
        .create_if_missing(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    let (admin_email, admin_password) = env::admin_credentials();
    schema::init_database(&pool, &admin_email, &admin_password).await?;
    migrations::run_migrations(&pool).await?;

    info!("Attendance ledger ready");

    pool.close().await;

    Ok(())
}
