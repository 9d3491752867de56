use std::path::Path;

use tracing::{info, warn};

pub fn load_environment() -> Result<(), Box<dyn std::error::Error>> {
    let is_production =
        dotenvy::var("APP_PROFILE").unwrap_or("development".to_string()) == "production";

    let env_files = if is_production {
        vec!["config/common.env", "config/prod.env", ".secrets.env"]
    } else {
        vec!["config/common.env", "config/dev.env", ".secrets.env"]
    };

    for env_file in env_files {
        load_env_file(env_file)?;
    }

    Ok(())
}

fn load_env_file(path: &str) -> Result<(), Box<dyn std::error::Error>> {
    if !Path::new(path).exists() {
        warn!("Warning: Environment file {} not found, skipping", path);
        return Ok(());
    }

    dotenvy::from_filename_override(path)?;
    info!("Loaded environment from: {}", path);
    Ok(())
}

pub fn database_url() -> String {
    dotenvy::var("DATABASE_URL").unwrap_or("sqlite://data/attendance.db".to_string())
}

/// Email and password the bootstrap admin is seeded with.
pub fn admin_credentials() -> (String, String) {
    let email = dotenvy::var("ADMIN_EMAIL").unwrap_or("admin@localhost".to_string());
    let password = dotenvy::var("ADMIN_PASSWORD").unwrap_or("admin123".to_string());
    (email, password)
}
