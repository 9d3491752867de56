use sqlx::{Pool, Sqlite};
use tracing::{info, instrument};

use crate::error::AppError;
use crate::models::{
    AttendanceEntry, AttendanceRecord, BulkOutcome, ConfirmationRecord, DbAttendanceEntry,
    DbAttendanceRecord, DbConfirmationRecord, DbPlayer, DbTraining, DbTrainingSession, DbUser,
    DAYS_OF_WEEK, Category, Player, Role, SessionDetail, Training, TrainingSession, User,
};
use crate::validation::{
    AttendanceInput, BulkAttendanceInput, ConfirmationInput, NewPlayer, NewTraining, NewUser,
    PlayerUpdate, SessionRequest, TrainingUpdate, UserUpdate,
};

const SESSION_SELECT: &str = "SELECT ts.id, ts.training_id, ts.date, ts.notes, ts.user_id,
            t.name AS training_name, t.start_time, t.end_time
     FROM training_sessions ts
     LEFT JOIN trainings t ON ts.training_id = t.id";

// ---------------------------------------------------------------------------
// Users

#[instrument(skip_all, fields(email = %new.email))]
pub async fn create_user(pool: &Pool<Sqlite>, new: &NewUser) -> Result<User, AppError> {
    info!("Creating new user");

    let existing = sqlx::query("SELECT id FROM users WHERE email = ?")
        .bind(&new.email)
        .fetch_optional(pool)
        .await?;

    if existing.is_some() {
        return Err(AppError::Validation(format!(
            "Email '{}' is already registered",
            new.email
        )));
    }

    let hashed_password = bcrypt::hash(&new.password, bcrypt::DEFAULT_COST)?;

    let res = sqlx::query("INSERT INTO users (email, password, name, role) VALUES (?, ?, ?, ?)")
        .bind(&new.email)
        .bind(&hashed_password)
        .bind(&new.name)
        .bind(new.role.as_str())
        .execute(pool)
        .await?;

    get_user(pool, res.last_insert_rowid()).await
}

#[instrument(skip(pool))]
pub async fn get_user(pool: &Pool<Sqlite>, id: i64) -> Result<User, AppError> {
    let row = sqlx::query_as::<_, DbUser>(
        "SELECT id, email, name, role, active, created_at FROM users WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    match row {
        Some(user) => Ok(User::from(user)),
        _ => Err(AppError::NotFound("User not found".to_string())),
    }
}

#[instrument(skip(pool))]
pub async fn get_all_users(pool: &Pool<Sqlite>) -> Result<Vec<User>, AppError> {
    info!("Getting all users");
    let rows = sqlx::query_as::<_, DbUser>(
        "SELECT id, email, name, role, active, created_at FROM users ORDER BY name",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(User::from).collect())
}

#[instrument(skip(pool, update))]
pub async fn update_user(
    pool: &Pool<Sqlite>,
    user_id: i64,
    update: &UserUpdate,
) -> Result<User, AppError> {
    info!("Updating user");

    get_user(pool, user_id).await?;

    if let Some(email) = &update.email {
        let existing = sqlx::query("SELECT id FROM users WHERE email = ? AND id != ?")
            .bind(email)
            .bind(user_id)
            .fetch_optional(pool)
            .await?;

        if existing.is_some() {
            return Err(AppError::Validation("Email is already registered".to_string()));
        }
    }

    let hashed_password = match &update.password {
        Some(password) => Some(bcrypt::hash(password, bcrypt::DEFAULT_COST)?),
        None => None,
    };

    sqlx::query(
        "UPDATE users SET
            email = COALESCE(?, email),
            password = COALESCE(?, password),
            name = COALESCE(?, name),
            role = COALESCE(?, role),
            active = COALESCE(?, active),
            updated_at = CURRENT_TIMESTAMP
         WHERE id = ?",
    )
    .bind(&update.email)
    .bind(&hashed_password)
    .bind(&update.name)
    .bind(update.role.map(|r| r.as_str().to_string()))
    .bind(update.active)
    .bind(user_id)
    .execute(pool)
    .await?;

    get_user(pool, user_id).await
}

/// Only admins delete users, and never themselves.
#[instrument(skip(pool, acting), fields(acting_id = acting.id))]
pub async fn delete_user(
    pool: &Pool<Sqlite>,
    acting: &User,
    target_id: i64,
) -> Result<(), AppError> {
    info!("Deleting user");

    if acting.role != Role::Admin {
        return Err(AppError::Authorization(
            "Only admins can delete users".to_string(),
        ));
    }

    if acting.id == target_id {
        return Err(AppError::Validation(
            "You cannot delete your own account".to_string(),
        ));
    }

    get_user(pool, target_id).await?;

    sqlx::query("DELETE FROM users WHERE id = ?")
        .bind(target_id)
        .execute(pool)
        .await?;

    Ok(())
}

// ---------------------------------------------------------------------------
// Players

#[instrument(skip(pool, new))]
pub async fn create_player(
    pool: &Pool<Sqlite>,
    user_id: i64,
    new: &NewPlayer,
) -> Result<Player, AppError> {
    info!("Creating player");

    let res = sqlx::query(
        "INSERT INTO players (name, last_name, phone, position, birth_date, category, user_id)
         VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&new.name)
    .bind(&new.last_name)
    .bind(&new.phone)
    .bind(&new.position)
    .bind(new.birth_date)
    .bind(new.category.as_str())
    .bind(user_id)
    .execute(pool)
    .await?;

    get_player(pool, user_id, res.last_insert_rowid()).await
}

#[instrument(skip(pool))]
pub async fn get_players(
    pool: &Pool<Sqlite>,
    user_id: i64,
    active: Option<bool>,
    category: Option<Category>,
) -> Result<Vec<Player>, AppError> {
    info!("Getting players");

    let mut sql = String::from("SELECT * FROM players WHERE user_id = ?");
    if active.is_some() {
        sql.push_str(" AND active = ?");
    }
    if category.is_some() {
        sql.push_str(" AND category = ?");
    }
    sql.push_str(" ORDER BY last_name, name");

    let mut query = sqlx::query_as::<_, DbPlayer>(&sql).bind(user_id);
    if let Some(active) = active {
        query = query.bind(active);
    }
    if let Some(category) = category {
        query = query.bind(category.as_str().to_string());
    }

    let rows = query.fetch_all(pool).await?;

    Ok(rows.into_iter().map(Player::from).collect())
}

#[instrument(skip(pool))]
pub async fn get_player(pool: &Pool<Sqlite>, user_id: i64, id: i64) -> Result<Player, AppError> {
    let row = sqlx::query_as::<_, DbPlayer>("SELECT * FROM players WHERE id = ? AND user_id = ?")
        .bind(id)
        .bind(user_id)
        .fetch_optional(pool)
        .await?;

    match row {
        Some(player) => Ok(Player::from(player)),
        _ => Err(AppError::NotFound("Player not found".to_string())),
    }
}

#[instrument(skip(pool, update))]
pub async fn update_player(
    pool: &Pool<Sqlite>,
    user_id: i64,
    id: i64,
    update: &PlayerUpdate,
) -> Result<Player, AppError> {
    info!("Updating player");

    get_player(pool, user_id, id).await?;

    sqlx::query(
        "UPDATE players SET
            name = COALESCE(?, name),
            last_name = COALESCE(?, last_name),
            phone = COALESCE(?, phone),
            position = COALESCE(?, position),
            birth_date = COALESCE(?, birth_date),
            category = COALESCE(?, category),
            active = COALESCE(?, active),
            updated_at = CURRENT_TIMESTAMP
         WHERE id = ? AND user_id = ?",
    )
    .bind(&update.name)
    .bind(&update.last_name)
    .bind(&update.phone)
    .bind(&update.position)
    .bind(update.birth_date)
    .bind(update.category.map(|c| c.as_str().to_string()))
    .bind(update.active)
    .bind(id)
    .bind(user_id)
    .execute(pool)
    .await?;

    get_player(pool, user_id, id).await
}

#[instrument(skip(pool))]
pub async fn toggle_player_active(
    pool: &Pool<Sqlite>,
    user_id: i64,
    id: i64,
) -> Result<Player, AppError> {
    info!("Toggling player active flag");

    let player = get_player(pool, user_id, id).await?;

    sqlx::query(
        "UPDATE players SET active = ?, updated_at = CURRENT_TIMESTAMP
         WHERE id = ? AND user_id = ?",
    )
    .bind(!player.active)
    .bind(id)
    .bind(user_id)
    .execute(pool)
    .await?;

    get_player(pool, user_id, id).await
}

/// Hard delete. Attendance and confirmation rows go first; the store has no
/// FK cascade, so the ordering here is the only thing keeping orphans out.
#[instrument(skip(pool))]
pub async fn delete_player(pool: &Pool<Sqlite>, user_id: i64, id: i64) -> Result<(), AppError> {
    info!("Deleting player");

    get_player(pool, user_id, id).await?;

    sqlx::query("DELETE FROM attendance WHERE player_id = ?")
        .bind(id)
        .execute(pool)
        .await?;

    sqlx::query("DELETE FROM training_confirmations WHERE player_id = ?")
        .bind(id)
        .execute(pool)
        .await?;

    sqlx::query("DELETE FROM players WHERE id = ? AND user_id = ?")
        .bind(id)
        .bind(user_id)
        .execute(pool)
        .await?;

    Ok(())
}

// ---------------------------------------------------------------------------
// Trainings

#[instrument(skip(pool, new))]
pub async fn create_training(
    pool: &Pool<Sqlite>,
    user_id: i64,
    new: &NewTraining,
) -> Result<Training, AppError> {
    info!("Creating training");

    let name = new
        .name
        .clone()
        .unwrap_or_else(|| DAYS_OF_WEEK[new.day_of_week as usize].to_string());

    let res = sqlx::query(
        "INSERT INTO trainings (day_of_week, start_time, end_time, name, user_id)
         VALUES (?, ?, ?, ?, ?)",
    )
    .bind(new.day_of_week)
    .bind(&new.start_time)
    .bind(&new.end_time)
    .bind(&name)
    .bind(user_id)
    .execute(pool)
    .await?;

    get_training(pool, user_id, res.last_insert_rowid()).await
}

#[instrument(skip(pool))]
pub async fn get_trainings(
    pool: &Pool<Sqlite>,
    user_id: i64,
    active: Option<bool>,
) -> Result<Vec<Training>, AppError> {
    info!("Getting trainings");

    let mut sql = String::from("SELECT * FROM trainings WHERE user_id = ?");
    if active.is_some() {
        sql.push_str(" AND active = ?");
    }
    sql.push_str(" ORDER BY day_of_week, start_time");

    let mut query = sqlx::query_as::<_, DbTraining>(&sql).bind(user_id);
    if let Some(active) = active {
        query = query.bind(active);
    }

    let rows = query.fetch_all(pool).await?;

    Ok(rows.into_iter().map(Training::from).collect())
}

#[instrument(skip(pool))]
pub async fn get_training(
    pool: &Pool<Sqlite>,
    user_id: i64,
    id: i64,
) -> Result<Training, AppError> {
    let row = sqlx::query_as::<_, DbTraining>("SELECT * FROM trainings WHERE id = ? AND user_id = ?")
        .bind(id)
        .bind(user_id)
        .fetch_optional(pool)
        .await?;

    match row {
        Some(training) => Ok(Training::from(training)),
        _ => Err(AppError::NotFound("Training not found".to_string())),
    }
}

#[instrument(skip(pool, update))]
pub async fn update_training(
    pool: &Pool<Sqlite>,
    user_id: i64,
    id: i64,
    update: &TrainingUpdate,
) -> Result<Training, AppError> {
    info!("Updating training");

    get_training(pool, user_id, id).await?;

    sqlx::query(
        "UPDATE trainings SET
            day_of_week = COALESCE(?, day_of_week),
            start_time = COALESCE(?, start_time),
            end_time = COALESCE(?, end_time),
            name = COALESCE(?, name),
            active = COALESCE(?, active),
            updated_at = CURRENT_TIMESTAMP
         WHERE id = ? AND user_id = ?",
    )
    .bind(update.day_of_week)
    .bind(&update.start_time)
    .bind(&update.end_time)
    .bind(&update.name)
    .bind(update.active)
    .bind(id)
    .bind(user_id)
    .execute(pool)
    .await?;

    get_training(pool, user_id, id).await
}

#[instrument(skip(pool))]
pub async fn delete_training(pool: &Pool<Sqlite>, user_id: i64, id: i64) -> Result<(), AppError> {
    info!("Deleting training");

    get_training(pool, user_id, id).await?;

    sqlx::query("DELETE FROM trainings WHERE id = ? AND user_id = ?")
        .bind(id)
        .bind(user_id)
        .execute(pool)
        .await?;

    Ok(())
}

// ---------------------------------------------------------------------------
// Sessions

#[instrument(skip(pool))]
pub async fn get_sessions(
    pool: &Pool<Sqlite>,
    user_id: i64,
    from: Option<chrono::NaiveDate>,
    to: Option<chrono::NaiveDate>,
    training_id: Option<i64>,
) -> Result<Vec<TrainingSession>, AppError> {
    info!("Getting training sessions");

    let mut sql = format!("{} WHERE ts.user_id = ?", SESSION_SELECT);
    if from.is_some() {
        sql.push_str(" AND ts.date >= ?");
    }
    if to.is_some() {
        sql.push_str(" AND ts.date <= ?");
    }
    if training_id.is_some() {
        sql.push_str(" AND ts.training_id = ?");
    }
    sql.push_str(" ORDER BY ts.date DESC");

    let mut query = sqlx::query_as::<_, DbTrainingSession>(&sql).bind(user_id);
    if let Some(from) = from {
        query = query.bind(from);
    }
    if let Some(to) = to {
        query = query.bind(to);
    }
    if let Some(training_id) = training_id {
        query = query.bind(training_id);
    }

    let rows = query.fetch_all(pool).await?;

    Ok(rows.into_iter().map(TrainingSession::from).collect())
}

#[instrument(skip(pool))]
pub async fn get_session(
    pool: &Pool<Sqlite>,
    user_id: i64,
    id: i64,
) -> Result<TrainingSession, AppError> {
    let sql = format!("{} WHERE ts.id = ? AND ts.user_id = ?", SESSION_SELECT);
    let row = sqlx::query_as::<_, DbTrainingSession>(&sql)
        .bind(id)
        .bind(user_id)
        .fetch_optional(pool)
        .await?;

    match row {
        Some(session) => Ok(TrainingSession::from(session)),
        _ => Err(AppError::NotFound("Session not found".to_string())),
    }
}

/// Get-or-create for a concrete training date. Repeated calls with the same
/// parameters return the same row; callers serialize creation per tenant and
/// date, there is no unique index backing this up.
#[instrument(skip(pool, request))]
pub async fn resolve_session(
    pool: &Pool<Sqlite>,
    user_id: i64,
    request: &SessionRequest,
) -> Result<TrainingSession, AppError> {
    info!("Resolving training session");

    let mut sql = format!("{} WHERE ts.user_id = ? AND ts.date = ?", SESSION_SELECT);
    if request.training_id.is_some() {
        sql.push_str(" AND ts.training_id = ?");
    }

    let mut query = sqlx::query_as::<_, DbTrainingSession>(&sql)
        .bind(user_id)
        .bind(request.date);
    if let Some(training_id) = request.training_id {
        query = query.bind(training_id);
    }

    if let Some(existing) = query.fetch_optional(pool).await? {
        return Ok(TrainingSession::from(existing));
    }

    let res = sqlx::query(
        "INSERT INTO training_sessions (date, training_id, notes, user_id) VALUES (?, ?, ?, ?)",
    )
    .bind(request.date)
    .bind(request.training_id)
    .bind(&request.notes)
    .bind(user_id)
    .execute(pool)
    .await?;

    info!(session_id = res.last_insert_rowid(), "Created new session");

    get_session(pool, user_id, res.last_insert_rowid()).await
}

#[instrument(skip(pool))]
pub async fn get_session_detail(
    pool: &Pool<Sqlite>,
    user_id: i64,
    session_id: i64,
) -> Result<SessionDetail, AppError> {
    info!("Getting session detail");

    let session = get_session(pool, user_id, session_id).await?;

    let attendance = sqlx::query_as::<_, DbAttendanceEntry>(
        "SELECT a.id, a.session_id, a.player_id, a.attended, a.absence_reason,
                p.name, p.last_name, p.category, p.position
         FROM attendance a
         JOIN players p ON a.player_id = p.id
         WHERE a.session_id = ?
         ORDER BY p.last_name, p.name",
    )
    .bind(session_id)
    .fetch_all(pool)
    .await?;

    let pending = sqlx::query_as::<_, DbPlayer>(
        "SELECT p.* FROM players p
         WHERE p.user_id = ? AND p.active = 1
           AND p.id NOT IN (SELECT player_id FROM attendance WHERE session_id = ?)
         ORDER BY p.last_name, p.name",
    )
    .bind(user_id)
    .bind(session_id)
    .fetch_all(pool)
    .await?;

    let confirmations = sqlx::query_as::<_, DbConfirmationRecord>(
        "SELECT id, session_id, player_id, status, notes
         FROM training_confirmations WHERE session_id = ?",
    )
    .bind(session_id)
    .fetch_all(pool)
    .await?;

    Ok(SessionDetail {
        session,
        attendance: attendance.into_iter().map(AttendanceEntry::from).collect(),
        pending_players: pending.into_iter().map(Player::from).collect(),
        confirmations: confirmations
            .into_iter()
            .map(ConfirmationRecord::from)
            .collect(),
    })
}

// ---------------------------------------------------------------------------
// Attendance

async fn player_owned(
    executor: impl sqlx::Executor<'_, Database = Sqlite>,
    player_id: i64,
    user_id: i64,
) -> Result<bool, AppError> {
    let row = sqlx::query("SELECT id FROM players WHERE id = ? AND user_id = ?")
        .bind(player_id)
        .bind(user_id)
        .fetch_optional(executor)
        .await?;

    Ok(row.is_some())
}

async fn session_owned(
    executor: impl sqlx::Executor<'_, Database = Sqlite>,
    session_id: i64,
    user_id: i64,
) -> Result<bool, AppError> {
    let row = sqlx::query("SELECT id FROM training_sessions WHERE id = ? AND user_id = ?")
        .bind(session_id)
        .bind(user_id)
        .fetch_optional(executor)
        .await?;

    Ok(row.is_some())
}

const ATTENDANCE_UPSERT: &str = "INSERT INTO attendance (session_id, player_id, attended, absence_reason)
     VALUES (?, ?, ?, ?)
     ON CONFLICT(session_id, player_id) DO UPDATE SET
        attended = excluded.attended,
        absence_reason = excluded.absence_reason,
        updated_at = CURRENT_TIMESTAMP";

/// Insert-or-update keyed on (session, player). Last writer wins; an attended
/// record never carries an absence reason.
#[instrument(skip(pool, input), fields(session_id = input.session_id, player_id = input.player_id))]
pub async fn record_attendance(
    pool: &Pool<Sqlite>,
    user_id: i64,
    input: &AttendanceInput,
) -> Result<AttendanceRecord, AppError> {
    info!("Recording attendance");

    if !session_owned(pool, input.session_id, user_id).await? {
        return Err(AppError::NotFound("Session not found".to_string()));
    }

    if !player_owned(pool, input.player_id, user_id).await? {
        return Err(AppError::NotFound("Player not found".to_string()));
    }

    let reason = if input.attended {
        None
    } else {
        input.absence_reason.clone()
    };

    sqlx::query(ATTENDANCE_UPSERT)
        .bind(input.session_id)
        .bind(input.player_id)
        .bind(input.attended)
        .bind(&reason)
        .execute(pool)
        .await?;

    let row = sqlx::query_as::<_, DbAttendanceRecord>(
        "SELECT * FROM attendance WHERE session_id = ? AND player_id = ?",
    )
    .bind(input.session_id)
    .bind(input.player_id)
    .fetch_one(pool)
    .await?;

    Ok(AttendanceRecord::from(row))
}

/// Upserts a whole roster in one transaction. Items whose player belongs to
/// another tenant are skipped and reported back; a store error rolls back
/// every item.
#[instrument(skip(pool, input), fields(session_id = input.session_id, items = input.attendance.len()))]
pub async fn record_attendance_bulk(
    pool: &Pool<Sqlite>,
    user_id: i64,
    input: &BulkAttendanceInput,
) -> Result<BulkOutcome, AppError> {
    info!("Recording bulk attendance");

    if !session_owned(pool, input.session_id, user_id).await? {
        return Err(AppError::NotFound("Session not found".to_string()));
    }

    let mut tx = pool.begin().await?;
    let mut applied = 0u64;
    let mut skipped = Vec::new();

    for item in &input.attendance {
        if !player_owned(&mut *tx, item.player_id, user_id).await? {
            skipped.push(item.player_id);
            continue;
        }

        let reason = if item.attended {
            None
        } else {
            item.absence_reason.clone()
        };

        sqlx::query(ATTENDANCE_UPSERT)
            .bind(input.session_id)
            .bind(item.player_id)
            .bind(item.attended)
            .bind(&reason)
            .execute(&mut *tx)
            .await?;

        applied += 1;
    }

    tx.commit().await?;

    if !skipped.is_empty() {
        info!(skipped = ?skipped, "Bulk attendance skipped unowned players");
    }

    Ok(BulkOutcome { applied, skipped })
}

#[instrument(skip(pool))]
pub async fn delete_attendance(
    pool: &Pool<Sqlite>,
    user_id: i64,
    attendance_id: i64,
) -> Result<(), AppError> {
    info!("Deleting attendance record");

    let res = sqlx::query(
        "DELETE FROM attendance
         WHERE id = ?
           AND session_id IN (SELECT id FROM training_sessions WHERE user_id = ?)",
    )
    .bind(attendance_id)
    .bind(user_id)
    .execute(pool)
    .await?;

    if res.rows_affected() == 0 {
        return Err(AppError::NotFound("Attendance record not found".to_string()));
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Confirmations

/// RSVP upsert. Same ownership rules and conflict target as attendance, but a
/// fully independent lifecycle: confirming says nothing about showing up.
#[instrument(skip(pool, input), fields(session_id = input.session_id, player_id = input.player_id))]
pub async fn record_confirmation(
    pool: &Pool<Sqlite>,
    user_id: i64,
    input: &ConfirmationInput,
) -> Result<ConfirmationRecord, AppError> {
    info!("Recording confirmation");

    if !session_owned(pool, input.session_id, user_id).await? {
        return Err(AppError::NotFound("Session not found".to_string()));
    }

    if !player_owned(pool, input.player_id, user_id).await? {
        return Err(AppError::NotFound("Player not found".to_string()));
    }

    sqlx::query(
        "INSERT INTO training_confirmations (session_id, player_id, status, notes)
         VALUES (?, ?, ?, ?)
         ON CONFLICT(session_id, player_id) DO UPDATE SET
            status = excluded.status,
            notes = excluded.notes,
            updated_at = CURRENT_TIMESTAMP",
    )
    .bind(input.session_id)
    .bind(input.player_id)
    .bind(input.status.as_str())
    .bind(&input.notes)
    .execute(pool)
    .await?;

    let row = sqlx::query_as::<_, DbConfirmationRecord>(
        "SELECT id, session_id, player_id, status, notes
         FROM training_confirmations WHERE session_id = ? AND player_id = ?",
    )
    .bind(input.session_id)
    .bind(input.player_id)
    .fetch_one(pool)
    .await?;

    Ok(ConfirmationRecord::from(row))
}
