use std::collections::BTreeMap;

use chrono::{Datelike, Days, NaiveDate, Utc};
use serde::Serialize;
use sqlx::{Pool, Sqlite};
use tracing::{info, instrument};

use crate::db::{get_player, get_trainings};
use crate::error::AppError;
use crate::models::{Category, Training};

/// Raw (session, attended) pair as fetched for the rolling average.
#[derive(sqlx::FromRow)]
pub struct SessionAttendanceRow {
    pub session_id: i64,
    pub attended: bool,
}

/// Raw (category, date, attended) triple as fetched for the trend series.
#[derive(sqlx::FromRow)]
pub struct CategoryAttendanceRow {
    pub category: String,
    pub date: NaiveDate,
    pub attended: bool,
}

#[derive(Debug, Serialize)]
pub struct DashboardMetrics {
    pub total_players: i64,
    pub avg_attendance: f64,
    pub trends: Vec<CategoryTrendPoint>,
    pub upcoming_trainings: Vec<Training>,
}

/// Attendance rate of one category in one calendar month.
#[derive(Debug, Serialize, PartialEq)]
pub struct CategoryTrendPoint {
    pub category: Category,
    pub month: NaiveDate,
    pub rate: f64,
}

#[derive(Debug, Serialize)]
pub struct PlayerStats {
    pub total_sessions: i64,
    pub attended: i64,
    pub missed: i64,
    pub attendance_rate: String,
    pub absences: Vec<AbsenceEntry>,
}

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct AbsenceEntry {
    pub date: NaiveDate,
    pub absence_reason: Option<String>,
}

/// Mean of per-session present/total ratios, as a percentage rounded to one
/// decimal. Each session weighs the same no matter how many players it had;
/// sessions without any attendance rows do not appear in `rows` and therefore
/// never drag the average down. 0.0 when no session qualifies.
pub fn rolling_attendance_average(rows: &[SessionAttendanceRow]) -> f64 {
    let mut per_session: BTreeMap<i64, (u32, u32)> = BTreeMap::new();

    for row in rows {
        let entry = per_session.entry(row.session_id).or_insert((0, 0));
        entry.1 += 1;
        if row.attended {
            entry.0 += 1;
        }
    }

    if per_session.is_empty() {
        return 0.0;
    }

    let sum: f64 = per_session
        .values()
        .map(|(present, total)| f64::from(*present) / f64::from(*total))
        .sum();

    round1(sum / per_session.len() as f64 * 100.0)
}

/// Groups attendance rows by (category, month of session date) and computes
/// each group's attendance rate, ordered by month ascending. Pairs with no
/// rows are omitted rather than reported as zero.
pub fn category_trends(rows: &[CategoryAttendanceRow]) -> Vec<CategoryTrendPoint> {
    let mut groups: BTreeMap<(NaiveDate, String), (u32, u32)> = BTreeMap::new();

    for row in rows {
        let month = month_start(row.date);
        let entry = groups.entry((month, row.category.clone())).or_insert((0, 0));
        entry.1 += 1;
        if row.attended {
            entry.0 += 1;
        }
    }

    groups
        .into_iter()
        .filter_map(|((month, category), (attended, total))| {
            let category = Category::from_str(&category).ok()?;
            Some(CategoryTrendPoint {
                category,
                month,
                rate: round1(f64::from(attended) / f64::from(total) * 100.0),
            })
        })
        .collect()
}

#[instrument(skip(pool))]
pub async fn get_dashboard_metrics(
    pool: &Pool<Sqlite>,
    user_id: i64,
) -> Result<DashboardMetrics, AppError> {
    info!("Computing dashboard metrics");

    let total_players: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM players WHERE user_id = ? AND active = 1",
    )
    .bind(user_id)
    .fetch_one(pool)
    .await?;

    let cutoff = window_start(30);
    let rows = sqlx::query_as::<_, SessionAttendanceRow>(
        "SELECT a.session_id, a.attended
         FROM attendance a
         JOIN training_sessions ts ON a.session_id = ts.id
         WHERE ts.user_id = ? AND ts.date >= ?",
    )
    .bind(user_id)
    .bind(cutoff)
    .fetch_all(pool)
    .await?;

    let trends = get_trend_series(pool, user_id).await?;
    let upcoming_trainings = get_trainings(pool, user_id, Some(true)).await?;

    Ok(DashboardMetrics {
        total_players,
        avg_attendance: rolling_attendance_average(&rows),
        trends,
        upcoming_trainings,
    })
}

#[instrument(skip(pool))]
pub async fn get_trend_series(
    pool: &Pool<Sqlite>,
    user_id: i64,
) -> Result<Vec<CategoryTrendPoint>, AppError> {
    info!("Computing category trend series");

    let cutoff = window_start(90);
    let rows = sqlx::query_as::<_, CategoryAttendanceRow>(
        "SELECT p.category, ts.date, a.attended
         FROM attendance a
         JOIN players p ON a.player_id = p.id
         JOIN training_sessions ts ON a.session_id = ts.id
         WHERE ts.user_id = ? AND ts.date >= ?",
    )
    .bind(user_id)
    .bind(cutoff)
    .fetch_all(pool)
    .await?;

    Ok(category_trends(&rows))
}

/// Attendance totals for one player, optionally restricted to a date range.
/// Absences come back most recent first.
#[instrument(skip(pool))]
pub async fn get_player_stats(
    pool: &Pool<Sqlite>,
    user_id: i64,
    player_id: i64,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
) -> Result<PlayerStats, AppError> {
    info!("Computing player attendance stats");

    get_player(pool, user_id, player_id).await?;

    let mut totals_sql = String::from(
        "SELECT COUNT(*) AS total,
                COALESCE(SUM(CASE WHEN a.attended = 1 THEN 1 ELSE 0 END), 0) AS attended
         FROM attendance a
         JOIN training_sessions ts ON a.session_id = ts.id
         WHERE a.player_id = ?",
    );
    if from.is_some() && to.is_some() {
        totals_sql.push_str(" AND ts.date BETWEEN ? AND ?");
    }

    let mut totals_query = sqlx::query_as::<_, (i64, i64)>(&totals_sql).bind(player_id);
    if let (Some(from), Some(to)) = (from, to) {
        totals_query = totals_query.bind(from).bind(to);
    }
    let (total_sessions, attended) = totals_query.fetch_one(pool).await?;

    let mut absences_sql = String::from(
        "SELECT ts.date, a.absence_reason
         FROM attendance a
         JOIN training_sessions ts ON a.session_id = ts.id
         WHERE a.player_id = ? AND a.attended = 0",
    );
    if from.is_some() && to.is_some() {
        absences_sql.push_str(" AND ts.date BETWEEN ? AND ?");
    }
    absences_sql.push_str(" ORDER BY ts.date DESC");

    let mut absences_query = sqlx::query_as::<_, AbsenceEntry>(&absences_sql).bind(player_id);
    if let (Some(from), Some(to)) = (from, to) {
        absences_query = absences_query.bind(from).bind(to);
    }
    let absences = absences_query.fetch_all(pool).await?;

    let attendance_rate = if total_sessions > 0 {
        format!("{:.1}", attended as f64 / total_sessions as f64 * 100.0)
    } else {
        "0.0".to_string()
    };

    Ok(PlayerStats {
        total_sessions,
        attended,
        missed: total_sessions - attended,
        attendance_rate,
        absences,
    })
}

fn window_start(days: u64) -> NaiveDate {
    Utc::now()
        .date_naive()
        .checked_sub_days(Days::new(days))
        .unwrap_or_default()
}

fn month_start(date: NaiveDate) -> NaiveDate {
    NaiveDate::from_ymd_opt(date.year(), date.month(), 1).unwrap_or(date)
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
