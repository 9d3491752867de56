use std::collections::HashMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::{Pool, Sqlite};
use tracing::{info, instrument};

use crate::error::AppError;
use crate::models::Category;

const NO_REASON: &str = "No reason given";

#[derive(Debug, Deserialize, Serialize, Default, Clone)]
pub struct ReportFilters {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub category: Option<Category>,
    pub player_id: Option<i64>,
}

/// One attendance fact joined with its player and session, the flat shape the
/// report is computed from and the detail sheet renders as-is.
#[derive(Debug, Serialize, Clone, sqlx::FromRow)]
pub struct ReportRow {
    pub player_id: i64,
    pub name: String,
    pub last_name: String,
    pub category: String,
    pub position: Option<String>,
    pub date: NaiveDate,
    pub training_name: Option<String>,
    pub attended: bool,
    pub absence_reason: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PlayerSummary {
    pub player_id: i64,
    pub name: String,
    pub last_name: String,
    pub category: String,
    pub position: Option<String>,
    pub total: u32,
    pub attended: u32,
    pub missed: u32,
    pub attendance_rate: String,
    pub absences: Vec<ReportAbsence>,
}

#[derive(Debug, Serialize)]
pub struct ReportAbsence {
    pub date: NaiveDate,
    pub reason: String,
}

#[derive(Debug, Serialize)]
pub struct ReportPeriod {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

/// Everything a renderer needs for one attendance report. Byte-level layout
/// (PDF, spreadsheet) happens outside the core.
#[derive(Debug, Serialize)]
pub struct AttendanceReport {
    pub summary: Vec<PlayerSummary>,
    pub details: Vec<ReportRow>,
    pub period: ReportPeriod,
    pub filters: ReportFilters,
}

/// Groups the flat rows by player, in the order players first appear, and
/// computes each player's totals. Rows arrive ordered by last_name/name/date,
/// so both the summary and each absence list come out already sorted.
pub fn build_player_summaries(rows: &[ReportRow]) -> Vec<PlayerSummary> {
    let mut summaries: Vec<PlayerSummary> = Vec::new();
    let mut index: HashMap<i64, usize> = HashMap::new();

    for row in rows {
        let i = *index.entry(row.player_id).or_insert_with(|| {
            summaries.push(PlayerSummary {
                player_id: row.player_id,
                name: row.name.clone(),
                last_name: row.last_name.clone(),
                category: row.category.clone(),
                position: row.position.clone(),
                total: 0,
                attended: 0,
                missed: 0,
                attendance_rate: String::new(),
                absences: Vec::new(),
            });
            summaries.len() - 1
        });

        let summary = &mut summaries[i];
        summary.total += 1;
        if row.attended {
            summary.attended += 1;
        } else {
            summary.absences.push(ReportAbsence {
                date: row.date,
                reason: row
                    .absence_reason
                    .clone()
                    .unwrap_or_else(|| NO_REASON.to_string()),
            });
        }
    }

    for summary in &mut summaries {
        summary.missed = summary.total - summary.attended;
        summary.attendance_rate = if summary.total > 0 {
            format!(
                "{:.1}",
                f64::from(summary.attended) / f64::from(summary.total) * 100.0
            )
        } else {
            "0.0".to_string()
        };
    }

    summaries
}

#[instrument(skip(pool, filters))]
pub async fn get_attendance_report(
    pool: &Pool<Sqlite>,
    user_id: i64,
    filters: &ReportFilters,
) -> Result<AttendanceReport, AppError> {
    info!("Building attendance report");

    let mut sql = String::from(
        "SELECT p.id AS player_id, p.name, p.last_name, p.category, p.position,
                ts.date, t.name AS training_name, a.attended, a.absence_reason
         FROM attendance a
         JOIN players p ON a.player_id = p.id
         JOIN training_sessions ts ON a.session_id = ts.id
         LEFT JOIN trainings t ON ts.training_id = t.id
         WHERE ts.user_id = ?",
    );

    if filters.from.is_some() {
        sql.push_str(" AND ts.date >= ?");
    }
    if filters.to.is_some() {
        sql.push_str(" AND ts.date <= ?");
    }
    if filters.category.is_some() {
        sql.push_str(" AND p.category = ?");
    }
    if filters.player_id.is_some() {
        sql.push_str(" AND p.id = ?");
    }
    sql.push_str(" ORDER BY p.last_name, p.name, ts.date");

    let mut query = sqlx::query_as::<_, ReportRow>(&sql).bind(user_id);
    if let Some(from) = filters.from {
        query = query.bind(from);
    }
    if let Some(to) = filters.to {
        query = query.bind(to);
    }
    if let Some(category) = filters.category {
        query = query.bind(category.as_str().to_string());
    }
    if let Some(player_id) = filters.player_id {
        query = query.bind(player_id);
    }

    let details = query.fetch_all(pool).await?;
    let summary = build_player_summaries(&details);

    Ok(AttendanceReport {
        summary,
        details,
        period: ReportPeriod {
            from: filters.from,
            to: filters.to,
        },
        filters: filters.clone(),
    })
}
