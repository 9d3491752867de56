#[cfg(test)]
mod tests {
    use crate::{
        db::{
            get_session_detail, get_sessions, record_attendance, record_confirmation,
            resolve_session,
        },
        models::ConfirmationStatus,
        test::utils::test_db::{TestDbBuilder, date, days_ago},
        validation::{AttendanceInput, ConfirmationInput, SessionRequest},
    };
    use crate::models::Category;

    #[tokio::test]
    async fn test_resolve_session_idempotent() {
        let test_db = TestDbBuilder::new()
            .tenant("coach@club.test")
            .build()
            .await
            .expect("Failed to build test database");

        let tenant = test_db.user_id("coach@club.test").expect("User not found");
        let request = SessionRequest {
            date: date("2025-03-10"),
            training_id: None,
            notes: Some("scrimmage".to_string()),
        };

        let first = resolve_session(&test_db.pool, tenant, &request)
            .await
            .expect("Failed to resolve session");
        let second = resolve_session(&test_db.pool, tenant, &request)
            .await
            .expect("Failed to resolve session again");

        assert_eq!(first.id, second.id, "Same parameters must yield the same session");
        assert_eq!(second.notes.as_deref(), Some("scrimmage"));

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM training_sessions")
            .fetch_one(&test_db.pool)
            .await
            .expect("Failed to count sessions");
        assert_eq!(count, 1, "Repeated resolution must not create duplicates");
    }

    #[tokio::test]
    async fn test_resolve_session_per_template() {
        let test_db = TestDbBuilder::new()
            .tenant("coach@club.test")
            .training("Monday practice", 1, "19:00", "21:00")
            .training("Monday gym", 1, "17:00", "18:30")
            .build()
            .await
            .expect("Failed to build test database");

        let tenant = test_db.user_id("coach@club.test").expect("User not found");
        let practice = test_db
            .training_id("Monday practice")
            .expect("Training not found");
        let gym = test_db.training_id("Monday gym").expect("Training not found");

        let practice_session = resolve_session(
            &test_db.pool,
            tenant,
            &SessionRequest {
                date: date("2025-03-10"),
                training_id: Some(practice),
                notes: None,
            },
        )
        .await
        .expect("Failed to resolve practice session");

        let gym_session = resolve_session(
            &test_db.pool,
            tenant,
            &SessionRequest {
                date: date("2025-03-10"),
                training_id: Some(gym),
                notes: None,
            },
        )
        .await
        .expect("Failed to resolve gym session");

        assert_ne!(
            practice_session.id, gym_session.id,
            "Different templates on one date are distinct sessions"
        );

        let dateless = resolve_session(
            &test_db.pool,
            tenant,
            &SessionRequest {
                date: date("2025-03-10"),
                training_id: None,
                notes: None,
            },
        )
        .await
        .expect("Failed to resolve session without template");

        assert!(
            dateless.id == practice_session.id || dateless.id == gym_session.id,
            "Without a template the lookup matches on date alone"
        );

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM training_sessions")
            .fetch_one(&test_db.pool)
            .await
            .expect("Failed to count sessions");
        assert_eq!(count, 2, "The date-only lookup must not create a third session");
    }

    #[tokio::test]
    async fn test_resolve_session_isolated_per_tenant() {
        let test_db = TestDbBuilder::new()
            .tenant("coach_a@club.test")
            .tenant("coach_b@club.test")
            .build()
            .await
            .expect("Failed to build test database");

        let tenant_a = test_db.user_id("coach_a@club.test").expect("User not found");
        let tenant_b = test_db.user_id("coach_b@club.test").expect("User not found");

        let request = SessionRequest {
            date: date("2025-03-10"),
            training_id: None,
            notes: None,
        };

        let session_a = resolve_session(&test_db.pool, tenant_a, &request)
            .await
            .expect("Failed to resolve session for tenant A");
        let session_b = resolve_session(&test_db.pool, tenant_b, &request)
            .await
            .expect("Failed to resolve session for tenant B");

        assert_ne!(
            session_a.id, session_b.id,
            "Each tenant gets their own session for the same date"
        );
    }

    #[tokio::test]
    async fn test_session_detail() {
        let test_db = TestDbBuilder::new()
            .tenant("coach@club.test")
            .player("Ana", "Garcia", Category::Senior)
            .player("Maria", "Lopez", Category::Senior)
            .player("Lucia", "Blanco", Category::Juvenil)
            .training("Monday practice", 1, "19:00", "21:00")
            .build()
            .await
            .expect("Failed to build test database");

        let tenant = test_db.user_id("coach@club.test").expect("User not found");
        let training_id = test_db
            .training_id("Monday practice")
            .expect("Training not found");

        let session = resolve_session(
            &test_db.pool,
            tenant,
            &SessionRequest {
                date: date("2025-03-10"),
                training_id: Some(training_id),
                notes: None,
            },
        )
        .await
        .expect("Failed to resolve session");

        record_attendance(
            &test_db.pool,
            tenant,
            &AttendanceInput {
                session_id: session.id,
                player_id: test_db.player_id("Ana").expect("Player not found"),
                attended: true,
                absence_reason: None,
            },
        )
        .await
        .expect("Failed to record attendance");

        record_confirmation(
            &test_db.pool,
            tenant,
            &ConfirmationInput {
                session_id: session.id,
                player_id: test_db.player_id("Maria").expect("Player not found"),
                status: ConfirmationStatus::Declined,
                notes: Some("travelling".to_string()),
            },
        )
        .await
        .expect("Failed to record confirmation");

        let detail = get_session_detail(&test_db.pool, tenant, session.id)
            .await
            .expect("Failed to get session detail");

        assert_eq!(detail.session.training_name.as_deref(), Some("Monday practice"));
        assert_eq!(detail.session.start_time.as_deref(), Some("19:00"));

        assert_eq!(detail.attendance.len(), 1);
        assert_eq!(detail.attendance[0].name, "Ana");

        assert_eq!(
            detail.pending_players.len(),
            2,
            "Active players without an attendance row are pending"
        );
        assert_eq!(detail.pending_players[0].last_name, "Blanco");

        assert_eq!(detail.confirmations.len(), 1);
        assert_eq!(detail.confirmations[0].status, ConfirmationStatus::Declined);
    }

    #[tokio::test]
    async fn test_get_sessions_filters() {
        let test_db = TestDbBuilder::new()
            .tenant("coach@club.test")
            .session(days_ago(10))
            .session(days_ago(5))
            .session(days_ago(1))
            .build()
            .await
            .expect("Failed to build test database");

        let tenant = test_db.user_id("coach@club.test").expect("User not found");

        let all = get_sessions(&test_db.pool, tenant, None, None, None)
            .await
            .expect("Failed to get sessions");
        assert_eq!(all.len(), 3);
        assert!(
            all[0].date > all[2].date,
            "Sessions should come back most recent first"
        );

        let recent = get_sessions(&test_db.pool, tenant, Some(days_ago(6)), None, None)
            .await
            .expect("Failed to get recent sessions");
        assert_eq!(recent.len(), 2);

        let windowed = get_sessions(
            &test_db.pool,
            tenant,
            Some(days_ago(6)),
            Some(days_ago(3)),
            None,
        )
        .await
        .expect("Failed to get windowed sessions");
        assert_eq!(windowed.len(), 1);
        assert_eq!(windowed[0].date, days_ago(5));
    }
}
