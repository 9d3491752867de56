#[cfg(test)]
pub mod test_db {
    use crate::db::{create_player, create_training, create_user, resolve_session};
    use crate::error::AppError;
    use crate::migrations::run_migrations;
    use crate::models::{Category, Role};
    use crate::schema::BASE_SCHEMA;
    use crate::validation::{NewPlayer, NewTraining, NewUser, SessionRequest};
    use chrono::NaiveDate;
    use sqlx::{Pool, Sqlite, SqlitePool};
    use std::collections::HashMap;
    use std::sync::Once;

    static INIT: Once = Once::new();
    static STANDARD_PASSWORD: &str = "password123";

    #[derive(Default)]
    pub struct TestDbBuilder {
        tenants: Vec<TestTenant>,
        players: Vec<TestPlayer>,
        trainings: Vec<TestTraining>,
        sessions: Vec<TestSession>,
    }

    pub struct TestTenant {
        pub email: String,
        pub role: Role,
    }

    pub struct TestPlayer {
        pub name: String,
        pub last_name: String,
        pub category: Category,
        pub owner_email: Option<String>,
    }

    pub struct TestTraining {
        pub name: String,
        pub day_of_week: i64,
        pub start_time: String,
        pub end_time: String,
        pub owner_email: Option<String>,
    }

    pub struct TestSession {
        pub date: NaiveDate,
        pub training_name: Option<String>,
        pub owner_email: Option<String>,
    }

    impl TestDbBuilder {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn tenant(mut self, email: &str) -> Self {
            self.tenants.push(TestTenant {
                email: email.to_string(),
                role: Role::User,
            });
            self
        }

        pub fn admin(mut self, email: &str) -> Self {
            self.tenants.push(TestTenant {
                email: email.to_string(),
                role: Role::Admin,
            });
            self
        }

        pub fn player(mut self, name: &str, last_name: &str, category: Category) -> Self {
            self.players.push(TestPlayer {
                name: name.to_string(),
                last_name: last_name.to_string(),
                category,
                owner_email: None,
            });
            self
        }

        pub fn player_owned_by(
            mut self,
            name: &str,
            last_name: &str,
            category: Category,
            owner_email: &str,
        ) -> Self {
            self.players.push(TestPlayer {
                name: name.to_string(),
                last_name: last_name.to_string(),
                category,
                owner_email: Some(owner_email.to_string()),
            });
            self
        }

        pub fn training(mut self, name: &str, day_of_week: i64, start: &str, end: &str) -> Self {
            self.trainings.push(TestTraining {
                name: name.to_string(),
                day_of_week,
                start_time: start.to_string(),
                end_time: end.to_string(),
                owner_email: None,
            });
            self
        }

        pub fn session(mut self, date: NaiveDate) -> Self {
            self.sessions.push(TestSession {
                date,
                training_name: None,
                owner_email: None,
            });
            self
        }

        pub fn session_owned_by(mut self, date: NaiveDate, owner_email: &str) -> Self {
            self.sessions.push(TestSession {
                date,
                training_name: None,
                owner_email: Some(owner_email.to_string()),
            });
            self
        }

        pub async fn build(self) -> Result<TestDb, AppError> {
            INIT.call_once(|| {
                let _ = env_logger::builder().is_test(true).try_init();
            });

            let pool = SqlitePool::connect("sqlite::memory:").await?;

            sqlx::raw_sql(BASE_SCHEMA).execute(&pool).await?;
            run_migrations(&pool).await?;

            let mut user_id_map: HashMap<String, i64> = HashMap::new();
            let mut player_id_map: HashMap<String, i64> = HashMap::new();
            let mut training_id_map: HashMap<String, i64> = HashMap::new();
            let mut session_id_map: HashMap<NaiveDate, i64> = HashMap::new();

            for tenant in &self.tenants {
                let user = create_user(
                    &pool,
                    &NewUser {
                        email: tenant.email.clone(),
                        password: STANDARD_PASSWORD.to_string(),
                        name: tenant.email.clone(),
                        role: tenant.role,
                    },
                )
                .await?;

                user_id_map.insert(tenant.email.clone(), user.id);
            }

            let first_tenant_id = self
                .tenants
                .first()
                .and_then(|t| user_id_map.get(&t.email).copied());

            for player in &self.players {
                let owner_id = match &player.owner_email {
                    Some(email) => user_id_map.get(email).copied(),
                    None => first_tenant_id,
                };

                if let Some(owner_id) = owner_id {
                    let created = create_player(
                        &pool,
                        owner_id,
                        &NewPlayer {
                            name: player.name.clone(),
                            last_name: player.last_name.clone(),
                            category: player.category,
                            phone: None,
                            position: None,
                            birth_date: None,
                        },
                    )
                    .await?;

                    player_id_map.insert(player.name.clone(), created.id);
                }
            }

            for training in &self.trainings {
                let owner_id = match &training.owner_email {
                    Some(email) => user_id_map.get(email).copied(),
                    None => first_tenant_id,
                };

                if let Some(owner_id) = owner_id {
                    let created = create_training(
                        &pool,
                        owner_id,
                        &NewTraining {
                            day_of_week: training.day_of_week,
                            start_time: training.start_time.clone(),
                            end_time: training.end_time.clone(),
                            name: Some(training.name.clone()),
                        },
                    )
                    .await?;

                    training_id_map.insert(training.name.clone(), created.id);
                }
            }

            for session in &self.sessions {
                let owner_id = match &session.owner_email {
                    Some(email) => user_id_map.get(email).copied(),
                    None => first_tenant_id,
                };

                let training_id = session
                    .training_name
                    .as_ref()
                    .and_then(|name| training_id_map.get(name).copied());

                if let Some(owner_id) = owner_id {
                    let created = resolve_session(
                        &pool,
                        owner_id,
                        &SessionRequest {
                            date: session.date,
                            training_id,
                            notes: None,
                        },
                    )
                    .await?;

                    session_id_map.insert(session.date, created.id);
                }
            }

            Ok(TestDb {
                pool,
                user_id_map,
                player_id_map,
                training_id_map,
                session_id_map,
            })
        }
    }

    pub struct TestDb {
        pub pool: Pool<Sqlite>,
        pub user_id_map: HashMap<String, i64>,
        pub player_id_map: HashMap<String, i64>,
        pub training_id_map: HashMap<String, i64>,
        pub session_id_map: HashMap<NaiveDate, i64>,
    }

    impl TestDb {
        pub fn user_id(&self, email: &str) -> Option<i64> {
            self.user_id_map.get(email).copied()
        }

        pub fn player_id(&self, name: &str) -> Option<i64> {
            self.player_id_map.get(name).copied()
        }

        pub fn training_id(&self, name: &str) -> Option<i64> {
            self.training_id_map.get(name).copied()
        }

        pub fn session_id(&self, date: NaiveDate) -> Option<i64> {
            self.session_id_map.get(&date).copied()
        }

        pub async fn attendance_count(&self, session_id: i64) -> Result<i64, sqlx::Error> {
            sqlx::query_scalar("SELECT COUNT(*) FROM attendance WHERE session_id = ?")
                .bind(session_id)
                .fetch_one(&self.pool)
                .await
        }

        pub async fn attendance_row(
            &self,
            session_id: i64,
            player_id: i64,
        ) -> Result<Option<(bool, Option<String>)>, sqlx::Error> {
            sqlx::query_as(
                "SELECT attended, absence_reason FROM attendance
                 WHERE session_id = ? AND player_id = ?",
            )
            .bind(session_id)
            .bind(player_id)
            .fetch_optional(&self.pool)
            .await
        }
    }

    pub fn date(s: &str) -> NaiveDate {
        s.parse().expect("Invalid test date")
    }

    pub fn days_ago(days: u64) -> NaiveDate {
        chrono::Utc::now()
            .date_naive()
            .checked_sub_days(chrono::Days::new(days))
            .expect("Date out of range")
    }
}
