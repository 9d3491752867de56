#[cfg(test)]
mod tests {
    use crate::env::{admin_credentials, database_url};
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_database_url_default() {
        temp_env::with_var_unset("DATABASE_URL", || {
            assert_eq!(database_url(), "sqlite://data/attendance.db");
        });
    }

    #[test]
    #[serial]
    fn test_database_url_override() {
        temp_env::with_var("DATABASE_URL", Some("sqlite::memory:"), || {
            assert_eq!(database_url(), "sqlite::memory:");
        });
    }

    #[test]
    #[serial]
    fn test_admin_credentials() {
        temp_env::with_vars(
            [
                ("ADMIN_EMAIL", Some("coach@club.test")),
                ("ADMIN_PASSWORD", Some("s3cret!")),
            ],
            || {
                let (email, password) = admin_credentials();
                assert_eq!(email, "coach@club.test");
                assert_eq!(password, "s3cret!");
            },
        );

        temp_env::with_vars(
            [
                ("ADMIN_EMAIL", None::<&str>),
                ("ADMIN_PASSWORD", None::<&str>),
            ],
            || {
                let (email, _) = admin_credentials();
                assert_eq!(email, "admin@localhost");
            },
        );
    }
}
