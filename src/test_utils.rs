#[cfg(test)]
pub mod test_utils {
    use crate::schemas::AppState;
    use migration::{Migrator, MigratorTrait};
    use model::accounts::{self, NewAccount};
    use model::entities::account::AccountRole;
    use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection};
    use tracing::Level;
    use tracing_subscriber::FmtSubscriber;

    /// Password shared by every seeded test account.
    pub const TEST_PASSWORD: &str = "correct horse";

    /// Create an in-memory SQLite database for testing
    pub async fn setup_test_db() -> DatabaseConnection {
        // A single pooled connection keeps the in-memory database alive
        // across queries.
        let mut options = ConnectOptions::new("sqlite::memory:");
        options.max_connections(1);
        let db = Database::connect(options)
            .await
            .expect("Failed to connect to in-memory database");

        db.execute_unprepared("PRAGMA foreign_keys = ON;")
            .await
            .expect("Failed to enable foreign keys");

        // Run migrations
        Migrator::up(&db, None)
            .await
            .expect("Failed to run migrations");

        db
    }

    /// Create AppState for testing, seeded with one account per role.
    pub async fn setup_test_app_state() -> AppState {
        let _ = init_test_tracing();
        let db = setup_test_db().await;

        seed_account(&db, "admin", "admin@school.test", AccountRole::Admin).await;
        seed_account(&db, "staff", "staff@school.test", AccountRole::Staff).await;
        seed_account(
            &db,
            "librarian",
            "librarian@school.test",
            AccountRole::Librarian,
        )
        .await;

        AppState { db }
    }

    async fn seed_account(
        db: &DatabaseConnection,
        username: &str,
        email: &str,
        role: AccountRole,
    ) {
        accounts::create_account(
            db,
            NewAccount {
                username: username.to_string(),
                first_name: "Test".to_string(),
                last_name: "Account".to_string(),
                email: email.to_string(),
                password: TEST_PASSWORD.to_string(),
                phone_number: None,
                address: None,
                role,
            },
        )
        .await
        .expect("Failed to seed test account");
    }

    /// Initialize tracing for tests with output to STDERR.
    ///
    /// The log level is determined by the RUST_LOG environment variable,
    /// defaulting to WARN if not set.
    fn init_test_tracing() -> tracing::subscriber::DefaultGuard {
        let log_level = std::env::var("RUST_LOG")
            .ok()
            .and_then(|level| match level.to_uppercase().as_str() {
                "ERROR" => Some(Level::ERROR),
                "WARN" => Some(Level::WARN),
                "INFO" => Some(Level::INFO),
                "DEBUG" => Some(Level::DEBUG),
                "TRACE" => Some(Level::TRACE),
                _ => None,
            })
            .unwrap_or(Level::WARN);

        let subscriber = FmtSubscriber::builder()
            .with_max_level(log_level)
            .with_writer(std::io::stderr) // Output to stderr, which is captured by tests
            .finish();
        tracing::subscriber::set_default(subscriber)
    }
}
