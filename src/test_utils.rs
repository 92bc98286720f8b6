#[cfg(test)]
pub mod test_utils {
    use crate::config::{AppConfig, build_app_state};
    use crate::router::create_router;
    use crate::schemas::AppState;
    use crate::session::SESSION_COOKIE;
    use axum::http::{HeaderValue, header::SET_COOKIE};
    use axum_test::{TestResponse, TestServer};
    use migration::{Migrator, MigratorTrait};
    use model::entities::user;
    use model::users::NewUser;
    use sea_orm::{Database, DatabaseConnection};
    use tracing_subscriber::EnvFilter;

    pub const TEST_PASSWORD: &str = "password123";

    /// Configuration for tests: in-memory database, CSRF checks off
    pub fn test_config() -> AppConfig {
        AppConfig {
            database_url: "sqlite::memory:".to_string(),
            bind_address: "127.0.0.1:0".to_string(),
            csrf_enabled: false,
            session_ttl_secs: 3600,
            session_capacity: 1000,
        }
    }

    /// Create an in-memory SQLite database for testing
    pub async fn setup_test_db() -> DatabaseConnection {
        let db = Database::connect("sqlite::memory:")
            .await
            .expect("Failed to connect to in-memory database");

        Migrator::up(&db, None)
            .await
            .expect("Failed to run migrations");

        db
    }

    pub async fn setup_test_app_state_with(config: AppConfig) -> AppState {
        init_test_tracing();
        let db = setup_test_db().await;
        build_app_state(db, config).expect("Failed to build app state")
    }

    /// Create AppState for testing
    pub async fn setup_test_app_state() -> AppState {
        setup_test_app_state_with(test_config()).await
    }

    /// A test server over the real router, plus the state behind it
    pub async fn setup_test_server() -> (TestServer, AppState) {
        let state = setup_test_app_state().await;
        let server = TestServer::new(create_router(state.clone())).expect("Failed to start test server");
        (server, state)
    }

    pub async fn create_test_user(state: &AppState, username: &str) -> user::Model {
        let new_user = NewUser {
            username: username.to_string(),
            email: format!("{username}@test.com"),
            password: Some(TEST_PASSWORD.to_string()),
            image_url: None,
        };
        model::users::signup(&state.db, new_user)
            .await
            .expect("Failed to create test user")
    }

    /// Cookie header for a session already logged in as `user_id`
    pub async fn login_cookie(state: &AppState, user_id: i32) -> HeaderValue {
        let session_id = state.sessions.create_for_user(user_id).await;
        cookie_header(&session_id)
    }

    pub fn cookie_header(session_id: &str) -> HeaderValue {
        HeaderValue::from_str(&format!("{SESSION_COOKIE}={session_id}")).expect("valid cookie header")
    }

    /// The session cookie a response set, as a request `Cookie` header
    pub fn session_cookie_from(response: &TestResponse) -> Option<HeaderValue> {
        response
            .headers()
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .filter_map(|value| cookie::Cookie::parse(value.to_string()).ok())
            .find(|c| c.name() == SESSION_COOKIE)
            .map(|c| cookie_header(c.value()))
    }

    /// Initialize tracing for tests with output to STDERR.
    ///
    /// The filter comes from `RUST_LOG` and defaults to `warn`. Only the
    /// first call installs the subscriber.
    fn init_test_tracing() {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .try_init();
    }
}
