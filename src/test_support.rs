use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use crate::core::time::primitive_now_utc;
use crate::core::{config::Settings, redis::RedisHandle, security, state::AppState};
use crate::services::roster::{Roster, RosterError, Student};

const TEST_SECRET_KEY: &str = "test-secret";

pub(crate) async fn env_lock() -> OwnedMutexGuard<()> {
    static LOCK: OnceLock<Arc<Mutex<()>>> = OnceLock::new();
    let lock = LOCK.get_or_init(|| Arc::new(Mutex::new(()))).clone();
    lock.lock_owned().await
}

pub(crate) fn set_test_env() {
    dotenvy::dotenv().ok();

    std::env::set_var("AULAGRADE_ENV", "test");
    std::env::set_var("AULAGRADE_STRICT_CONFIG", "0");
    std::env::set_var("SECRET_KEY", TEST_SECRET_KEY);
    std::env::set_var("PROMETHEUS_ENABLED", "0");
}

/// Fixed roster so tests never reach the external service.
pub(crate) struct StubRoster {
    pub(crate) students: Vec<Student>,
}

#[async_trait]
impl Roster for StubRoster {
    async fn students_for_module(&self, _module_id: &str) -> Result<Vec<Student>, RosterError> {
        Ok(self.students.clone())
    }
}

pub(crate) fn build_state() -> AppState {
    let settings = Settings::load().expect("settings");
    let db = sqlx::PgPool::connect_lazy(&settings.database().database_url()).expect("lazy pool");
    let redis = RedisHandle::new(settings.redis().redis_url());
    let roster = Arc::new(StubRoster { students: Vec::new() });
    AppState::new(settings, db, redis, roster)
}

pub(crate) fn bearer_token(user_id: &str, role: &str, settings: &Settings) -> String {
    security::create_access_token(user_id, role, settings, None).expect("token")
}

/// Connects to the test database and applies migrations. Returns `None` so
/// database-backed tests can skip when no database is reachable.
pub(crate) async fn try_pool() -> Option<sqlx::PgPool> {
    dotenvy::dotenv().ok();

    let url = std::env::var("DATABASE_URL")
        .ok()
        .filter(|url| !url.trim().is_empty())
        .unwrap_or_else(|| {
            let server = std::env::var("POSTGRES_SERVER").unwrap_or_else(|_| "localhost".into());
            let port = std::env::var("POSTGRES_PORT").unwrap_or_else(|_| "5432".into());
            let user = std::env::var("POSTGRES_USER").unwrap_or_else(|_| "aulagrade".into());
            let password = std::env::var("POSTGRES_PASSWORD").unwrap_or_default();
            let db = std::env::var("POSTGRES_DB").unwrap_or_else(|_| "aulagrade_db".into());
            format!("postgresql://{user}:{password}@{server}:{port}/{db}")
        });

    let pool = match sqlx::postgres::PgPoolOptions::new()
        .max_connections(2)
        .acquire_timeout(std::time::Duration::from_secs(5))
        .connect(&url)
        .await
    {
        Ok(pool) => pool,
        Err(err) => {
            eprintln!("skipping database-backed test; database unreachable: {err}");
            return None;
        }
    };

    if let Err(err) = sqlx::migrate!("./migrations").run(&pool).await {
        eprintln!("skipping database-backed test; migrations failed: {err}");
        return None;
    }

    Some(pool)
}

/// Inserts a form work with one free-response question; returns
/// `(work_id, question_id)`. Fresh ids per call so reruns never collide.
pub(crate) async fn seed_form_work(pool: &sqlx::PgPool) -> anyhow::Result<(String, String)> {
    let work_id = Uuid::new_v4().to_string();
    let form_id = Uuid::new_v4().to_string();
    let question_id = Uuid::new_v4().to_string();
    let now = primitive_now_utc();

    sqlx::query(
        "INSERT INTO works (id, module_id, title, kind, is_qualified, date_start, date_limit,
                            form_id, is_revised, created_by, created_at, updated_at)
         VALUES ($1, $2, $3, 'form', FALSE, $4, $5, $6, FALSE, $7, $4, $4)",
    )
    .bind(&work_id)
    .bind("module-test")
    .bind("fixture work")
    .bind(now)
    .bind(now + time::Duration::hours(1))
    .bind(&form_id)
    .bind("teacher-test")
    .execute(pool)
    .await?;

    sqlx::query(
        "INSERT INTO form_questions (id, form_id, kind, title, points, correct_index, order_index)
         VALUES ($1, $2, 'free', $3, 10, NULL, 0)",
    )
    .bind(&question_id)
    .bind(&form_id)
    .bind("fixture question")
    .execute(pool)
    .await?;

    Ok((work_id, question_id))
}
