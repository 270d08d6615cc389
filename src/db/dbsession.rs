use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::Error as SqlxError;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};

use crate::live::{SessionRecord, StoreError, StoreProvider, TextStore};

const CREATE_SESSIONS_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS live_sessions (
        session_id VARCHAR(64) PRIMARY KEY,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
"#;

const CREATE_SHARED_CODE_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS shared_code (
        session_id VARCHAR(64) PRIMARY KEY REFERENCES live_sessions (session_id),
        code TEXT NOT NULL,
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
"#;

const UPSERT_CODE: &str = r#"
    INSERT INTO shared_code (session_id, code, updated_at)
    VALUES ($1, $2, NOW())
    ON CONFLICT (session_id)
    DO UPDATE SET code = EXCLUDED.code, updated_at = EXCLUDED.updated_at
"#;

/// Session row from database
#[derive(Debug, Clone, sqlx::FromRow)]
struct SessionRow {
    session_id: String,
    created_at: DateTime<Utc>,
}

impl From<SessionRow> for SessionRecord {
    fn from(row: SessionRow) -> Self {
        SessionRecord {
            session_id: row.session_id,
            created_at: row.created_at,
        }
    }
}

/// PostgreSQL backed session storage
#[derive(Clone)]
pub struct DbSession {
    pool: PgPool,
}

impl DbSession {
    /// Create a new database connection pool
    ///
    /// # Arguments
    /// * `database_url` - PostgreSQL connection string
    /// * `max_connections` - Upper bound for the pool
    pub async fn new(database_url: &str, max_connections: u32) -> Result<Self, SqlxError> {
        info!("Connecting to database...");

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(2) // Keep some connections alive
            .acquire_timeout(Duration::from_secs(30))
            .idle_timeout(Duration::from_secs(600)) // Close idle connections after 10 minutes
            .max_lifetime(Duration::from_secs(1800)) // Recycle connections after 30 minutes
            .connect(database_url)
            .await?;

        info!("Database connection pool created successfully");

        Ok(Self { pool })
    }

    /// Create the session tables if they do not exist yet
    pub async fn ensure_schema(&self) -> Result<(), SqlxError> {
        sqlx::query(CREATE_SESSIONS_TABLE).execute(&self.pool).await?;
        sqlx::query(CREATE_SHARED_CODE_TABLE).execute(&self.pool).await?;
        info!("Database schema ready");
        Ok(())
    }
}

#[async_trait]
impl TextStore for DbSession {
    async fn save(&self, session_id: &str, text: &str) -> Result<(), StoreError> {
        sqlx::query(UPSERT_CODE)
            .bind(session_id)
            .bind(text)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                error!(session_id, "Failed to save code: {}", e);
                StoreError::Database(e)
            })?;
        debug!(session_id, bytes = text.len(), "Code saved");
        Ok(())
    }

    async fn load(&self, session_id: &str) -> Result<Option<String>, StoreError> {
        let code = sqlx::query_scalar::<_, String>("SELECT code FROM shared_code WHERE session_id = $1")
            .bind(session_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(code)
    }
}

#[async_trait]
impl StoreProvider for DbSession {
    async fn create_session(&self, session_id: &str) -> Result<SessionRecord, StoreError> {
        let row = sqlx::query_as::<_, SessionRow>(
            r#"
            INSERT INTO live_sessions (session_id)
            VALUES ($1)
            ON CONFLICT (session_id) DO UPDATE SET session_id = EXCLUDED.session_id
            RETURNING session_id, created_at
            "#,
        )
        .bind(session_id)
        .fetch_one(&self.pool)
        .await?;

        info!(session_id, "Session provisioned");
        Ok(row.into())
    }

    async fn describe(&self, session_id: &str) -> Result<SessionRecord, StoreError> {
        sqlx::query_as::<_, SessionRow>(
            "SELECT session_id, created_at FROM live_sessions WHERE session_id = $1",
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await?
        .map(SessionRecord::from)
        .ok_or_else(|| StoreError::NotFound(session_id.to_string()))
    }

    async fn open(&self, session_id: &str) -> Result<Arc<dyn TextStore>, StoreError> {
        self.describe(session_id).await?;
        Ok(Arc::new(self.clone()))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
