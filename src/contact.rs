use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use sqlx::{Pool, Postgres};

/// Submission cap per address, enforced with the fixed window gate
pub const CONTACT_WINDOW_MAX_SUBMISSIONS: u32 = 5;
pub const CONTACT_WINDOW_SECONDS: i64 = 3600;

#[derive(Debug, Clone, Deserialize)]
pub struct ContactSubmission {
    pub name: String,
    pub email: String,
    pub message: String,
}

/// Where contact submissions end up. The handler shields clients
/// from persistence failures, so implementations just report them.
#[async_trait]
pub trait ContactStore: Send + Sync {
    async fn save(&self, submission: &ContactSubmission) -> anyhow::Result<()>;
}

pub struct PgContactStore {
    pool: Pool<Postgres>,
}

impl PgContactStore {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ContactStore for PgContactStore {
    async fn save(&self, submission: &ContactSubmission) -> anyhow::Result<()> {
        sqlx::query(
            "INSERT INTO contact_message (name, email, message, created_at) VALUES ($1, $2, $3, $4)",
        )
        .bind(&submission.name)
        .bind(&submission.email)
        .bind(&submission.message)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
