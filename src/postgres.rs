use std::time::Duration;

use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, PgPool};
use tracing::info;

use crate::{
    auth::UserDatabase,
    error::DatabaseError,
    types::{CredentialRecord, HashedPassword, InsertOutcome, UserID, Username},
};

// The UNIQUE constraint on username is what makes concurrent registration safe.
const CREATE_USERS_TABLE: &str = "CREATE TABLE IF NOT EXISTS users (
    user_id TEXT PRIMARY KEY,
    username TEXT NOT NULL UNIQUE,
    password_hash TEXT NOT NULL
)";

pub struct PgUserDatabase {
    pool: PgPool,
}

impl PgUserDatabase {
    pub async fn connect(url: &str) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .acquire_timeout(Duration::from_secs(5))
            .connect(url)
            .await?;

        sqlx::query(CREATE_USERS_TABLE).execute(&pool).await?;
        info!("postgres user store ready");

        Ok(Self { pool })
    }
}

#[async_trait]
impl UserDatabase for PgUserDatabase {
    async fn insert_user_if_absent(
        &self,
        record: &CredentialRecord,
    ) -> Result<InsertOutcome, DatabaseError> {
        let result = sqlx::query(
            "INSERT INTO users (user_id, username, password_hash) VALUES ($1, $2, $3)
             ON CONFLICT (username) DO NOTHING",
        )
        .bind(&record.user_id.0)
        .bind(&record.username.0)
        .bind(&record.password_hash.0)
        .execute(&self.pool)
        .await?;

        Ok(if result.rows_affected() == 1 {
            InsertOutcome::Inserted
        } else {
            InsertOutcome::AlreadyExists
        })
    }

    async fn find_user(
        &self,
        username: &Username,
    ) -> Result<Option<CredentialRecord>, DatabaseError> {
        let row: Option<(String, String, String)> = sqlx::query_as(
            "SELECT user_id, username, password_hash FROM users WHERE username = $1",
        )
        .bind(&username.0)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(user_id, username, password_hash)| CredentialRecord {
            user_id: UserID(user_id),
            username: Username(username),
            password_hash: HashedPassword(password_hash),
        }))
    }
}
