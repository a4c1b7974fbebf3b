//! Postgres-backed [`UserStore`].

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{
    postgres::{PgPoolOptions, PgRow},
    Connection, PgPool, Row,
};
use std::{sync::Arc, time::Duration};
use tokio::sync::OnceCell;
use tracing::{info, info_span, Instrument, Span};
use uuid::Uuid;

use super::{InsertOutcome, NewUser, User, UserStore};

const SCHEMA_SQL: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/sql/schema.sql"));

const USER_COLUMNS: &str = "id, email, username, name, image, password_hash, is_admin, \
     email_verified, verify_token, reset_token, reset_token_expiry, reset_last_sent, \
     created_at, updated_at";

/// Process-wide database handle.
///
/// The pool is created on first use and reused for the life of the process.
/// `pool()` is the only place a connection is ever established.
pub struct Database {
    dsn: String,
    pool: OnceCell<PgPool>,
}

impl Database {
    #[must_use]
    pub fn new(dsn: String) -> Self {
        Self {
            dsn,
            pool: OnceCell::new(),
        }
    }

    /// Return the shared pool, connecting and applying the schema on first call.
    ///
    /// # Errors
    /// Returns an error if the connection or schema setup fails. A failed attempt
    /// leaves the cell empty so the next caller retries.
    pub async fn pool(&self) -> Result<&PgPool> {
        self.pool
            .get_or_try_init(|| async {
                let pool = PgPoolOptions::new()
                    .min_connections(1)
                    .max_connections(5)
                    .max_lifetime(Duration::from_secs(60 * 2))
                    .test_before_acquire(true)
                    .connect(&self.dsn)
                    .await
                    .context("Failed to connect to database")?;

                sqlx::raw_sql(SCHEMA_SQL)
                    .execute(&pool)
                    .await
                    .context("Failed to apply database schema")?;

                info!("Database pool initialized");
                Ok(pool)
            })
            .await
    }
}

pub struct PgUserStore {
    db: Arc<Database>,
}

impl PgUserStore {
    #[must_use]
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    async fn fetch_one_by(&self, column: &str, value: &str) -> Result<Option<User>> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE {column} = $1");
        let row = sqlx::query(&query)
            .bind(value)
            .fetch_optional(self.db.pool().await?)
            .instrument(query_span("SELECT", &query))
            .await
            .with_context(|| format!("failed to lookup user by {column}"))?;
        row.as_ref().map(user_from_row).transpose()
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let row = sqlx::query(&query)
            .bind(id)
            .fetch_optional(self.db.pool().await?)
            .instrument(query_span("SELECT", &query))
            .await
            .context("failed to lookup user by id")?;
        row.as_ref().map(user_from_row).transpose()
    }

    async fn find_by_login(&self, identifier: &str) -> Result<Option<User>> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1 OR username = $1");
        let row = sqlx::query(&query)
            .bind(identifier)
            .fetch_optional(self.db.pool().await?)
            .instrument(query_span("SELECT", &query))
            .await
            .context("failed to lookup login record")?;
        row.as_ref().map(user_from_row).transpose()
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        self.fetch_one_by("email", email).await
    }

    async fn find_conflict(&self, email: &str, username: &str) -> Result<Option<User>> {
        let query = format!(
            "SELECT {USER_COLUMNS} FROM users \
             WHERE lower(email) = lower($1) OR lower(username) = lower($2) LIMIT 1"
        );
        let row = sqlx::query(&query)
            .bind(email)
            .bind(username)
            .fetch_optional(self.db.pool().await?)
            .instrument(query_span("SELECT", &query))
            .await
            .context("failed to check for conflicting users")?;
        row.as_ref().map(user_from_row).transpose()
    }

    async fn insert(&self, user: NewUser) -> Result<InsertOutcome> {
        let query = format!(
            "INSERT INTO users \
                (id, email, username, name, image, password_hash, email_verified, verify_token) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             RETURNING {USER_COLUMNS}"
        );
        let result = sqlx::query(&query)
            .bind(Uuid::new_v4())
            .bind(&user.email)
            .bind(&user.username)
            .bind(&user.name)
            .bind(&user.image)
            .bind(&user.password_hash)
            .bind(user.email_verified)
            .bind(&user.verify_token)
            .fetch_one(self.db.pool().await?)
            .instrument(query_span("INSERT", &query))
            .await;

        match result {
            Ok(row) => Ok(InsertOutcome::Created(user_from_row(&row)?)),
            Err(err) if is_unique_violation(&err) => Ok(InsertOutcome::Conflict),
            Err(err) => Err(err).context("failed to insert user"),
        }
    }

    async fn find_by_verify_token(&self, token: &str) -> Result<Option<User>> {
        self.fetch_one_by("verify_token", token).await
    }

    async fn find_by_reset_token(&self, token: &str) -> Result<Option<User>> {
        self.fetch_one_by("reset_token", token).await
    }

    async fn mark_email_verified(&self, id: Uuid, now: DateTime<Utc>) -> Result<()> {
        let query = r"
            UPDATE users
            SET email_verified = $2,
                updated_at = $2
            WHERE id = $1 AND email_verified IS NULL
        ";
        sqlx::query(query)
            .bind(id)
            .bind(now)
            .execute(self.db.pool().await?)
            .instrument(query_span("UPDATE", query))
            .await
            .context("failed to mark email verified")?;
        Ok(())
    }

    async fn store_reset_token(
        &self,
        id: Uuid,
        token: &str,
        expiry: DateTime<Utc>,
        last_sent: DateTime<Utc>,
    ) -> Result<()> {
        let query = r"
            UPDATE users
            SET reset_token = $2,
                reset_token_expiry = $3,
                reset_last_sent = $4,
                updated_at = $4
            WHERE id = $1
        ";
        sqlx::query(query)
            .bind(id)
            .bind(token)
            .bind(expiry)
            .bind(last_sent)
            .execute(self.db.pool().await?)
            .instrument(query_span("UPDATE", query))
            .await
            .context("failed to store reset token")?;
        Ok(())
    }

    async fn complete_password_reset(
        &self,
        id: Uuid,
        token: &str,
        password_hash: &str,
    ) -> Result<bool> {
        let query = r"
            UPDATE users
            SET password_hash = $3,
                reset_token = NULL,
                reset_token_expiry = NULL,
                updated_at = NOW()
            WHERE id = $1 AND reset_token = $2
        ";
        let result = sqlx::query(query)
            .bind(id)
            .bind(token)
            .bind(password_hash)
            .execute(self.db.pool().await?)
            .instrument(query_span("UPDATE", query))
            .await
            .context("failed to complete password reset")?;
        Ok(result.rows_affected() == 1)
    }

    async fn ping(&self) -> Result<()> {
        let pool = self.db.pool().await?;
        let mut conn = pool
            .acquire()
            .instrument(info_span!(
                "db.acquire",
                db.system = "postgresql",
                db.operation = "ACQUIRE"
            ))
            .await
            .context("failed to acquire database connection")?;
        conn.ping()
            .instrument(info_span!(
                "db.ping",
                db.system = "postgresql",
                db.operation = "PING"
            ))
            .await
            .context("failed to ping database")
    }
}

fn query_span(operation: &str, statement: &str) -> Span {
    info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = operation,
        db.statement = statement
    )
}

fn user_from_row(row: &PgRow) -> Result<User> {
    Ok(User {
        id: row.try_get("id")?,
        email: row.try_get("email")?,
        username: row.try_get("username")?,
        name: row.try_get("name")?,
        image: row.try_get("image")?,
        password_hash: row.try_get("password_hash")?,
        is_admin: row.try_get("is_admin")?,
        email_verified: row.try_get("email_verified")?,
        verify_token: row.try_get("verify_token")?,
        reset_token: row.try_get("reset_token")?,
        reset_token_expiry: row.try_get("reset_token_expiry")?,
        reset_last_sent: row.try_get("reset_last_sent")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().is_some_and(|code| code.as_ref() == "23505"),
        _ => false,
    }
}
