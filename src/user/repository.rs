//! Handle database requests.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use crate::error::{Result, ServerError};
use crate::user::User;

const USER_COLUMNS: &str = "u.id, u.email, u.password_hash, u.name, u.phone, u.address, u.verified, u.signup_date, u.last_login";

#[derive(Clone)]
pub struct UserRepository {
    pool: SqlitePool,
}

impl UserRepository {
    /// Create a new [`UserRepository`].
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert [`User`] into database and return its new `id`.
    pub async fn insert(&self, user: &User) -> Result<i64> {
        let result = sqlx::query(
            r#"INSERT INTO users (email, password_hash, name, phone, address, verified, signup_date)
                VALUES (?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.name)
        .bind(&user.phone)
        .bind(&user.address)
        .bind(user.verified)
        .bind(user.signup_date)
        .execute(&self.pool)
        .await
        .map_err(|err| match err {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                ServerError::EmailTaken
            },
            err => ServerError::Sql(err),
        })?;

        Ok(result.last_insert_rowid())
    }

    /// Find current user using `id` field.
    pub async fn find_by_id(&self, user_id: i64) -> Result<User> {
        let query = format!("SELECT {USER_COLUMNS} FROM users u WHERE u.id = ?");

        sqlx::query_as::<_, User>(&query)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(ServerError::NotFound)
    }

    /// Find current user using `email` field.
    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let query =
            format!("SELECT {USER_COLUMNS} FROM users u WHERE u.email = ?");

        Ok(sqlx::query_as::<_, User>(&query)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?)
    }

    /// Find the owner of a session token which is not expired yet.
    pub async fn find_by_token(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<User>> {
        let query = format!(
            "SELECT {USER_COLUMNS} FROM users u
                JOIN tokens t ON t.user_id = u.id
                WHERE t.token = ? AND t.expires_at > ?"
        );

        Ok(sqlx::query_as::<_, User>(&query)
            .bind(token)
            .bind(now)
            .fetch_optional(&self.pool)
            .await?)
    }

    /// Every user, oldest first.
    pub async fn list(&self) -> Result<Vec<User>> {
        let query = format!("SELECT {USER_COLUMNS} FROM users u ORDER BY u.id");

        Ok(sqlx::query_as::<_, User>(&query)
            .fetch_all(&self.pool)
            .await?)
    }

    /// Update `last_login` field.
    pub async fn touch_last_login(
        &self,
        user_id: i64,
        at: DateTime<Utc>,
    ) -> Result<()> {
        sqlx::query(r#"UPDATE users SET last_login = ? WHERE id = ?"#)
            .bind(at)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Mark phone number as verified.
    pub async fn set_verified(&self, user_id: i64, verified: bool) -> Result<()> {
        sqlx::query(r#"UPDATE users SET verified = ? WHERE id = ?"#)
            .bind(verified)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Insert a token linked to user into database.
    pub async fn insert_token(
        &self,
        token: &str,
        user_id: i64,
        ip: Option<&str>,
        created_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Result<()> {
        sqlx::query(
            r#"INSERT INTO tokens (token, user_id, ip, created_at, expires_at)
                VALUES (?, ?, ?, ?, ?)"#,
        )
        .bind(token)
        .bind(user_id)
        .bind(ip)
        .bind(created_at)
        .bind(expires_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Revoke a token.
    pub async fn delete_token(&self, token: &str) -> Result<()> {
        sqlx::query(r#"DELETE FROM tokens WHERE token = ?"#)
            .bind(token)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Purge every token expired at `now`.
    pub async fn delete_expired_tokens(&self, now: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query(r#"DELETE FROM tokens WHERE expires_at <= ?"#)
            .bind(now)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}
