use std::sync::Arc;

use chrono::{Duration, Utc};
use sqlx::SqlitePool;

use crate::crypto::{Crypto, random_token};
use crate::error::{Result, ServerError};
use crate::user::{User, UserRepository};

/// Session lifetime, in days.
pub const TOKEN_LIFETIME_DAYS: i64 = 15;

/// User manager.
#[derive(Clone)]
pub struct UserService {
    pub repo: UserRepository,
    pub crypto: Arc<Crypto>,
    pub data: User,
}

impl UserService {
    /// Create a new [`UserService`].
    pub fn new(user: User, pool: SqlitePool, crypto: Arc<Crypto>) -> Self {
        Self {
            data: user,
            repo: UserRepository::new(pool),
            crypto,
        }
    }

    /// Create builded user.
    ///
    /// Refuse an already registered email, then hash password.
    pub async fn create_user(mut self) -> Result<Self> {
        if self.repo.find_by_email(&self.data.email).await?.is_some() {
            return Err(ServerError::EmailTaken);
        }

        self.data.password_hash =
            self.crypto.pwd.hash_password(&self.data.password_hash)?;
        self.data.signup_date = Utc::now();
        self.data.verified = false;
        self.data.id = self.repo.insert(&self.data).await?;

        tracing::info!(user_id = self.data.id, "user created");
        Ok(self)
    }

    /// Check credentials and update `last_login`.
    ///
    /// Unknown email and wrong password are not distinguished.
    pub async fn login(mut self) -> Result<Self> {
        let password = std::mem::take(&mut self.data.password_hash);
        let ip = self.data.ip.take();

        let Some(user) = self.repo.find_by_email(&self.data.email).await? else {
            return Err(ServerError::InvalidCredentials);
        };

        if !self.crypto.pwd.verify_password(&password, &user.password_hash) {
            tracing::debug!(user_id = user.id, "wrong password");
            return Err(ServerError::InvalidCredentials);
        }

        let now = Utc::now();
        self.repo.touch_last_login(user.id, now).await?;

        self.data = User {
            last_login: Some(now),
            ip,
            ..user
        };
        Ok(self)
    }

    /// Generate a new 15-day session token to user.
    pub async fn generate_token(&self) -> Result<String> {
        let token = random_token();
        let now = Utc::now();

        let purged = self.repo.delete_expired_tokens(now).await?;
        if purged > 0 {
            tracing::debug!(purged, "expired tokens removed");
        }

        self.repo
            .insert_token(
                &token,
                self.data.id,
                self.data.ip.as_deref(),
                now,
                now + Duration::days(TOKEN_LIFETIME_DAYS),
            )
            .await?;
        Ok(token)
    }
}
