//! Typed builder for User.

use std::sync::Arc;

use sqlx::SqlitePool;

use crate::crypto::Crypto;
use crate::user::{User, UserService, normalize_email};

/// [`User`] builder.
#[derive(Debug, Clone)]
pub struct UserBuilder<Email> {
    email: Email,
    password: String,
    name: Option<String>,
    phone: Option<String>,
    address: Option<String>,
    ip: Option<String>,
}

/// Value is missing on [`UserBuilder`].
#[derive(Debug, Clone)]
pub struct Missing;

/// Value is present on [`UserBuilder`].
#[derive(Debug, Clone)]
pub struct Present<T>(pub T);

impl Default for UserBuilder<Missing> {
    fn default() -> Self {
        Self::new()
    }
}

impl UserBuilder<Missing> {
    /// Create a new [`UserBuilder`].
    pub fn new() -> Self {
        Self {
            email: Missing,
            password: String::default(),
            name: None,
            phone: None,
            address: None,
            ip: None,
        }
    }

    /// Update `email` field on [`UserBuilder`].
    pub fn email(self, email: impl AsRef<str>) -> UserBuilder<Present<String>> {
        UserBuilder {
            email: Present(normalize_email(email.as_ref())),
            password: self.password,
            name: self.name,
            phone: self.phone,
            address: self.address,
            ip: self.ip,
        }
    }
}

impl<Email> UserBuilder<Email> {
    /// Update `password` field on [`UserBuilder`].
    pub fn password(mut self, password: impl ToString) -> Self {
        self.password = password.to_string();
        self
    }

    /// Update `name` field on [`UserBuilder`].
    pub fn name(mut self, name: Option<String>) -> Self {
        self.name = name.map(|n| n.trim().to_owned()).filter(|n| !n.is_empty());
        self
    }

    /// Update `phone` field on [`UserBuilder`].
    pub fn phone(mut self, phone: Option<String>) -> Self {
        self.phone = phone.map(|p| p.trim().to_owned()).filter(|p| !p.is_empty());
        self
    }

    /// Update `address` field on [`UserBuilder`].
    pub fn address(mut self, address: Option<String>) -> Self {
        self.address =
            address.map(|a| a.trim().to_owned()).filter(|a| !a.is_empty());
        self
    }

    /// Update `ip` field on [`UserBuilder`].
    pub fn ip(mut self, ip: Option<String>) -> Self {
        self.ip = ip;
        self
    }
}

impl UserBuilder<Present<String>> {
    /// Build a [`User`] with `email`.
    ///
    /// `password` holds the plain password until
    /// [`UserService::create_user`] hashes it.
    pub fn build(self, pool: SqlitePool, crypto: Arc<Crypto>) -> UserService {
        let user = User {
            email: self.email.0,
            password_hash: self.password,
            name: self.name,
            phone: self.phone,
            address: self.address,
            ip: self.ip,
            ..Default::default()
        };

        UserService::new(user, pool, crypto)
    }
}
