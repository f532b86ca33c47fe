mod builder;
mod repository;
mod service;

pub use builder::*;
pub use repository::*;
pub use service::*;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// User as saved on database.
#[derive(
    Clone, Debug, Default, PartialEq, Serialize, Deserialize, sqlx::FromRow,
)]
pub struct User {
    pub id: i64,
    pub email: String,
    #[serde(skip)]
    pub password_hash: String,
    pub name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    /// Whether `phone` went through OTP verification.
    pub verified: bool,
    pub signup_date: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
    #[sqlx(skip)]
    #[serde(skip)]
    pub ip: Option<String>,
}

impl User {
    /// Create a new [`UserBuilder`].
    pub fn builder() -> UserBuilder<Missing> {
        UserBuilder::new()
    }

    /// Name used to greet the user.
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or("User")
    }

    /// Phone number only if it has been verified.
    pub fn verified_phone(&self) -> Option<&str> {
        self.phone.as_deref().filter(|_| self.verified)
    }
}

/// Trim and lowercase an email so lookups are case insensitive.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_name() {
        let mut user = User::default();
        assert_eq!(user.display_name(), "User");

        user.name = Some("  ".into());
        assert_eq!(user.display_name(), "User");

        user.name = Some("Asha".into());
        assert_eq!(user.display_name(), "Asha");
    }

    #[test]
    fn test_verified_phone() {
        let mut user = User {
            phone: Some("+919019531192".into()),
            ..Default::default()
        };
        assert_eq!(user.verified_phone(), None);

        user.verified = true;
        assert_eq!(user.verified_phone(), Some("+919019531192"));
    }

    #[test]
    fn test_serialization_hides_secrets() {
        let user = User {
            email: "test@healthcast.app".into(),
            password_hash: "$argon2id$secret".into(),
            ..Default::default()
        };
        let json = serde_json::to_string(&user).unwrap();
        assert!(json.contains("test@healthcast.app"));
        assert!(!json.contains("argon2id"));
    }

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email("  Test@Example.COM "), "test@example.com");
    }
}
