//! Stored city and last observed reading of each user.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

use crate::error::Result;
use crate::weather::Reading;

/// Preference as saved on database.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Preference {
    #[serde(skip)]
    pub user_id: i64,
    pub city: String,
    pub last_temperature: Option<f64>,
    pub last_humidity: Option<f64>,
    pub last_notified_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl Preference {
    /// Last observed temperature and humidity, if both are known.
    pub fn last_observation(&self) -> Option<Observation> {
        self.last_temperature
            .zip(self.last_humidity)
            .map(|(temperature, humidity)| Observation {
                temperature,
                humidity,
            })
    }

    /// Whether `city` names the same place, ignoring case and spaces.
    pub fn is_same_city(&self, city: &str) -> bool {
        self.city.trim().eq_ignore_ascii_case(city.trim())
    }
}

/// Numeric part of a weather reading, as compared between two checks.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub temperature: f64,
    pub humidity: f64,
}

impl From<&Reading> for Observation {
    fn from(reading: &Reading) -> Self {
        Self {
            temperature: reading.temperature,
            humidity: reading.humidity,
        }
    }
}

#[derive(Clone)]
pub struct PreferenceRepository {
    pool: SqlitePool,
}

impl PreferenceRepository {
    /// Create a new [`PreferenceRepository`].
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Find preference of a user.
    pub async fn find(&self, user_id: i64) -> Result<Option<Preference>> {
        Ok(sqlx::query_as::<_, Preference>(
            r#"SELECT user_id, city, last_temperature, last_humidity, last_notified_at, updated_at
                FROM preferences WHERE user_id = ?"#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?)
    }

    /// Insert or overwrite city and last reading. Last write wins.
    pub async fn save(
        &self,
        user_id: i64,
        city: &str,
        observation: Observation,
        at: DateTime<Utc>,
    ) -> Result<()> {
        sqlx::query(
            r#"INSERT INTO preferences (user_id, city, last_temperature, last_humidity, updated_at)
                VALUES (?, ?, ?, ?, ?)
                ON CONFLICT (user_id) DO UPDATE SET
                    city = excluded.city,
                    last_temperature = excluded.last_temperature,
                    last_humidity = excluded.last_humidity,
                    updated_at = excluded.updated_at"#,
        )
        .bind(user_id)
        .bind(city)
        .bind(observation.temperature)
        .bind(observation.humidity)
        .bind(at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Record when the last notification went out.
    pub async fn mark_notified(&self, user_id: i64, at: DateTime<Utc>) -> Result<()> {
        sqlx::query(r#"UPDATE preferences SET last_notified_at = ? WHERE user_id = ?"#)
            .bind(at)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::user::{User, UserRepository};

    async fn user(pool: &SqlitePool) -> i64 {
        UserRepository::new(pool.clone())
            .insert(&User {
                email: "pref@healthcast.app".into(),
                password_hash: "hash".into(),
                signup_date: Utc::now(),
                ..Default::default()
            })
            .await
            .unwrap()
    }

    #[sqlx::test]
    async fn test_last_write_wins(pool: SqlitePool) {
        let user_id = user(&pool).await;
        let repo = PreferenceRepository::new(pool);
        assert!(repo.find(user_id).await.unwrap().is_none());

        let first = Observation { temperature: 21.5, humidity: 40.0 };
        repo.save(user_id, "Bengaluru", first, Utc::now()).await.unwrap();
        let saved = repo.find(user_id).await.unwrap().unwrap();
        assert_eq!(saved.city, "Bengaluru");
        assert_eq!(saved.last_observation(), Some(first));

        let second = Observation { temperature: 30.0, humidity: 75.0 };
        repo.save(user_id, "Chennai", second, Utc::now()).await.unwrap();
        let saved = repo.find(user_id).await.unwrap().unwrap();
        assert_eq!(saved.city, "Chennai");
        assert_eq!(saved.last_observation(), Some(second));
        assert!(saved.last_notified_at.is_none());

        repo.mark_notified(user_id, Utc::now()).await.unwrap();
        let saved = repo.find(user_id).await.unwrap().unwrap();
        assert!(saved.last_notified_at.is_some());
    }

    #[sqlx::test]
    async fn test_same_city(pool: SqlitePool) {
        let user_id = user(&pool).await;
        let repo = PreferenceRepository::new(pool);

        let reading = Observation { temperature: 27.0, humidity: 60.0 };
        repo.save(user_id, "Pune", reading, Utc::now()).await.unwrap();
        let saved = repo.find(user_id).await.unwrap().unwrap();
        assert!(saved.is_same_city(" pune "));
        assert!(!saved.is_same_city("Mumbai"));
    }
}
