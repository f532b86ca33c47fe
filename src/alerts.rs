//! Periodic weather and health digest for every user with a saved city.

use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::AppState;
use crate::advice;
use crate::error::Result;
use crate::notify::{Message, Notifier, capitalize};
use crate::preference::PreferenceRepository;
use crate::user::{User, UserRepository};
use crate::weather::Reading;

/// Outcome of one [`run`].
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Summary {
    /// Users with a saved city.
    pub users: usize,
    /// Users reached by at least one channel.
    pub delivered: usize,
    /// Users for whom weather or every channel failed.
    pub failed: usize,
}

/// Render the digest of `reading` for `user`.
pub fn digest(user: &User, reading: &Reading, at: DateTime<Utc>) -> Message {
    let condition = capitalize(&reading.condition);
    let tips = advice::tips(reading.temperature, reading.humidity, &reading.condition);

    let subject = format!(
        "Daily Health Alert — {} — {}, {}°C",
        reading.city, condition, reading.temperature
    );

    let mut lines = vec![
        format!("Hello {},", user.display_name()),
        String::new(),
        format!(
            "Here is your daily weather & health advisory for {} ({}):",
            reading.city,
            at.format("%Y-%m-%d %H:%M")
        ),
        format!("- Condition: {condition}"),
        format!("- Temperature: {} °C", reading.temperature),
        format!("- Humidity: {} %", reading.humidity),
        String::new(),
        "Personalized health recommendations:".to_owned(),
    ];
    lines.extend(tips.iter().map(|tip| format!("- {}", tip.message())));
    lines.push(String::new());
    lines.push("Detailed guidance:".to_owned());
    lines.extend(tips.iter().map(|tip| format!("• {}", tip.detail())));
    lines.push(String::new());
    lines.push("Stay safe,\nHealthCare Advisor".to_owned());

    Message {
        subject,
        body: lines.join("\n"),
    }
}

/// Send the digest to every user with a saved city, one after the other.
///
/// With `dry_run`, digests are logged instead of sent.
pub async fn run(state: &AppState, dry_run: bool) -> Result<Summary> {
    let users = UserRepository::new(state.db.sqlite.clone()).list().await?;
    let preferences = PreferenceRepository::new(state.db.sqlite.clone());
    let notifier = Notifier::new(&state.mail, &state.sms);
    let delay = Duration::from_millis(state.config.alerts.delay_ms);
    let mut summary = Summary::default();

    tracing::info!(
        users = users.len(),
        dry_run,
        email = state.mail.is_enabled(),
        sms = state.sms.is_enabled(),
        "starting alerts job"
    );

    for user in users {
        let Some(preference) = preferences.find(user.id).await? else {
            tracing::debug!(user_id = user.id, "no saved city, skipping");
            continue;
        };
        summary.users += 1;

        let reading = match state.weather.current(&preference.city).await {
            Ok(reading) => reading,
            Err(err) => {
                tracing::warn!(
                    user_id = user.id,
                    city = %preference.city,
                    error = %err,
                    "weather fetch failed, skipping user"
                );
                summary.failed += 1;
                continue;
            },
        };

        let message = digest(&user, &reading, Utc::now());
        if dry_run {
            tracing::info!(
                user_id = user.id,
                subject = %message.subject,
                sms = user.verified_phone().is_some(),
                "dry run, digest not sent"
            );
            continue;
        }

        let mut sent_any = false;
        if user.verified_phone().is_some() {
            sent_any |= notifier.sms(&user, &message.sms_text()).await;
            tokio::time::sleep(delay).await;
        }
        sent_any |= notifier.email(&user, &message).await;
        tokio::time::sleep(delay).await;

        if sent_any {
            summary.delivered += 1;
            tracing::info!(user_id = user.id, "digest delivered");
        } else {
            summary.failed += 1;
            tracing::warn!(user_id = user.id, "digest not delivered");
        }
    }

    tracing::info!(?summary, "alerts job finished");
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use serde_json::json;
    use sqlx::SqlitePool;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::advice::Tip;
    use crate::preference::Observation;

    fn reading() -> Reading {
        Reading {
            city: "Bengaluru".into(),
            temperature: 36.5,
            humidity: 85.0,
            condition: "light rain".into(),
        }
    }

    #[test]
    fn test_digest() {
        let user = User {
            name: Some("Asha".into()),
            ..Default::default()
        };
        let at = Utc.with_ymd_and_hms(2025, 6, 1, 7, 30, 0).unwrap();

        let message = digest(&user, &reading(), at);
        assert_eq!(
            message.subject,
            "Daily Health Alert — Bengaluru — Light rain, 36.5°C"
        );

        let lines: Vec<&str> = message.body.lines().collect();
        assert_eq!(lines[0], "Hello Asha,");
        assert_eq!(
            lines[2],
            "Here is your daily weather & health advisory for Bengaluru (2025-06-01 07:30):"
        );
        assert_eq!(lines[4], "- Temperature: 36.5 °C");
        assert!(message.body.contains(Tip::Heat.detail()));
        assert!(message.body.contains(Tip::HighHumidity.detail()));
        assert!(message.body.contains(Tip::Rain.detail()));
        assert!(!message.body.contains(Tip::Sun.detail()));
    }

    async fn seed(state: &AppState, email: &str, phone: Option<&str>, city: Option<&str>) {
        let repo = UserRepository::new(state.db.sqlite.clone());
        let id = repo
            .insert(&User {
                email: email.into(),
                password_hash: "hash".into(),
                phone: phone.map(str::to_owned),
                verified: phone.is_some(),
                signup_date: Utc::now(),
                ..Default::default()
            })
            .await
            .unwrap();

        if let Some(city) = city {
            PreferenceRepository::new(state.db.sqlite.clone())
                .save(
                    id,
                    city,
                    Observation { temperature: 30.0, humidity: 60.0 },
                    Utc::now(),
                )
                .await
                .unwrap();
        }
    }

    #[sqlx::test]
    async fn test_run(pool: SqlitePool) {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/data/2.5/weather"))
            .and(query_param("q", "Bengaluru"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "name": "Bengaluru",
                "main": { "temp": 36.5, "humidity": 85 },
                "weather": [{ "description": "light rain" }]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/data/2.5/weather"))
            .and(query_param("q", "Atlantis"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/v3/mail/send"))
            .respond_with(ResponseTemplate::new(202))
            .expect(2)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/2010-04-01/Accounts/AC1/Messages.json"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "sid": "SM1" })))
            .expect(1)
            .mount(&server)
            .await;

        let state = crate::router::state(pool, &server.uri());
        seed(&state, "sms@healthcast.app", Some("+919800000000"), Some("Bengaluru")).await;
        seed(&state, "mail@healthcast.app", None, Some("Bengaluru")).await;
        seed(&state, "lost@healthcast.app", None, Some("Atlantis")).await;
        seed(&state, "nocity@healthcast.app", None, None).await;

        let summary = run(&state, false).await.unwrap();
        assert_eq!(
            summary,
            Summary {
                users: 3,
                delivered: 2,
                failed: 1,
            }
        );
    }

    #[sqlx::test]
    async fn test_dry_run(pool: SqlitePool) {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "name": "Pune",
                "main": { "temp": 25.0, "humidity": 40 },
                "weather": [{ "description": "clear sky" }]
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(202))
            .expect(0)
            .mount(&server)
            .await;

        let state = crate::router::state(pool, &server.uri());
        seed(&state, "asha@healthcast.app", Some("+919800000000"), Some("Pune")).await;

        let summary = run(&state, true).await.unwrap();
        assert_eq!(summary.users, 1);
        assert_eq!(summary.delivered, 0);
    }
}
