//! Alerts sent when a weather check differs from the previous one.

use crate::advice::Tip;
use crate::mail::MailManager;
use crate::preference::Observation;
use crate::sms::SmsManager;
use crate::user::User;
use crate::weather::Reading;

/// Minimum absolute temperature change (°C) that triggers an alert.
pub const TEMPERATURE_DELTA: f64 = 2.0;
/// Minimum absolute humidity change (%) that triggers an alert.
pub const HUMIDITY_DELTA: f64 = 10.0;
const SMS_BODY_LINES: usize = 8;

/// Whether `current` moved far enough from `previous`.
///
/// The first observation never notifies.
pub fn should_notify(previous: Option<Observation>, current: Observation) -> bool {
    let Some(previous) = previous else {
        return false;
    };

    (current.temperature - previous.temperature).abs() >= TEMPERATURE_DELTA
        || (current.humidity - previous.humidity).abs() >= HUMIDITY_DELTA
}

/// Rendered alert.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub subject: String,
    pub body: String,
}

impl Message {
    /// Render the weather-change alert for `user`.
    pub fn weather_change(
        user: &User,
        previous: Observation,
        reading: &Reading,
        tips: &[Tip],
    ) -> Self {
        let subject = format!("Weather update for {}", reading.city);

        let mut body = format!(
            "Hi {},\n\nThe weather in {} changed since your last check.\n\
             Temperature: {:.1}°C -> {:.1}°C\n\
             Humidity: {:.0}% -> {:.0}%\n\
             Condition: {}\n\nHealth recommendations:\n",
            user.display_name(),
            reading.city,
            previous.temperature,
            reading.temperature,
            previous.humidity,
            reading.humidity,
            capitalize(&reading.condition),
        );
        for tip in tips {
            body.push_str("- ");
            body.push_str(tip.message());
            body.push('\n');
        }
        body.push_str("\nStay safe,\nHealthCare Advisor");

        Self { subject, body }
    }

    /// Shortened text for SMS: the subject and the first lines of the
    /// body.
    pub fn sms_text(&self) -> String {
        let lines: Vec<&str> = self.body.lines().take(SMS_BODY_LINES).collect();
        format!("{}\n\n{}", self.subject, lines.join("\n"))
    }
}

/// Uppercase the first letter of `text`.
pub(crate) fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Channel an alert went out through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Email,
    Sms,
}

impl Channel {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Email => "email",
            Self::Sms => "sms",
        }
    }
}

/// Sends [`Message`]s over every channel available for a user.
#[derive(Debug, Clone, Copy)]
pub struct Notifier<'a> {
    mail: &'a MailManager,
    sms: &'a SmsManager,
}

impl<'a> Notifier<'a> {
    /// Create a new [`Notifier`].
    pub fn new(mail: &'a MailManager, sms: &'a SmsManager) -> Self {
        Self { mail, sms }
    }

    /// Send by email.
    pub async fn email(&self, user: &User, message: &Message) -> bool {
        let sent = self
            .mail
            .send(&user.email, &message.subject, &message.body)
            .await;
        record(Channel::Email, user.id, sent)
    }

    /// Send by SMS to a verified phone.
    pub async fn sms(&self, user: &User, text: &str) -> bool {
        let Some(phone) = user.verified_phone() else {
            return false;
        };

        let sent = self.sms.send_message(phone, text).await;
        record(Channel::Sms, user.id, sent)
    }

    /// Send on every channel. Returns the channels that delivered.
    ///
    /// Provider errors are logged and never returned.
    pub async fn dispatch(&self, user: &User, message: &Message) -> Vec<Channel> {
        let mut delivered = Vec::with_capacity(2);

        if self.email(user, message).await {
            delivered.push(Channel::Email);
        }
        if self.sms(user, &message.sms_text()).await {
            delivered.push(Channel::Sms);
        }

        delivered
    }
}

fn record(
    channel: Channel,
    user_id: i64,
    sent: Result<bool, crate::error::ProviderError>,
) -> bool {
    match sent {
        Ok(true) => {
            metrics::counter!("notifications_sent_total", "channel" => channel.as_str())
                .increment(1);
            tracing::info!(user_id, channel = channel.as_str(), "notification sent");
            true
        },
        Ok(false) => false,
        Err(err) => {
            tracing::warn!(
                user_id,
                channel = channel.as_str(),
                error = %err,
                "notification failed"
            );
            false
        },
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::config::{Mail, Sms};

    fn obs(temperature: f64, humidity: f64) -> Observation {
        Observation {
            temperature,
            humidity,
        }
    }

    #[test]
    fn test_first_observation_never_notifies() {
        assert!(!should_notify(None, obs(20.0, 50.0)));
        assert!(!should_notify(None, obs(45.0, 100.0)));
    }

    #[test]
    fn test_thresholds() {
        let previous = Some(obs(20.0, 50.0));

        assert!(!should_notify(previous, obs(20.0, 50.0)));
        assert!(!should_notify(previous, obs(21.5, 59.0)));
        assert!(!should_notify(previous, obs(18.5, 41.0)));

        assert!(should_notify(previous, obs(22.0, 50.0)));
        assert!(should_notify(previous, obs(18.0, 50.0)));
        assert!(should_notify(previous, obs(20.0, 60.0)));
        assert!(should_notify(previous, obs(20.0, 40.0)));
        assert!(should_notify(previous, obs(25.0, 90.0)));
    }

    #[test]
    fn test_message() {
        let user = User {
            name: Some("Asha".into()),
            ..Default::default()
        };
        let reading = Reading {
            city: "Bengaluru".into(),
            temperature: 36.0,
            humidity: 85.0,
            condition: "light rain".into(),
        };
        let tips = crate::advice::tips(36.0, 85.0, "light rain");

        let message = Message::weather_change(&user, obs(31.0, 60.0), &reading, &tips);
        assert_eq!(message.subject, "Weather update for Bengaluru");
        assert!(message.body.starts_with("Hi Asha,"));
        assert!(message.body.contains("Temperature: 31.0°C -> 36.0°C"));
        assert!(message.body.contains("Humidity: 60% -> 85%"));
        assert!(message.body.contains("Condition: Light rain"));
        assert!(message.body.contains(Tip::Rain.message()));
    }

    #[test]
    fn test_sms_text() {
        let message = Message {
            subject: "Alert".into(),
            body: (1..=12).map(|i| format!("line {i}")).collect::<Vec<_>>().join("\n"),
        };
        let text = message.sms_text();
        assert!(text.starts_with("Alert\n\nline 1\n"));
        assert!(text.ends_with("line 8"));
        assert!(!text.contains("line 9"));
    }

    #[test]
    fn test_capitalize() {
        assert_eq!(capitalize("clear sky"), "Clear sky");
        assert_eq!(capitalize(""), "");
    }

    #[tokio::test]
    async fn test_dispatch() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v3/mail/send"))
            .respond_with(ResponseTemplate::new(202))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/2010-04-01/Accounts/AC1/Messages.json"))
            .respond_with(ResponseTemplate::new(500).set_body_json(json!({ "code": 20500 })))
            .expect(1)
            .mount(&server)
            .await;

        let mail = MailManager::new(&Mail {
            base_url: server.uri(),
            api_key: "key".into(),
            sender_email: "noreply@healthcast.app".into(),
            sender_name: "Health Advisor".into(),
        })
        .unwrap();
        let sms = SmsManager::new(&Sms {
            api_url: server.uri(),
            verify_url: server.uri(),
            account_sid: "AC1".into(),
            auth_token: "token".into(),
            from: "+15550100".into(),
            verify_service_sid: None,
        })
        .unwrap();

        let user = User {
            id: 1,
            email: "asha@healthcast.app".into(),
            phone: Some("+919800000000".into()),
            verified: true,
            ..Default::default()
        };
        let message = Message {
            subject: "s".into(),
            body: "b".into(),
        };

        let delivered = Notifier::new(&mail, &sms).dispatch(&user, &message).await;
        assert_eq!(delivered, vec![Channel::Email]);
    }

    #[tokio::test]
    async fn test_unverified_phone_skips_sms() {
        let mail = MailManager::default();
        let sms = SmsManager::default();
        let user = User {
            phone: Some("+919800000000".into()),
            verified: false,
            ..Default::default()
        };

        assert!(!Notifier::new(&mail, &sms).sms(&user, "hi").await);
    }
}
