//! HTTP API.

pub mod login;
pub mod logout;
pub mod signup;
pub mod status;
pub mod users;
pub mod weather;

use std::sync::LazyLock;

use axum::Json;
use axum::extract::{FromRequest, Request};
use axum::extract::rejection::JsonRejection;
use regex_lite::Regex;
use serde::de::DeserializeOwned;
use validator::{Validate, ValidationError, ValidationErrors};

use crate::ServerError;

static PHONE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^\+[1-9][0-9]{6,14}$").ok());

/// JSON body checked with [`Validate`] before reaching the handler.
pub struct Valid<T>(pub T);

impl<S, T> FromRequest<S> for Valid<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
{
    type Rejection = ServerError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        value.validate()?;
        Ok(Valid(value))
    }
}

/// Phone numbers must be in E.164 format, e.g. `+919800000000`.
pub fn validate_phone(phone: &str) -> Result<(), ValidationError> {
    if PHONE.as_ref().is_some_and(|re| re.is_match(phone)) {
        Ok(())
    } else {
        Err(ValidationError::new("phone"))
    }
}

/// Reject empty and whitespace-only strings.
pub fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        Err(ValidationError::new("blank"))
    } else {
        Ok(())
    }
}

/// Single field error, as returned by the validator.
pub fn field_error(field: &'static str, message: &'static str) -> ValidationErrors {
    let mut errors = ValidationErrors::new();
    errors.add(field, ValidationError::new(field).with_message(message.into()));
    errors
}

/// State pointing every provider to `provider_url`.
#[cfg(test)]
pub fn state(pool: sqlx::SqlitePool, provider_url: &str) -> crate::AppState {
    use std::sync::Arc;

    use crate::config::{self, Configuration};

    let mut config = Configuration::default();
    config.weather.base_url = provider_url.to_owned();
    config.weather.api_key = "key".into();
    config.mail = Some(config::Mail {
        base_url: provider_url.to_owned(),
        api_key: "SG.key".into(),
        sender_email: "noreply@healthcast.app".into(),
        sender_name: "Health Advisor".into(),
    });
    config.sms = Some(config::Sms {
        api_url: provider_url.to_owned(),
        verify_url: provider_url.to_owned(),
        account_sid: "AC1".into(),
        auth_token: "token".into(),
        from: "+15550100".into(),
        verify_service_sid: Some("VA1".into()),
    });
    config.argon2 = Some(config::Argon2 {
        memory_cost: 1024,
        iterations: 1,
        parallelism: 1,
        hash_length: 32,
    });
    config.alerts.delay_ms = 0;

    crate::AppState {
        db: crate::database::Database { sqlite: pool },
        crypto: Arc::new(crate::crypto::Crypto::new(config.argon2.clone()).unwrap()),
        weather: crate::weather::WeatherClient::new(&config.weather).unwrap(),
        mail: crate::mail::MailManager::new(config.mail.as_ref().unwrap()).unwrap(),
        sms: crate::sms::SmsManager::new(config.sms.as_ref().unwrap()).unwrap(),
        email_validator: crate::email_validation::EmailValidator::default(),
        config: Arc::new(config),
    }
}

/// Create a user and a session token, returning the token.
#[cfg(test)]
pub async fn login_as(state: &crate::AppState, email: &str, phone: Option<&str>) -> String {
    let user = crate::user::User::builder()
        .email(email)
        .password("Str0ng-Passw0rd")
        .phone(phone.map(str::to_owned))
        .build(state.db.sqlite.clone(), std::sync::Arc::clone(&state.crypto))
        .create_user()
        .await
        .unwrap();

    user.generate_token().await.unwrap()
}
