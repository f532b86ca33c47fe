//! Check the weather of a city and get health advice.

use axum::extract::State;
use axum::{Extension, Json};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::AppState;
use crate::advice::{self, Advice};
use crate::error::Result;
use crate::notify::{Message, Notifier, should_notify};
use crate::preference::{Observation, PreferenceRepository};
use crate::router::Valid;
use crate::user::User;
use crate::weather::Reading;

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct Body {
    #[validate(
        length(max = 100, message = "City name is too long."),
        custom(
            function = "crate::router::validate_not_blank",
            message = "Please enter a city name."
        )
    )]
    city: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Response {
    pub weather: Reading,
    pub advice: Vec<Advice>,
    /// Whether a change alert went out.
    pub notified: bool,
}

pub async fn handler(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Valid(body): Valid<Body>,
) -> Result<Json<Response>> {
    let city = body.city.trim();
    let reading = state.weather.current(city).await?;
    metrics::counter!("weather_checks_total").increment(1);

    let tips = advice::tips(reading.temperature, reading.humidity, &reading.condition);
    let current = Observation::from(&reading);

    let preferences = PreferenceRepository::new(state.db.sqlite.clone());
    // A new city starts a new history.
    let previous = preferences
        .find(user.id)
        .await?
        .filter(|preference| preference.is_same_city(city))
        .and_then(|preference| preference.last_observation());

    let now = Utc::now();
    preferences.save(user.id, city, current, now).await?;

    let mut notified = false;
    if let Some(previous) = previous.filter(|previous| should_notify(Some(*previous), current)) {
        let message = Message::weather_change(&user, previous, &reading, &tips);
        let delivered = Notifier::new(&state.mail, &state.sms)
            .dispatch(&user, &message)
            .await;

        if !delivered.is_empty() {
            notified = true;
            if let Err(err) = preferences.mark_notified(user.id, now).await {
                tracing::error!(user_id = user.id, error = %err, "failed to record notification time");
            }
        }
    }

    tracing::debug!(user_id = user.id, %city, notified, "weather checked");

    Ok(Json(Response {
        weather: reading,
        advice: tips.into_iter().map(Advice::from).collect(),
        notified,
    }))
}
