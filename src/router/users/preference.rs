//! Saved city and last reading.

use axum::extract::State;
use axum::{Extension, Json};

use crate::error::Result;
use crate::preference::{Preference, PreferenceRepository};
use crate::user::User;
use crate::{AppState, ServerError};

pub async fn handler(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
) -> Result<Json<Preference>> {
    PreferenceRepository::new(state.db.sqlite.clone())
        .find(user.id)
        .await?
        .map(Json)
        .ok_or(ServerError::NotFound)
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use chrono::Utc;
    use http_body_util::BodyExt;
    use sqlx::SqlitePool;

    use crate::preference::{Observation, PreferenceRepository};
    use crate::user::UserRepository;
    use crate::*;

    #[sqlx::test]
    async fn test_preference_handler(pool: SqlitePool) {
        let state = router::state(pool.clone(), "http://127.0.0.1:9");
        let token = router::login_as(&state, "asha@healthcast.app", None).await;
        let app = app(state);

        let response = make_request(
            Some(&token),
            app.clone(),
            Method::GET,
            "/users/@me/preference",
            String::default(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let user = UserRepository::new(pool.clone())
            .find_by_email("asha@healthcast.app")
            .await
            .unwrap()
            .unwrap();
        PreferenceRepository::new(pool)
            .save(
                user.id,
                "Pune",
                Observation { temperature: 27.0, humidity: 60.0 },
                Utc::now(),
            )
            .await
            .unwrap();

        let response = make_request(
            Some(&token),
            app,
            Method::GET,
            "/users/@me/preference",
            String::default(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body["city"], "Pune");
        assert_eq!(body["last_temperature"], 27.0);
        assert!(body["last_notified_at"].is_null());
    }
}
