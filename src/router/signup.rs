use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::AppState;
use crate::error::Result;
use crate::router::{Valid, field_error};
use crate::user::User;

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct Body {
    #[validate(email(message = "Email must be formatted."))]
    email: String,
    #[validate(length(
        min = 8,
        max = 255,
        message = "Password must contain at least 8 characters."
    ))]
    password: String,
    #[validate(length(max = 100, message = "Name is too long."))]
    name: Option<String>,
    #[validate(custom(
        function = "crate::router::validate_phone",
        message = "Phone must be in E.164 format, e.g. +919800000000."
    ))]
    phone: Option<String>,
    #[validate(length(max = 255, message = "Address is too long."))]
    address: Option<String>,
}

/// Handler to create user.
pub async fn handler(
    State(state): State<AppState>,
    Valid(body): Valid<Body>,
) -> Result<(StatusCode, Json<User>)> {
    if !state.email_validator.is_real_email(&body.email).await {
        return Err(field_error(
            "email",
            "Email address does not look real. Use a valid address.",
        )
        .into());
    }

    let user = User::builder()
        .email(&body.email)
        .password(&body.password)
        .name(body.name)
        .phone(body.phone)
        .address(body.address)
        .build(state.db.sqlite.clone(), Arc::clone(&state.crypto))
        .create_user()
        .await?
        .data;

    let subject = format!("Welcome to {}", state.config.name);
    let text = format!(
        "Hi {},\n\nYour account is ready. Check the weather of your city to get \
         personal health advice.\n\nStay safe,\n{}",
        user.display_name(),
        state.config.name
    );
    if let Err(err) = state.mail.send(&user.email, &subject, &text).await {
        tracing::error!(user_id = user.id, error = %err, "welcome email not sent");
    }

    Ok((StatusCode::CREATED, Json(user)))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use http_body_util::BodyExt;
    use serde_json::json;
    use sqlx::SqlitePool;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use crate::*;

    #[sqlx::test]
    async fn test_signup_handler(pool: SqlitePool) {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v3/mail/send"))
            .respond_with(ResponseTemplate::new(202))
            .expect(1)
            .mount(&server)
            .await;

        let state = router::state(pool, &server.uri());
        let app = app(state);

        let response = make_request(
            None,
            app,
            Method::POST,
            "/signup",
            json!({
                "email": "Asha@HealthCast.app",
                "password": "Str0ng-Passw0rd",
                "name": "Asha",
                "phone": "+919800000000"
            })
            .to_string(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::CREATED);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body["email"], "asha@healthcast.app");
        assert_eq!(body["verified"], false);
        assert!(body.get("password_hash").is_none());
    }

    #[sqlx::test]
    async fn test_duplicate_email(pool: SqlitePool) {
        let state = router::state(pool, "http://127.0.0.1:9");
        let app = app(state);
        let body = json!({ "email": "dup@healthcast.app", "password": "Str0ng-Passw0rd" })
            .to_string();

        let response =
            make_request(None, app.clone(), Method::POST, "/signup", body.clone()).await;
        assert_eq!(response.status(), StatusCode::CREATED);

        let response = make_request(None, app, Method::POST, "/signup", body).await;
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[sqlx::test]
    async fn test_invalid_body(pool: SqlitePool) {
        let state = router::state(pool, "http://127.0.0.1:9");
        let app = app(state);

        for body in [
            json!({ "email": "not-an-email", "password": "Str0ng-Passw0rd" }),
            json!({ "email": "short@healthcast.app", "password": "short" }),
            json!({ "email": "ph@healthcast.app", "password": "Str0ng-Passw0rd", "phone": "98000" }),
        ] {
            let response =
                make_request(None, app.clone(), Method::POST, "/signup", body.to_string())
                    .await;
            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{body}");
        }
    }
}
