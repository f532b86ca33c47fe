use axum::{Extension, Json};

use crate::user::User;

pub async fn handler(Extension(user): Extension<User>) -> Json<User> {
    Json(user)
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use http_body_util::BodyExt;
    use sqlx::SqlitePool;

    use crate::*;

    #[sqlx::test]
    async fn test_get_user_handler(pool: SqlitePool) {
        let state = router::state(pool, "http://127.0.0.1:9");
        let token =
            router::login_as(&state, "asha@healthcast.app", Some("+919800000000")).await;
        let app = app(state);

        let response =
            make_request(Some(&token), app, Method::GET, "/users/@me", String::default())
                .await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body["email"], "asha@healthcast.app");
        assert_eq!(body["phone"], "+919800000000");
        assert!(body.get("password_hash").is_none());
    }
}
