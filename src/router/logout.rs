//! Revoke the current session token.

use axum::Extension;
use axum::extract::State;
use axum::http::StatusCode;

use crate::AppState;
use crate::error::Result;
use crate::middleware::SessionToken;
use crate::user::{User, UserRepository};

pub async fn handler(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Extension(SessionToken(token)): Extension<SessionToken>,
) -> Result<StatusCode> {
    UserRepository::new(state.db.sqlite.clone())
        .delete_token(&token)
        .await?;

    tracing::info!(user_id = user.id, "user logged out");
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use sqlx::SqlitePool;

    use crate::*;

    #[sqlx::test]
    async fn test_logout_handler(pool: SqlitePool) {
        let state = router::state(pool, "http://127.0.0.1:9");
        let token = router::login_as(&state, "asha@healthcast.app", None).await;
        let app = app(state);

        let response = make_request(
            Some(&token),
            app.clone(),
            Method::POST,
            "/logout",
            String::default(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let response = make_request(
            Some(&token),
            app,
            Method::GET,
            "/users/@me",
            String::default(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[sqlx::test]
    async fn test_missing_token(pool: SqlitePool) {
        let state = router::state(pool, "http://127.0.0.1:9");
        let app = app(state);

        let response =
            make_request(None, app.clone(), Method::POST, "/logout", String::default())
                .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = make_request(
            Some("not-a-token"),
            app,
            Method::POST,
            "/logout",
            String::default(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
