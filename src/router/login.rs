//! Exchange credentials for a session token.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::HeaderMap;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::AppState;
use crate::error::Result;
use crate::router::Valid;
use crate::user::{TOKEN_LIFETIME_DAYS, User};

pub const TOKEN_TYPE: &str = "Bearer";
const FORWARDED_FOR: &str = "x-forwarded-for";

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct Body {
    #[validate(email(message = "Email must be formatted."))]
    email: String,
    #[validate(length(min = 1, message = "Password is required."))]
    password: String,
}

#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub token_type: String,
    pub token: String,
    /// Seconds before the token expires.
    pub expires_in: u64,
}

/// Client address as reported by the reverse proxy.
fn client_ip(headers: &HeaderMap) -> Option<String> {
    headers
        .get(FORWARDED_FOR)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(|ip| ip.trim().to_owned())
        .filter(|ip| !ip.is_empty())
}

pub async fn handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Valid(body): Valid<Body>,
) -> Result<Json<Response>> {
    let user = User::builder()
        .email(&body.email)
        .password(&body.password)
        .ip(client_ip(&headers))
        .build(state.db.sqlite.clone(), Arc::clone(&state.crypto))
        .login()
        .await?;

    let token = user.generate_token().await?;
    tracing::info!(user_id = user.data.id, "user logged in");

    Ok(Json(Response {
        token_type: TOKEN_TYPE.to_owned(),
        token,
        expires_in: TOKEN_LIFETIME_DAYS as u64 * 24 * 60 * 60,
    }))
}
