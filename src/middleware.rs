//! Middlewares for routes.

use axum::extract::{Request, State};
use axum::http::header;
use axum::middleware::Next;
use axum::response::Response;
use chrono::Utc;

use crate::AppState;
use crate::ServerError;
use crate::error::Result;
use crate::user::UserRepository;

const BEARER: &str = "Bearer ";

/// Session token of the authenticated request.
#[derive(Clone, Debug)]
pub struct SessionToken(pub String);

/// Custom middleware for authentification.
///
/// Inserts the token owner as an [`crate::user::User`] extension.
pub async fn auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response> {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|header| header.to_str().ok())
        .and_then(|header| header.strip_prefix(BEARER))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or(ServerError::Unauthorized)?
        .to_owned();

    let user = UserRepository::new(state.db.sqlite.clone())
        .find_by_token(&token, Utc::now())
        .await?
        .ok_or(ServerError::Unauthorized)?;

    tracing::debug!(user_id = user.id, "request authenticated");
    req.extensions_mut().insert(user);
    req.extensions_mut().insert(SessionToken(token));

    Ok(next.run(req).await)
}
