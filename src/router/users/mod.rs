//! Users-related HTTP API.
//!
//! Every route requires a bearer token.
mod get;
mod phone;
mod preference;

use axum::Router;
use axum::routing::{get, post};

use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        // `GET /users/@me` goes to `get`.
        .route("/users/@me", get(get::handler))
        // `GET /users/@me/preference` returns the saved city.
        .route("/users/@me/preference", get(preference::handler))
        // `POST /users/@me/phone/verification` sends a one-time code.
        .route("/users/@me/phone/verification", post(phone::start))
        .route("/users/@me/phone/verification/check", post(phone::check))
}
