//! Phone verification with one-time codes.
//!
//! Only verified phones receive SMS alerts.

use axum::extract::State;
use axum::http::StatusCode;
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::Result;
use crate::router::{Valid, field_error};
use crate::user::{User, UserRepository};
use crate::{AppState, ServerError};

const VERIFICATION: &str = "phone verification";

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct Body {
    #[validate(length(min = 4, max = 10, message = "Code must contain 4 to 10 digits."))]
    code: String,
}

fn phone_of(user: &User) -> Result<&str> {
    user.phone
        .as_deref()
        .ok_or_else(|| field_error("phone", "No phone number on file.").into())
}

/// Send a one-time code to the user's phone.
pub async fn start(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
) -> Result<StatusCode> {
    let phone = phone_of(&user)?;
    if !state.sms.start_verification(phone).await? {
        return Err(ServerError::Unavailable(VERIFICATION));
    }

    tracing::info!(user_id = user.id, "verification code sent");
    Ok(StatusCode::ACCEPTED)
}

/// Check the code and mark the phone as verified.
pub async fn check(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Valid(body): Valid<Body>,
) -> Result<Json<User>> {
    let phone = phone_of(&user)?;
    if !state.sms.can_verify() {
        return Err(ServerError::Unavailable(VERIFICATION));
    }
    if !state.sms.check_verification(phone, body.code.trim()).await? {
        return Err(field_error("code", "Invalid verification code.").into());
    }

    UserRepository::new(state.db.sqlite.clone())
        .set_verified(user.id, true)
        .await?;
    tracing::info!(user_id = user.id, "phone verified");

    Ok(Json(User {
        verified: true,
        ..user
    }))
}
