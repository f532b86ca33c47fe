//! Public instance page for front-end identification and customization.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use serde::{Deserialize, Serialize};

use crate::config::{Configuration, Support};

/// Public part of the configuration.
#[derive(Debug, Serialize, Deserialize)]
pub struct Status {
    name: String,
    version: String,
    url: String,
    support: Option<Support>,
    about: Option<String>,
}

/// Public server status (configuration).
pub async fn status(State(config): State<Arc<Configuration>>) -> Json<Status> {
    Json(Status {
        name: config.name.clone(),
        version: config.version.clone(),
        url: config.url.clone(),
        support: config.support.clone(),
        about: config.about.clone(),
    })
}
