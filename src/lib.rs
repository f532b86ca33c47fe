//!  healthcast turns local weather into personal health advice.

#[forbid(unsafe_code)]
#[deny(missing_docs, unused_mut)]
mod advice;
pub mod alerts;
mod crypto;
pub mod database;
mod email_validation;
pub mod error;
mod mail;
mod middleware;
mod notify;
mod preference;
mod router;
mod sms;
pub mod telemetry;
mod user;
mod weather;

pub mod config;

use std::sync::Arc;
use std::time::Duration;

use axum::body::Bytes;
use axum::http::{Method, header};
use axum::routing::{get, post};
use axum::{Router, middleware as AxumMiddleware};
use error::ServerError;
use tower::ServiceBuilder;
use tower_http::LatencyUnit;
use tower_http::cors::{Any, CorsLayer};
use tower_http::sensitive_headers::SetSensitiveHeadersLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::{
    DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer,
};

const REQUEST_TIMEOUT_SECS: u64 = 30;

/// MUST NEVER be used in production.
#[cfg(test)]
pub async fn make_request(
    token: Option<&str>,
    app: Router,
    method: Method,
    path: &str,
    body: String,
) -> axum::http::Response<axum::body::Body> {
    use axum::extract::Request;
    use tower::util::ServiceExt;

    let mut request = Request::builder()
        .method(method)
        .uri(path)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        request = request.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }

    app.oneshot(request.body(axum::body::Body::from(body)).unwrap())
        .await
        .unwrap()
}

/// State sharing between routes.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<config::Configuration>,
    pub db: database::Database,
    pub crypto: Arc<crypto::Crypto>,
    pub weather: weather::WeatherClient,
    pub mail: mail::MailManager,
    pub sms: sms::SmsManager,
    pub email_validator: email_validation::EmailValidator,
}

/// Create router.
pub fn app(state: AppState) -> Router {
    let middleware = ServiceBuilder::new()
        // Add high level tracing/logging to all requests.
        .layer(
            TraceLayer::new_for_http()
                .on_body_chunk(|chunk: &Bytes, latency: Duration, _span: &tracing::Span| {
                    tracing::trace!(size_bytes = chunk.len(), latency = ?latency, "sending body chunk")
                })
                .make_span_with(DefaultMakeSpan::new().include_headers(true).level(tracing::Level::INFO))
                .on_request(DefaultOnRequest::new())
                .on_response(DefaultOnResponse::new().include_headers(true).latency_unit(LatencyUnit::Micros)),
        )
        // Weather and provider calls are awaited inline.
        .layer(TimeoutLayer::new(Duration::from_secs(REQUEST_TIMEOUT_SECS)))
        // Remove senstive headers from trace.
        .layer(SetSensitiveHeadersLayer::new([header::AUTHORIZATION, header::COOKIE]))
        // Add CORS preflight support.
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
                .allow_headers(Any)
                .vary([header::AUTHORIZATION]),
        );

    let private = Router::new()
        // `POST /logout` revokes the bearer token.
        .route("/logout", post(router::logout::handler))
        // `POST /weather` checks a city and stores it.
        .route("/weather", post(router::weather::handler))
        .merge(router::users::router())
        .route_layer(AxumMiddleware::from_fn_with_state(
            state.clone(),
            middleware::auth,
        ));

    Router::new()
        // `GET /status.json` goes to `status`.
        .route("/status.json", get(router::status::status))
        // `POST /signup` goes to `signup`.
        .route("/signup", post(router::signup::handler))
        // `POST /login` goes to `login`.
        .route("/login", post(router::login::handler))
        .merge(private)
        .with_state(state)
        .route_layer(AxumMiddleware::from_fn(telemetry::track))
        .layer(middleware)
}

/// Initialize the application state from a loaded configuration.
pub async fn initialize_state(
    config: Arc<config::Configuration>,
) -> Result<AppState, Box<dyn std::error::Error + Send + Sync>> {
    let db = database::Database::new(
        &config.database.url,
        config.database.pool_size,
    )
    .await?;

    // execute migrations scripts on start.
    db.migrate().await?;

    let crypto = Arc::new(crypto::Crypto::new(config.argon2.clone())?);

    let weather = weather::WeatherClient::new(&config.weather)?;

    // handle mail sender.
    let mail = match &config.mail {
        Some(cfg) if !cfg.api_key.is_empty() => mail::MailManager::new(cfg)?,
        _ => {
            tracing::warn!("missing `mail` credentials on `config.yaml` file, emails disabled");
            mail::MailManager::default()
        },
    };

    // handle sms sender.
    let sms = match &config.sms {
        Some(cfg) if !cfg.account_sid.is_empty() => sms::SmsManager::new(cfg)?,
        _ => {
            tracing::warn!("missing `sms` credentials on `config.yaml` file, sms disabled");
            sms::SmsManager::default()
        },
    };

    let email_validator = match &config.email_validation {
        Some(cfg) if !cfg.api_key.is_empty() => {
            email_validation::EmailValidator::new(cfg)?
        },
        _ => email_validation::EmailValidator::default(),
    };

    Ok(AppState {
        config,
        db,
        crypto,
        weather,
        mail,
        sms,
        email_validator,
    })
}
