use std::net::SocketAddr;

use axum::routing::get;
use healthcast::config::Configuration;
use healthcast::telemetry;
use opentelemetry::global;
use tokio::net::TcpListener;
use tokio::signal;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[cfg(feature = "dhat-heap")]
#[global_allocator]
static ALLOC: dhat::Alloc = dhat::Alloc;

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8080;

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to listen for ctrl+c");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            },
            Err(err) => tracing::error!(error = %err, "failed to listen for SIGTERM"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("shutdown signal received");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    #[cfg(feature = "dhat-heap")]
    let _profiler = dhat::Profiler::new_heap();

    let config = Configuration::default().read()?;

    // Export spans and logs when an OTLP collector is set.
    let otel_logs = match &config.telemetry {
        Some(telemetry) => {
            let tracer = telemetry::setup_tracer(&telemetry.otlp_endpoint)?;
            global::set_tracer_provider(tracer);
            Some(telemetry::setup_logging(&telemetry.otlp_endpoint)?)
        },
        None => None,
    };

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("healthcast=info,tower_http=info")),
        )
        .with(tracing_subscriber::fmt::layer())
        .with(otel_logs)
        .init();

    let metrics = telemetry::setup_metrics_recorder()?;
    let state = healthcast::initialize_state(config).await?;

    let app = healthcast::app(state)
        .route("/metrics", get(move || std::future::ready(metrics.render())));

    let host = std::env::var("APP_HOST").unwrap_or_else(|_| DEFAULT_HOST.to_owned());
    let port = std::env::var("APP_PORT")
        .ok()
        .and_then(|port| port.parse::<u16>().ok())
        .unwrap_or(DEFAULT_PORT);
    let addr: SocketAddr = format!("{host}:{port}").parse()?;

    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "server started");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}
