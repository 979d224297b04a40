//! FixMyArea server — application entry point.

mod config;

use std::sync::Arc;

use anyhow::Context;
use axum::http::HeaderValue;
use dotenv::dotenv;
use fixmyarea_api::AppState;
use fixmyarea_auth::{LogProvider, MessageProvider, OtpNotifier};
use fixmyarea_core::clock::{Clock, SystemClock};
use fixmyarea_db::DbManager;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::{Config, OtpDelivery};

fn notifier(config: &Config) -> OtpNotifier {
    let validity = config.auth.otp_expiry_minutes;
    match config.otp_delivery {
        OtpDelivery::Log => {
            warn!("OTP codes are written to the log; configure a provider for production");
            let provider: Arc<dyn MessageProvider> = Arc::new(LogProvider);
            OtpNotifier::new(Some(provider.clone()), Some(provider), validity)
        }
        OtpDelivery::Disabled => OtpNotifier::unconfigured(validity),
    }
}

fn cors(config: &Config) -> anyhow::Result<CorsLayer> {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    Ok(match &config.cors_origin {
        Some(origin) => layer.allow_origin(
            origin
                .parse::<HeaderValue>()
                .context("Failed to parse CORS_ORIGIN")?,
        ),
        None => layer.allow_origin(Any),
    })
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("fixmyarea=info".parse()?),
        )
        .json()
        .init();

    info!("Starting FixMyArea server...");

    let config = Config::from_env()?;

    let db = DbManager::connect(&config.database)
        .await
        .context("Failed to connect to SurrealDB")?;

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let state = AppState::new(
        db.client().clone(),
        config.auth.clone(),
        notifier(&config),
        clock,
        chrono::Duration::seconds(config.location_cache_ttl_secs),
    );

    let app = fixmyarea_api::router(state).layer(cors(&config)?);

    let addr = config.server_addr();
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;
    info!(%addr, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Failed to serve application")?;

    info!("FixMyArea server stopped.");
    Ok(())
}
