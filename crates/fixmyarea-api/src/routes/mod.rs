//! HTTP routing.

mod auth;
mod complaints;
mod dogs;
mod health;
mod locations;
mod otp;
mod reports;
mod users;

use axum::Router;
use axum::routing::get;
use surrealdb::Connection;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Every endpoint under `/api`, plus `/health`.
pub fn router<C: Connection>(state: AppState<C>) -> Router {
    let api = Router::new()
        .nest("/otp", otp::routes::<C>())
        .nest("/auth", auth::routes::<C>())
        .nest("/users", users::routes::<C>())
        .nest("/complaints", complaints::routes::<C>())
        .nest("/dogs", dogs::routes::<C>())
        .nest("/reports", reports::routes::<C>())
        .nest("/locations", locations::routes::<C>());

    Router::new()
        .nest("/api", api)
        .route("/health", get(health::health::<C>))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
