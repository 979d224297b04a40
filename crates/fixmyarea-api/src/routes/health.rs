use axum::Json;
use axum::extract::State;
use serde_json::json;
use surrealdb::Connection;
use tracing::warn;

use crate::state::AppState;

pub async fn health<C: Connection>(State(state): State<AppState<C>>) -> Json<serde_json::Value> {
    let database = match state.db.health().await {
        Ok(_) => "healthy",
        Err(e) => {
            warn!(error = %e, "Database health check failed");
            "unhealthy"
        }
    };

    Json(json!({
        "status": "ok",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "version": env!("CARGO_PKG_VERSION"),
        "services": { "database": database },
    }))
}
