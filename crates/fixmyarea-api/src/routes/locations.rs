//! `/locations` — public state/district/village catalog.

use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use fixmyarea_core::error::FixMyAreaError;
use serde::Deserialize;
use surrealdb::Connection;

use crate::error::ApiResult;
use crate::extract::ApiQuery;
use crate::state::AppState;

pub fn routes<C: Connection>() -> Router<AppState<C>> {
    Router::new()
        .route("/states", get(states::<C>))
        .route("/districts", get(districts::<C>))
        .route("/villages", get(villages::<C>))
}

#[derive(Debug, Deserialize)]
struct LocationQuery {
    state: Option<String>,
    district: Option<String>,
}

fn required(value: Option<String>, name: &str) -> Result<String, FixMyAreaError> {
    value
        .filter(|value| !value.trim().is_empty())
        .ok_or_else(|| FixMyAreaError::validation(format!("{name} is required")))
}

async fn states<C: Connection>(State(state): State<AppState<C>>) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.locations.states().await?))
}

async fn districts<C: Connection>(
    State(state): State<AppState<C>>,
    ApiQuery(query): ApiQuery<LocationQuery>,
) -> ApiResult<impl IntoResponse> {
    let name = required(query.state, "State")?;
    Ok(Json(state.locations.districts(&name).await?))
}

async fn villages<C: Connection>(
    State(state): State<AppState<C>>,
    ApiQuery(query): ApiQuery<LocationQuery>,
) -> ApiResult<impl IntoResponse> {
    let name = required(query.state, "State")?;
    let district = required(query.district, "District")?;
    Ok(Json(state.locations.villages(&name, &district).await?))
}
