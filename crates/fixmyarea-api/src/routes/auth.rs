//! `/auth` — registration, login and session management.

use axum::Router;
use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use fixmyarea_auth::service::{LoginInput, RegisterInput};
use serde_json::json;
use surrealdb::Connection;

use crate::error::ApiResult;
use crate::extract::{ApiJson, AuthUser};
use crate::response::{created, ok};
use crate::state::AppState;

pub fn routes<C: Connection>() -> Router<AppState<C>> {
    Router::new()
        .route("/register", post(register::<C>))
        .route("/login", post(login::<C>))
        .route("/refresh", post(refresh::<C>))
        .route("/me", get(me::<C>))
}

async fn register<C: Connection>(
    State(state): State<AppState<C>>,
    ApiJson(input): ApiJson<RegisterInput>,
) -> ApiResult<impl IntoResponse> {
    let session = state.auth.register(input).await?;
    Ok(created(Some("User registered successfully"), session))
}

async fn login<C: Connection>(
    State(state): State<AppState<C>>,
    ApiJson(input): ApiJson<LoginInput>,
) -> ApiResult<impl IntoResponse> {
    let session = state.auth.login(input).await?;
    Ok(ok(session))
}

async fn refresh<C: Connection>(
    State(state): State<AppState<C>>,
    AuthUser(identity): AuthUser,
) -> ApiResult<impl IntoResponse> {
    let token = state.auth.refresh(&identity).await?;
    Ok(ok(json!({ "token": token })))
}

async fn me<C: Connection>(
    State(state): State<AppState<C>>,
    AuthUser(identity): AuthUser,
) -> ApiResult<impl IntoResponse> {
    let user = state.auth.current_user(&identity).await?;
    Ok(ok(user))
}
