//! `/users` — administration and profile self-service.

use axum::Router;
use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::{get, patch, put};
use fixmyarea_auth::service::{AdminUserUpdate, CreateStaffInput, ProfileUpdate};
use fixmyarea_core::models::user::{Role, UserFilter};
use surrealdb::Connection;
use uuid::Uuid;

use crate::error::ApiResult;
use crate::extract::{ApiJson, ApiPath, ApiQuery, AuthUser};
use crate::response::{created, ok, ok_with};
use crate::state::AppState;

pub fn routes<C: Connection>() -> Router<AppState<C>> {
    Router::new()
        .route("/", get(list::<C>).post(create_staff::<C>))
        .route("/profile", put(update_profile::<C>))
        .route("/{id}", patch(update_user::<C>))
}

async fn list<C: Connection>(
    State(state): State<AppState<C>>,
    user: AuthUser,
    ApiQuery(filter): ApiQuery<UserFilter>,
) -> ApiResult<impl IntoResponse> {
    user.require(&[Role::Admin])?;
    let users = state.auth.list_users(filter).await?;
    Ok(ok(users))
}

async fn create_staff<C: Connection>(
    State(state): State<AppState<C>>,
    user: AuthUser,
    ApiJson(input): ApiJson<CreateStaffInput>,
) -> ApiResult<impl IntoResponse> {
    user.require(&[Role::Admin])?;
    let created_user = state.auth.create_staff(input).await?;
    Ok(created(Some("User created successfully"), created_user))
}

async fn update_user<C: Connection>(
    State(state): State<AppState<C>>,
    user: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(input): ApiJson<AdminUserUpdate>,
) -> ApiResult<impl IntoResponse> {
    user.require(&[Role::Admin])?;
    let updated = state.auth.update_user(id, input).await?;
    Ok(ok_with("User updated successfully", updated))
}

async fn update_profile<C: Connection>(
    State(state): State<AppState<C>>,
    AuthUser(identity): AuthUser,
    ApiJson(input): ApiJson<ProfileUpdate>,
) -> ApiResult<impl IntoResponse> {
    let updated = state.auth.update_profile(&identity, input).await?;
    Ok(ok_with("Profile updated successfully", updated))
}
