//! `/complaints` — filing, triage and discussion.

use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use fixmyarea_core::models::complaint::UpdateComplaint;
use fixmyarea_core::models::user::Role;
use fixmyarea_records::complaint::{CommentInput, CreateComplaintInput};
use serde_json::json;
use surrealdb::Connection;
use uuid::Uuid;

use crate::error::ApiResult;
use crate::extract::{ApiJson, ApiPath, AuthUser};
use crate::response::{created, ok, ok_with};
use crate::state::AppState;

const STAFF: &[Role] = &[Role::Staff, Role::Admin];

pub fn routes<C: Connection>() -> Router<AppState<C>> {
    Router::new()
        .route("/", post(create::<C>))
        .route("/my-complaints", get(mine::<C>))
        .route("/assigned", get(assigned::<C>))
        .route("/{id}", get(show::<C>).patch(update::<C>))
        .route("/{id}/upvote", post(upvote::<C>))
        .route("/{id}/comments", post(comment::<C>))
}

async fn create<C: Connection>(
    State(state): State<AppState<C>>,
    user: AuthUser,
    ApiJson(input): ApiJson<CreateComplaintInput>,
) -> ApiResult<impl IntoResponse> {
    let resident = user.require(&[Role::Resident])?;
    let complaint = state.complaints.create(resident, input).await?;
    Ok(created(Some("Complaint submitted successfully"), complaint))
}

async fn mine<C: Connection>(
    State(state): State<AppState<C>>,
    user: AuthUser,
) -> ApiResult<impl IntoResponse> {
    let resident = user.require(&[Role::Resident])?;
    Ok(Json(state.complaints.list_mine(resident).await?))
}

async fn assigned<C: Connection>(
    State(state): State<AppState<C>>,
    user: AuthUser,
) -> ApiResult<impl IntoResponse> {
    let staff = user.require(STAFF)?;
    Ok(Json(state.complaints.list_assigned(staff).await?))
}

async fn show<C: Connection>(
    State(state): State<AppState<C>>,
    AuthUser(viewer): AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<impl IntoResponse> {
    Ok(ok(state.complaints.get(&viewer, id).await?))
}

async fn update<C: Connection>(
    State(state): State<AppState<C>>,
    user: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(input): ApiJson<UpdateComplaint>,
) -> ApiResult<impl IntoResponse> {
    let actor = user.require(STAFF)?;
    let complaint = state.complaints.update_status(actor, id, input).await?;
    Ok(Json(json!({
        "message": "Complaint updated successfully",
        "complaint": complaint,
    })))
}

async fn upvote<C: Connection>(
    State(state): State<AppState<C>>,
    AuthUser(voter): AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<impl IntoResponse> {
    Ok(ok(state.complaints.upvote(&voter, id).await?))
}

async fn comment<C: Connection>(
    State(state): State<AppState<C>>,
    AuthUser(author): AuthUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(input): ApiJson<CommentInput>,
) -> ApiResult<impl IntoResponse> {
    let complaint = state.complaints.add_comment(&author, id, input).await?;
    Ok(ok_with("Comment added successfully", complaint))
}
