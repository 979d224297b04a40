//! `/dogs` — stray dog records and their sub-state transitions.

use std::str::FromStr;

use axum::Router;
use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::{get, patch, post};
use fixmyarea_core::error::FixMyAreaError;
use fixmyarea_core::models::dog::{DogFilter, UpdateDogDetails};
use fixmyarea_core::models::user::Role;
use fixmyarea_records::dog::{
    AddPhotosInput, CloseInput, CreateDogInput, LinkComplaintInput, NoteInput,
    SterilizationInput, TransferInput, VaccinationInput,
};
use serde::Deserialize;
use surrealdb::Connection;
use uuid::Uuid;

use crate::error::ApiResult;
use crate::extract::{ApiJson, ApiPath, ApiQuery, AuthUser};
use crate::response::{created, ok, ok_with};
use crate::state::AppState;

const FIELD_WORKERS: &[Role] = &[Role::Staff, Role::Admin];

pub fn routes<C: Connection>() -> Router<AppState<C>> {
    Router::new()
        .route("/", get(list::<C>).post(create::<C>))
        .route("/aggressive", get(aggressive::<C>))
        .route("/vaccination-due", get(vaccination_due::<C>))
        .route("/by-location", get(by_location::<C>))
        .route("/by-health", get(by_health::<C>))
        .route(
            "/{id}",
            get(show::<C>).put(update_details::<C>).delete(remove::<C>),
        )
        .route("/{id}/vaccination", patch(vaccination::<C>))
        .route("/{id}/sterilization", patch(sterilization::<C>))
        .route("/{id}/transfer", patch(transfer::<C>))
        .route("/{id}/close", patch(close::<C>))
        .route("/{id}/notes", post(add_note::<C>))
        .route("/{id}/photos", post(add_photos::<C>))
        .route("/{id}/complaints", post(link_complaint::<C>))
}

/// Raw list filters. `"all"` or an empty value means "no filter".
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DogQuery {
    status: Option<String>,
    #[serde(alias = "vaccination")]
    vaccination_status: Option<String>,
    #[serde(alias = "sterilization")]
    sterilization_status: Option<String>,
    #[serde(alias = "aggressive")]
    is_aggressive: Option<String>,
    state: Option<String>,
    district: Option<String>,
    village: Option<String>,
}

fn selected(raw: Option<String>) -> Option<String> {
    raw.map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty() && value != "all")
}

fn parsed<T>(raw: Option<String>) -> Result<Option<T>, FixMyAreaError>
where
    T: FromStr<Err = FixMyAreaError>,
{
    selected(raw).map(|value| value.parse()).transpose()
}

fn flag(raw: Option<String>) -> Result<Option<bool>, FixMyAreaError> {
    match selected(raw).as_deref() {
        None => Ok(None),
        Some("true") => Ok(Some(true)),
        Some("false") => Ok(Some(false)),
        Some(other) => Err(FixMyAreaError::validation(format!(
            "Invalid aggressive flag: {other}"
        ))),
    }
}

impl DogQuery {
    fn into_filter(self) -> Result<DogFilter, FixMyAreaError> {
        Ok(DogFilter {
            status: parsed(self.status)?,
            vaccination_status: parsed(self.vaccination_status)?,
            sterilization_status: parsed(self.sterilization_status)?,
            is_aggressive: flag(self.is_aggressive)?,
            state: selected(self.state),
            district: selected(self.district),
            village: selected(self.village),
            ..DogFilter::default()
        })
    }
}

async fn list<C: Connection>(
    State(state): State<AppState<C>>,
    user: AuthUser,
    ApiQuery(query): ApiQuery<DogQuery>,
) -> ApiResult<impl IntoResponse> {
    user.require(FIELD_WORKERS)?;
    let filter = query.into_filter()?;
    Ok(ok(state.dogs.list(filter).await?))
}

async fn create<C: Connection>(
    State(state): State<AppState<C>>,
    user: AuthUser,
    ApiJson(input): ApiJson<CreateDogInput>,
) -> ApiResult<impl IntoResponse> {
    let creator = user.require(FIELD_WORKERS)?;
    let dog = state.dogs.create(creator, input).await?;
    Ok(created(Some("Dog record created successfully"), dog))
}

async fn show<C: Connection>(
    State(state): State<AppState<C>>,
    user: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<impl IntoResponse> {
    user.require(FIELD_WORKERS)?;
    Ok(ok(state.dogs.get(id).await?))
}

async fn update_details<C: Connection>(
    State(state): State<AppState<C>>,
    user: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(input): ApiJson<UpdateDogDetails>,
) -> ApiResult<impl IntoResponse> {
    user.require(FIELD_WORKERS)?;
    let dog = state.dogs.update_details(id, input).await?;
    Ok(ok_with("Dog record updated successfully", dog))
}

async fn remove<C: Connection>(
    State(state): State<AppState<C>>,
    user: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let admin = user.require(&[Role::Admin])?;
    state.dogs.delete(admin, id).await?;
    Ok(ok_with("Dog record deleted successfully", serde_json::Value::Null))
}

async fn vaccination<C: Connection>(
    State(state): State<AppState<C>>,
    user: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(input): ApiJson<VaccinationInput>,
) -> ApiResult<impl IntoResponse> {
    user.require(FIELD_WORKERS)?;
    let dog = state.dogs.update_vaccination(id, input).await?;
    Ok(ok_with("Vaccination status updated successfully", dog))
}

async fn sterilization<C: Connection>(
    State(state): State<AppState<C>>,
    user: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(input): ApiJson<SterilizationInput>,
) -> ApiResult<impl IntoResponse> {
    user.require(FIELD_WORKERS)?;
    let dog = state.dogs.update_sterilization(id, input).await?;
    Ok(ok_with("Sterilization status updated successfully", dog))
}

async fn transfer<C: Connection>(
    State(state): State<AppState<C>>,
    user: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(input): ApiJson<TransferInput>,
) -> ApiResult<impl IntoResponse> {
    user.require(FIELD_WORKERS)?;
    let dog = state.dogs.transfer_to_shelter(id, input).await?;
    Ok(ok_with("Dog transferred to shelter successfully", dog))
}

async fn close<C: Connection>(
    State(state): State<AppState<C>>,
    user: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(input): ApiJson<CloseInput>,
) -> ApiResult<impl IntoResponse> {
    user.require(FIELD_WORKERS)?;
    let dog = state.dogs.close(id, input).await?;
    Ok(ok_with("Dog record closed successfully", dog))
}

async fn add_note<C: Connection>(
    State(state): State<AppState<C>>,
    user: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(input): ApiJson<NoteInput>,
) -> ApiResult<impl IntoResponse> {
    let author = user.require(FIELD_WORKERS)?;
    let dog = state.dogs.add_note(author, id, input).await?;
    Ok(ok_with("Note added successfully", dog))
}

async fn add_photos<C: Connection>(
    State(state): State<AppState<C>>,
    user: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(input): ApiJson<AddPhotosInput>,
) -> ApiResult<impl IntoResponse> {
    user.require(FIELD_WORKERS)?;
    let dog = state.dogs.add_photos(id, input).await?;
    Ok(ok_with("Photos added successfully", dog))
}

async fn link_complaint<C: Connection>(
    State(state): State<AppState<C>>,
    user: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(input): ApiJson<LinkComplaintInput>,
) -> ApiResult<impl IntoResponse> {
    user.require(FIELD_WORKERS)?;
    let dog = state.dogs.link_complaint(id, input).await?;
    Ok(ok_with("Complaint linked successfully", dog))
}

async fn aggressive<C: Connection>(
    State(state): State<AppState<C>>,
    user: AuthUser,
) -> ApiResult<impl IntoResponse> {
    user.require(FIELD_WORKERS)?;
    Ok(ok(state.dogs.aggressive().await?))
}

async fn vaccination_due<C: Connection>(
    State(state): State<AppState<C>>,
    user: AuthUser,
) -> ApiResult<impl IntoResponse> {
    user.require(FIELD_WORKERS)?;
    Ok(ok(state.dogs.vaccination_due().await?))
}

async fn by_location<C: Connection>(
    State(state): State<AppState<C>>,
    user: AuthUser,
    ApiQuery(query): ApiQuery<DogQuery>,
) -> ApiResult<impl IntoResponse> {
    user.require(FIELD_WORKERS)?;
    let dogs = state
        .dogs
        .by_location(
            selected(query.state),
            selected(query.district),
            selected(query.village),
        )
        .await?;
    Ok(ok(dogs))
}

async fn by_health<C: Connection>(
    State(state): State<AppState<C>>,
    user: AuthUser,
    ApiQuery(query): ApiQuery<DogQuery>,
) -> ApiResult<impl IntoResponse> {
    user.require(FIELD_WORKERS)?;
    let dogs = state
        .dogs
        .by_health_status(
            parsed(query.vaccination_status)?,
            parsed(query.sterilization_status)?,
        )
        .await?;
    Ok(ok(dogs))
}
