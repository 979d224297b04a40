//! `/otp` — send, resend and verify one-time codes.

use axum::Router;
use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::post;
use fixmyarea_auth::service::{ResendOtpInput, SendOtpInput, VerifyOtpInput};
use surrealdb::Connection;

use crate::error::ApiResult;
use crate::extract::ApiJson;
use crate::response::ok_with;
use crate::state::AppState;

pub fn routes<C: Connection>() -> Router<AppState<C>> {
    Router::new()
        .route("/send-registration", post(send_registration::<C>))
        .route("/send-login", post(send_login::<C>))
        .route("/resend", post(resend::<C>))
        .route("/verify", post(verify::<C>))
}

async fn send_registration<C: Connection>(
    State(state): State<AppState<C>>,
    ApiJson(input): ApiJson<SendOtpInput>,
) -> ApiResult<impl IntoResponse> {
    let sent = state.auth.send_registration_otp(input).await?;
    Ok(ok_with("OTP sent successfully", sent))
}

async fn send_login<C: Connection>(
    State(state): State<AppState<C>>,
    ApiJson(input): ApiJson<SendOtpInput>,
) -> ApiResult<impl IntoResponse> {
    let sent = state.auth.send_login_otp(input).await?;
    Ok(ok_with("OTP sent successfully", sent))
}

async fn resend<C: Connection>(
    State(state): State<AppState<C>>,
    ApiJson(input): ApiJson<ResendOtpInput>,
) -> ApiResult<impl IntoResponse> {
    let sent = state.auth.resend_otp(input).await?;
    Ok(ok_with("OTP resent successfully", sent))
}

async fn verify<C: Connection>(
    State(state): State<AppState<C>>,
    ApiJson(input): ApiJson<VerifyOtpInput>,
) -> ApiResult<impl IntoResponse> {
    let verified = state.auth.verify_otp(input).await?;
    Ok(ok_with("OTP verified successfully", verified))
}
