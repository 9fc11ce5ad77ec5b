use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{post, put},
    Json, Router,
};
use tracing::{debug, error, instrument};

use crate::{
    reset::{
        dto::{ResetPasswordRequest, ResetTokenRequest, ACK},
        extractors::RequestOrigin,
        services::PasswordResets,
    },
    state::AppState,
};

pub fn reset_routes() -> Router<AppState> {
    Router::new()
        .route("/get_reset_token", post(get_reset_token))
        .route("/reset_password/:token", put(reset_password))
}

#[instrument(skip_all)]
pub async fn get_reset_token(
    State(state): State<AppState>,
    origin: RequestOrigin,
    Json(payload): Json<ResetTokenRequest>,
) -> Result<Json<i32>, (StatusCode, String)> {
    let outcome = PasswordResets::from_state(&state)
        .request_token(&payload.username, &origin)
        .await
        .map_err(internal)?;
    debug!(outcome = ?outcome, "get_reset_token handled");
    Ok(Json(ACK))
}

#[instrument(skip_all)]
pub async fn reset_password(
    State(state): State<AppState>,
    Path(token): Path<String>,
    Json(payload): Json<ResetPasswordRequest>,
) -> Result<Json<i32>, (StatusCode, String)> {
    let password = payload.password.as_deref().unwrap_or_default();
    let confirm = payload.passwordconfirm.as_deref().unwrap_or_default();
    let outcome = PasswordResets::from_state(&state)
        .redeem_token(&token, password, confirm)
        .await
        .map_err(internal)?;
    debug!(outcome = ?outcome, "reset_password handled");
    Ok(Json(ACK))
}

fn internal(e: anyhow::Error) -> (StatusCode, String) {
    error!(error = ?e, "password reset failed");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "Internal server error".into(),
    )
}
