use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};

use sest_types::api::CreateUserRequest;

use crate::error::ApiError;
use crate::state::{AppState, run_blocking};

const MAX_NICK_LEN: usize = 64;

/// POST /users
pub async fn create_user(
    State(state): State<AppState>,
    Json(req): Json<CreateUserRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let nick = req.nick.trim().to_string();
    if nick.is_empty() || nick.chars().count() > MAX_NICK_LEN {
        return Err(ApiError::BadRequest(format!(
            "nick must be 1-{} characters",
            MAX_NICK_LEN
        )));
    }

    let user = run_blocking(&state, move |s| s.db.create_user(&nick).map_err(ApiError::internal))
        .await?;

    Ok((StatusCode::CREATED, Json(user)))
}
