use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::info;

use sest_codec::Encoding;
use sest_db::{Database, NewChannel, is_unique_violation};
use sest_types::api::{
    ChannelResponse, CreateChannelRequest, SetEncodingRequest, WriteKeyResponse,
};
use sest_types::models::{Channel, ChannelId, MAX_NUMBER_FIELDS};

use crate::error::ApiError;
use crate::state::{AppState, run_blocking};

fn channel_response(db: &Database, channel: Channel) -> Result<ChannelResponse, ApiError> {
    let encodings = db.get_field_encodings(channel.id).map_err(ApiError::internal)?;
    Ok(ChannelResponse {
        id: channel.id,
        user_id: channel.user_id,
        write_key: channel.write_key,
        last_update: channel.last_update,
        number_fields: channel.number_fields,
        notification_email: channel.notification_email,
        encodings,
    })
}

fn load_channel(db: &Database, id: ChannelId) -> Result<Channel, ApiError> {
    db.get_channel(id)
        .map_err(ApiError::internal)?
        .ok_or_else(|| ApiError::NotFound(format!("channel {}", id)))
}

/// POST /channels
pub async fn create_channel(
    State(state): State<AppState>,
    Json(req): Json<CreateChannelRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if !(1..=MAX_NUMBER_FIELDS).contains(&req.number_fields) {
        return Err(ApiError::BadRequest(format!(
            "number_fields must be between 1 and {}",
            MAX_NUMBER_FIELDS
        )));
    }

    let notification_email = req
        .notification_email
        .map(|e| e.trim().to_string())
        .filter(|e| !e.is_empty());

    let response = run_blocking(&state, move |s| {
        if s.db.get_user(req.user_id).map_err(ApiError::internal)?.is_none() {
            return Err(ApiError::NotFound(format!("user {}", req.user_id)));
        }
        let channel = s
            .db
            .create_channel(&NewChannel {
                id: req.id,
                user_id: req.user_id,
                number_fields: req.number_fields,
                notification_email,
            })
            .map_err(|e| {
                if let (true, Some(id)) = (is_unique_violation(&e), req.id) {
                    ApiError::Conflict(format!("channel {} already exists", id))
                } else {
                    ApiError::internal(e)
                }
            })?;
        channel_response(&s.db, channel)
    })
    .await?;

    Ok((StatusCode::CREATED, Json(response)))
}

/// GET /channels/{channel_id}
pub async fn get_channel(
    State(state): State<AppState>,
    Path(channel_id): Path<ChannelId>,
) -> Result<Json<ChannelResponse>, ApiError> {
    let response = run_blocking(&state, move |s| {
        let channel = load_channel(&s.db, channel_id)?;
        channel_response(&s.db, channel)
    })
    .await?;

    Ok(Json(response))
}

/// DELETE /channels/{channel_id}
pub async fn delete_channel(
    State(state): State<AppState>,
    Path(channel_id): Path<ChannelId>,
) -> Result<StatusCode, ApiError> {
    let deleted = run_blocking(&state, move |s| {
        s.db.delete_channel(channel_id).map_err(ApiError::internal)
    })
    .await?;

    if deleted {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound(format!("channel {}", channel_id)))
    }
}

/// POST /channels/{channel_id}/write_key
pub async fn regenerate_write_key(
    State(state): State<AppState>,
    Path(channel_id): Path<ChannelId>,
) -> Result<Json<WriteKeyResponse>, ApiError> {
    let write_key = run_blocking(&state, move |s| {
        s.db.regenerate_write_key(channel_id)
            .map_err(ApiError::internal)?
            .ok_or_else(|| ApiError::NotFound(format!("channel {}", channel_id)))
    })
    .await?;

    Ok(Json(WriteKeyResponse {
        channel_id,
        write_key,
    }))
}

/// PUT /channels/{channel_id}/fields/{field_no}
///
/// Only known encodings can be assigned through the API.
pub async fn set_field_encoding(
    State(state): State<AppState>,
    Path((channel_id, field_no)): Path<(ChannelId, u32)>,
    Json(req): Json<SetEncodingRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if !req.encoding.is_known() {
        let known: Vec<String> = Encoding::KNOWN.iter().map(Encoding::to_string).collect();
        return Err(ApiError::BadRequest(format!(
            "unsupported encoding '{}' (expected one of: {})",
            req.encoding,
            known.join(", ")
        )));
    }

    let encoding = run_blocking(&state, move |s| {
        let channel = load_channel(&s.db, channel_id)?;
        if !channel.has_slot(field_no) {
            return Err(ApiError::BadRequest(format!(
                "field {} is outside 1..={}",
                field_no, channel.number_fields
            )));
        }
        s.db.set_field_encoding(channel_id, field_no, &req.encoding)
            .map_err(ApiError::internal)
    })
    .await?;

    info!(
        "Channel {} field {} encoding set to {}",
        channel_id, field_no, encoding.encoding
    );
    Ok(Json(encoding))
}
