use std::collections::HashMap;

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::{Deserialize, Serialize};

use sest_codec::TypedValue;
use sest_core::{ChannelSchema, decode_field, decode_with};
use sest_types::api::{FieldErrorBody, FieldResponse, RecordResponse};
use sest_types::models::{ChannelId, Field, RecordId};

use crate::error::ApiError;
use crate::state::{AppState, run_blocking};

const MAX_LIMIT: u32 = 500;

#[derive(Debug, Deserialize)]
pub struct RecordQuery {
    #[serde(default = "default_limit")]
    pub limit: u32,
}

fn default_limit() -> u32 {
    50
}

fn field_response(schema: &ChannelSchema, field: Field) -> FieldResponse {
    let (value, error) = match decode_with(schema, &field) {
        Ok(v) => (Some(v), None),
        Err(e) => (
            None,
            Some(FieldErrorBody {
                kind: e.kind().to_string(),
                message: e.to_string(),
            }),
        ),
    };

    FieldResponse {
        field_no: field.field_no,
        raw: field.raw.into_inner(),
        value,
        error,
    }
}

/// GET /channels/{channel_id}/records
///
/// Newest first. Each field carries either its decoded value or the reason
/// it could not be decoded; one bad field never hides the others.
pub async fn list_records(
    State(state): State<AppState>,
    Path(channel_id): Path<ChannelId>,
    Query(query): Query<RecordQuery>,
) -> Result<Json<Vec<RecordResponse>>, ApiError> {
    let limit = query.limit.clamp(1, MAX_LIMIT);

    let records = run_blocking(&state, move |s| {
        let channel = s
            .db
            .get_channel(channel_id)
            .map_err(ApiError::internal)?
            .ok_or_else(|| ApiError::NotFound(format!("channel {}", channel_id)))?;
        let encodings = s.db.get_field_encodings(channel_id).map_err(ApiError::internal)?;
        let schema = ChannelSchema::new(&channel, encodings);

        let records = s.db.get_records(channel_id, limit).map_err(ApiError::internal)?;
        let ids: Vec<RecordId> = records.iter().map(|r| r.id).collect();
        let fields = s.db.get_fields_for_records(&ids).map_err(ApiError::internal)?;

        let mut by_record: HashMap<RecordId, Vec<FieldResponse>> = HashMap::new();
        for field in fields {
            by_record
                .entry(field.record_id)
                .or_default()
                .push(field_response(&schema, field));
        }

        Ok(records
            .into_iter()
            .map(|r| RecordResponse {
                id: r.id,
                channel_id: r.channel_id,
                created_at: r.created_at,
                fields: by_record.remove(&r.id).unwrap_or_default(),
            })
            .collect::<Vec<_>>())
    })
    .await?;

    Ok(Json(records))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FieldValueResponse {
    pub record_id: RecordId,
    pub field_no: u32,
    pub value: TypedValue,
}

/// GET /channels/{channel_id}/records/{record_id}/fields/{field_no}
///
/// Strict read of a single value: a field that cannot be decoded is an error
/// response, not a partial body.
pub async fn get_field_value(
    State(state): State<AppState>,
    Path((channel_id, record_id, field_no)): Path<(ChannelId, RecordId, u32)>,
) -> Result<Json<FieldValueResponse>, ApiError> {
    let value = run_blocking(&state, move |s| {
        let field = s
            .db
            .get_field(channel_id, record_id, field_no)
            .map_err(ApiError::internal)?
            .ok_or_else(|| {
                ApiError::NotFound(format!("field {} of record {}", field_no, record_id))
            })?;
        Ok(decode_field(s.db.as_ref(), channel_id, &field)?)
    })
    .await?;

    Ok(Json(FieldValueResponse {
        record_id,
        field_no,
        value,
    }))
}
