use std::collections::HashMap;

use axum::{
    Form, Json,
    body::Bytes,
    extract::{FromRequest, Multipart, Path, Request, State},
    http::{HeaderMap, header},
};
use serde_json::Value;

use sest_core::UploadRequest;
use sest_types::api::UploadResponse;
use sest_types::models::ChannelId;

use crate::error::ApiError;
use crate::state::{AppState, run_blocking};

pub const WRITE_KEY_HEADER: &str = "x-write-api-key";

/// Submitted `field<N>` values, from a urlencoded or multipart form or a flat
/// JSON object. An empty body is an empty submission.
#[derive(Debug)]
pub struct UploadFields(pub HashMap<String, String>);

impl<S> FromRequest<S> for UploadFields
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let content_type = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|ct| ct.to_ascii_lowercase());
        let declared_empty = req
            .headers()
            .get(header::CONTENT_LENGTH)
            .is_some_and(|v| v.as_bytes() == b"0");

        // A bodiless POST is an empty submission, not a malformed one
        if declared_empty {
            return Ok(Self(HashMap::new()));
        }
        let Some(content_type) = content_type else {
            let body = Bytes::from_request(req, state)
                .await
                .map_err(|e| ApiError::BadRequest(e.body_text()))?;
            if body.is_empty() {
                return Ok(Self(HashMap::new()));
            }
            return Err(ApiError::BadRequest("missing Content-Type".into()));
        };

        if content_type.starts_with("multipart/form-data") {
            let multipart = Multipart::from_request(req, state)
                .await
                .map_err(|e| ApiError::BadRequest(e.body_text()))?;
            Ok(Self(multipart_fields(multipart).await?))
        } else if content_type.starts_with("application/json") {
            let Json(object) = Json::<serde_json::Map<String, Value>>::from_request(req, state)
                .await
                .map_err(|e| ApiError::BadRequest(e.body_text()))?;
            let fields = object
                .into_iter()
                .map(|(name, value)| {
                    let raw = json_to_raw(&name, value)?;
                    Ok((name, raw))
                })
                .collect::<Result<HashMap<_, _>, ApiError>>()?;
            Ok(Self(fields))
        } else {
            let Form(fields) = Form::<HashMap<String, String>>::from_request(req, state)
                .await
                .map_err(|e| ApiError::BadRequest(e.body_text()))?;
            Ok(Self(fields))
        }
    }
}

async fn multipart_fields(mut multipart: Multipart) -> Result<HashMap<String, String>, ApiError> {
    let mut fields = HashMap::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Multipart error: {}", e)))?
    {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };
        let value = field
            .text()
            .await
            .map_err(|e| ApiError::BadRequest(format!("Multipart error: {}", e)))?;
        fields.insert(name, value);
    }
    Ok(fields)
}

fn json_to_raw(name: &str, value: Value) -> Result<String, ApiError> {
    match value {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        _ => Err(ApiError::BadRequest(format!(
            "field '{}' must be a string, number or boolean",
            name
        ))),
    }
}

/// POST /{channel_id}/upload/
pub async fn upload(
    State(state): State<AppState>,
    Path(channel_id): Path<ChannelId>,
    headers: HeaderMap,
    UploadFields(fields): UploadFields,
) -> Result<Json<UploadResponse>, ApiError> {
    let write_key = headers
        .get(WRITE_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let req = UploadRequest {
        channel_id,
        write_key,
        fields,
    };

    let outcome = run_blocking(&state, move |s| Ok(s.pipeline.ingest(&req)?)).await?;

    Ok(Json(UploadResponse {
        record_id: outcome.record.id,
        channel_id: outcome.record.channel_id,
        fields: outcome.field_count,
        unvalidated: outcome.unvalidated,
    }))
}

/// Any other method on the upload route.
pub async fn wrong_method() -> ApiError {
    ApiError::BadRequest("uploads must use POST".into())
}
