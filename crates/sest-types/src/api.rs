use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use sest_codec::{Encoding, TypedValue};

use crate::models::{ChannelId, FieldEncoding, RecordId, UserId};

// -- Upload --

#[derive(Debug, Serialize, Deserialize)]
pub struct UploadResponse {
    pub record_id: RecordId,
    pub channel_id: ChannelId,
    pub fields: usize,
    /// Slots whose value was stored without passing its encoding check.
    pub unvalidated: Vec<u32>,
}

// -- Users --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateUserRequest {
    pub nick: String,
}

// -- Channels --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateChannelRequest {
    pub user_id: UserId,
    /// Explicit channel id; allocated by the database when absent.
    pub id: Option<ChannelId>,
    pub number_fields: u32,
    pub notification_email: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChannelResponse {
    pub id: ChannelId,
    pub user_id: UserId,
    pub write_key: Uuid,
    pub last_update: DateTime<Utc>,
    pub number_fields: u32,
    pub notification_email: Option<String>,
    pub encodings: Vec<FieldEncoding>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct WriteKeyResponse {
    pub channel_id: ChannelId,
    pub write_key: Uuid,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SetEncodingRequest {
    pub encoding: Encoding,
}

// -- Records --

#[derive(Debug, Serialize, Deserialize)]
pub struct RecordResponse {
    pub id: RecordId,
    pub channel_id: ChannelId,
    pub created_at: DateTime<Utc>,
    pub fields: Vec<FieldResponse>,
}

/// A field as returned to readers. Exactly one of `value` / `error` is set.
#[derive(Debug, Serialize, Deserialize)]
pub struct FieldResponse {
    pub field_no: u32,
    pub raw: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<TypedValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<FieldErrorBody>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FieldErrorBody {
    pub kind: String,
    pub message: String,
}
