use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use sest_codec::{Encoding, StoredValue};

/// Upper bound for `Channel::number_fields`, checked when a channel is created.
pub const MAX_NUMBER_FIELDS: u32 = 8;

pub type UserId = i64;
pub type ChannelId = i64;
pub type RecordId = i64;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub nick: String,
    pub registration_time: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Channel {
    pub id: ChannelId,
    pub user_id: UserId,
    pub write_key: Uuid,
    pub last_update: DateTime<Utc>,
    pub number_fields: u32,
    pub notification_email: Option<String>,
}

impl Channel {
    /// Whether `field_no` names one of this channel's slots.
    pub fn has_slot(&self, field_no: u32) -> bool {
        (1..=self.number_fields).contains(&field_no)
    }
}

/// Declared encoding of one channel slot. At most one per `(channel_id, field_no)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldEncoding {
    pub channel_id: ChannelId,
    pub field_no: u32,
    pub encoding: Encoding,
}

/// One ingestion event on a channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: RecordId,
    pub channel_id: ChannelId,
    pub created_at: DateTime<Utc>,
}

/// A stored field value.
///
/// Carries no encoding: the typed value is resolved at read time against the
/// channel's current `FieldEncoding` for `field_no`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub id: i64,
    pub record_id: RecordId,
    pub field_no: u32,
    pub raw: StoredValue,
}

/// A field about to be persisted as part of a new record.
#[derive(Debug, Clone, PartialEq)]
pub struct NewField {
    pub field_no: u32,
    pub raw: StoredValue,
}
