//! Database row types. These map directly to SQLite rows.
//! Converted into sest-types models at the crate boundary.

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use uuid::Uuid;

use sest_codec::{Encoding, StoredValue};
use sest_types::models::{Channel, Field, FieldEncoding, Record, User};

pub struct UserRow {
    pub id: i64,
    pub nick: String,
    pub registration_time: String,
}

pub struct ChannelRow {
    pub id: i64,
    pub user_id: i64,
    pub write_key: String,
    pub last_update: String,
    pub number_fields: u32,
    pub notification_email: Option<String>,
}

pub struct FieldEncodingRow {
    pub channel_id: i64,
    pub field_no: u32,
    pub encoding: String,
}

pub struct RecordRow {
    pub id: i64,
    pub channel_id: i64,
    pub created_at: String,
}

pub struct FieldRow {
    pub id: i64,
    pub record_id: i64,
    pub field_no: u32,
    pub raw_value: String,
}

impl TryFrom<UserRow> for User {
    type Error = anyhow::Error;

    fn try_from(row: UserRow) -> Result<Self> {
        Ok(User {
            registration_time: parse_timestamp(&row.registration_time)
                .with_context(|| format!("user {}", row.id))?,
            id: row.id,
            nick: row.nick,
        })
    }
}

impl TryFrom<ChannelRow> for Channel {
    type Error = anyhow::Error;

    fn try_from(row: ChannelRow) -> Result<Self> {
        let write_key: Uuid = row
            .write_key
            .parse()
            .with_context(|| format!("corrupt write key on channel {}", row.id))?;
        Ok(Channel {
            last_update: parse_timestamp(&row.last_update)
                .with_context(|| format!("channel {}", row.id))?,
            id: row.id,
            user_id: row.user_id,
            write_key,
            number_fields: row.number_fields,
            notification_email: row.notification_email,
        })
    }
}

impl From<FieldEncodingRow> for FieldEncoding {
    fn from(row: FieldEncodingRow) -> Self {
        FieldEncoding {
            channel_id: row.channel_id,
            field_no: row.field_no,
            encoding: Encoding::from(row.encoding),
        }
    }
}

impl TryFrom<RecordRow> for Record {
    type Error = anyhow::Error;

    fn try_from(row: RecordRow) -> Result<Self> {
        Ok(Record {
            created_at: parse_timestamp(&row.created_at)
                .with_context(|| format!("record {}", row.id))?,
            id: row.id,
            channel_id: row.channel_id,
        })
    }
}

impl From<FieldRow> for Field {
    fn from(row: FieldRow) -> Self {
        Field {
            id: row.id,
            record_id: row.record_id,
            field_no: row.field_no,
            raw: StoredValue::from(row.raw_value),
        }
    }
}

/// Timestamp format written by this crate. Fixed width, so text order is
/// time order.
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    s.parse::<DateTime<Utc>>()
        .or_else(|_| {
            // SQLite's datetime('now') has no timezone; it is UTC.
            NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .with_context(|| format!("corrupt timestamp '{}'", s))
}
