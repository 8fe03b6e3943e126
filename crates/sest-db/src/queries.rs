use crate::Database;
use crate::models::{
    ChannelRow, FieldEncodingRow, FieldRow, RecordRow, UserRow, format_timestamp, parse_timestamp,
};
use anyhow::{Result, anyhow, bail};
use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, params};
use tracing::info;
use uuid::Uuid;

use sest_codec::Encoding;
use sest_types::models::{
    Channel, ChannelId, Field, FieldEncoding, MAX_NUMBER_FIELDS, NewField, Record, RecordId, User,
    UserId,
};

/// Parameters for a new channel. The write key is always generated here.
#[derive(Debug, Clone)]
pub struct NewChannel {
    pub id: Option<ChannelId>,
    pub user_id: UserId,
    pub number_fields: u32,
    pub notification_email: Option<String>,
}

impl Database {
    // -- Users --

    pub fn create_user(&self, nick: &str) -> Result<User> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (nick, registration_time) VALUES (?1, ?2)",
                params![nick, format_timestamp(&Utc::now())],
            )?;
            let id = conn.last_insert_rowid();
            query_user(conn, id)?.ok_or_else(|| anyhow!("user {} missing after insert", id))
        })
    }

    pub fn get_user(&self, id: UserId) -> Result<Option<User>> {
        self.with_conn(|conn| query_user(conn, id))
    }

    // -- Channels --

    pub fn create_channel(&self, new: &NewChannel) -> Result<Channel> {
        if !(1..=MAX_NUMBER_FIELDS).contains(&new.number_fields) {
            bail!(
                "number_fields must be between 1 and {}, got {}",
                MAX_NUMBER_FIELDS,
                new.number_fields
            );
        }

        let write_key = Uuid::new_v4();
        let channel = self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO channels (id, user_id, write_key, last_update, number_fields, notification_email)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    new.id,
                    new.user_id,
                    write_key.to_string(),
                    format_timestamp(&Utc::now()),
                    new.number_fields,
                    new.notification_email,
                ],
            )?;
            let id = conn.last_insert_rowid();
            query_channel(conn, id)?.ok_or_else(|| anyhow!("channel {} missing after insert", id))
        })?;

        info!("Channel {} created for user {}", channel.id, channel.user_id);
        Ok(channel)
    }

    pub fn get_channel(&self, id: ChannelId) -> Result<Option<Channel>> {
        self.with_conn(|conn| query_channel(conn, id))
    }

    /// Delete a channel with its encodings, records and fields.
    /// Returns false if there was no such channel.
    pub fn delete_channel(&self, id: ChannelId) -> Result<bool> {
        let deleted = self.with_conn(|conn| {
            Ok(conn.execute("DELETE FROM channels WHERE id = ?1", [id])?)
        })?;
        if deleted > 0 {
            info!("Channel {} deleted", id);
        }
        Ok(deleted > 0)
    }

    /// Replace the channel's write key. Existing records are untouched.
    pub fn regenerate_write_key(&self, id: ChannelId) -> Result<Option<Uuid>> {
        let write_key = Uuid::new_v4();
        let updated = self.with_conn(|conn| {
            Ok(conn.execute(
                "UPDATE channels SET write_key = ?1 WHERE id = ?2",
                params![write_key.to_string(), id],
            )?)
        })?;

        if updated == 0 {
            return Ok(None);
        }
        info!("Write key rotated for channel {}", id);
        Ok(Some(write_key))
    }

    // -- Field encodings --

    /// Insert or replace the encoding of one slot.
    ///
    /// Any encoding name is accepted at this level, including unknown ones;
    /// restricting the choice is up to the caller.
    pub fn set_field_encoding(
        &self,
        channel_id: ChannelId,
        field_no: u32,
        encoding: &Encoding,
    ) -> Result<FieldEncoding> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let number_fields: u32 = tx
                .query_row(
                    "SELECT number_fields FROM channels WHERE id = ?1",
                    [channel_id],
                    |row| row.get(0),
                )
                .optional()?
                .ok_or_else(|| anyhow!("channel {} not found", channel_id))?;
            if !(1..=number_fields).contains(&field_no) {
                bail!(
                    "field {} is outside channel {}'s slots 1..={}",
                    field_no,
                    channel_id,
                    number_fields
                );
            }

            tx.execute(
                "INSERT INTO field_encodings (channel_id, field_no, encoding) VALUES (?1, ?2, ?3)
                 ON CONFLICT (channel_id, field_no) DO UPDATE SET encoding = excluded.encoding",
                params![channel_id, field_no, encoding.as_str()],
            )?;
            tx.commit()?;

            Ok(FieldEncoding {
                channel_id,
                field_no,
                encoding: encoding.clone(),
            })
        })
    }

    pub fn get_field_encodings(&self, channel_id: ChannelId) -> Result<Vec<FieldEncoding>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT channel_id, field_no, encoding FROM field_encodings
                 WHERE channel_id = ?1 ORDER BY field_no",
            )?;
            let rows = stmt
                .query_map([channel_id], map_field_encoding)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows.into_iter().map(FieldEncoding::from).collect())
        })
    }

    pub fn get_field_encoding(&self, channel_id: ChannelId, field_no: u32) -> Result<Option<FieldEncoding>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    "SELECT channel_id, field_no, encoding FROM field_encodings
                     WHERE channel_id = ?1 AND field_no = ?2",
                    params![channel_id, field_no],
                    map_field_encoding,
                )
                .optional()?;
            Ok(row.map(FieldEncoding::from))
        })
    }

    // -- Records --

    /// Store a record with all of its fields and refresh the channel's
    /// `last_update`, in one transaction.
    pub fn insert_record(&self, channel_id: ChannelId, fields: &[NewField]) -> Result<Record> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let created_at = format_timestamp(&Utc::now());

            tx.execute(
                "INSERT INTO records (channel_id, created_at) VALUES (?1, ?2)",
                params![channel_id, created_at],
            )?;
            let record_id = tx.last_insert_rowid();

            {
                let mut stmt = tx.prepare(
                    "INSERT INTO fields (record_id, field_no, raw_value) VALUES (?1, ?2, ?3)",
                )?;
                for field in fields {
                    stmt.execute(params![record_id, field.field_no, field.raw.as_str()])?;
                }
            }

            let updated = tx.execute(
                "UPDATE channels SET last_update = ?1 WHERE id = ?2",
                params![created_at, channel_id],
            )?;
            if updated == 0 {
                bail!("channel {} not found", channel_id);
            }

            tx.commit()?;

            Ok(Record {
                id: record_id,
                channel_id,
                created_at: parse_timestamp(&created_at)?,
            })
        })
    }

    /// Newest records of a channel first.
    pub fn get_records(&self, channel_id: ChannelId, limit: u32) -> Result<Vec<Record>> {
        let rows = self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, channel_id, created_at FROM records
                 WHERE channel_id = ?1
                 ORDER BY created_at DESC, id DESC
                 LIMIT ?2",
            )?;
            let rows = stmt
                .query_map(params![channel_id, limit], |row| {
                    Ok(RecordRow {
                        id: row.get(0)?,
                        channel_id: row.get(1)?,
                        created_at: row.get(2)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })?;

        rows.into_iter().map(Record::try_from).collect()
    }

    /// Batch-fetch the fields of a set of records, ordered by record then slot.
    pub fn get_fields_for_records(&self, record_ids: &[RecordId]) -> Result<Vec<Field>> {
        if record_ids.is_empty() {
            return Ok(vec![]);
        }

        self.with_conn(|conn| {
            let placeholders: Vec<String> = (1..=record_ids.len()).map(|i| format!("?{}", i)).collect();
            let sql = format!(
                "SELECT id, record_id, field_no, raw_value FROM fields
                 WHERE record_id IN ({})
                 ORDER BY record_id, field_no",
                placeholders.join(", ")
            );

            let mut stmt = conn.prepare(&sql)?;
            let params: Vec<&dyn rusqlite::types::ToSql> = record_ids
                .iter()
                .map(|id| id as &dyn rusqlite::types::ToSql)
                .collect();

            let rows = stmt
                .query_map(params.as_slice(), |row| {
                    Ok(FieldRow {
                        id: row.get(0)?,
                        record_id: row.get(1)?,
                        field_no: row.get(2)?,
                        raw_value: row.get(3)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows.into_iter().map(Field::from).collect())
        })
    }

    /// One stored field, scoped to its channel.
    pub fn get_field(
        &self,
        channel_id: ChannelId,
        record_id: RecordId,
        field_no: u32,
    ) -> Result<Option<Field>> {
        let row = self.with_conn(|conn| {
            Ok(conn
                .query_row(
                    "SELECT f.id, f.record_id, f.field_no, f.raw_value
                     FROM fields f JOIN records r ON r.id = f.record_id
                     WHERE r.channel_id = ?1 AND f.record_id = ?2 AND f.field_no = ?3",
                    params![channel_id, record_id, field_no],
                    |row| {
                        Ok(FieldRow {
                            id: row.get(0)?,
                            record_id: row.get(1)?,
                            field_no: row.get(2)?,
                            raw_value: row.get(3)?,
                        })
                    },
                )
                .optional()?)
        })?;
        Ok(row.map(Field::from))
    }
}

/// Whether `err` comes from a PRIMARY KEY or UNIQUE constraint, e.g. an
/// explicit channel id that is already taken.
pub fn is_unique_violation(err: &anyhow::Error) -> bool {
    matches!(
        err.downcast_ref::<rusqlite::Error>(),
        Some(rusqlite::Error::SqliteFailure(e, _))
            if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
                || e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}

fn query_user(conn: &Connection, id: UserId) -> Result<Option<User>> {
    let row = conn
        .query_row(
            "SELECT id, nick, registration_time FROM users WHERE id = ?1",
            [id],
            |row| {
                Ok(UserRow {
                    id: row.get(0)?,
                    nick: row.get(1)?,
                    registration_time: row.get(2)?,
                })
            },
        )
        .optional()?;

    row.map(User::try_from).transpose()
}

fn query_channel(conn: &Connection, id: ChannelId) -> Result<Option<Channel>> {
    let row = conn
        .query_row(
            "SELECT id, user_id, write_key, last_update, number_fields, notification_email
             FROM channels WHERE id = ?1",
            [id],
            |row| {
                Ok(ChannelRow {
                    id: row.get(0)?,
                    user_id: row.get(1)?,
                    write_key: row.get(2)?,
                    last_update: row.get(3)?,
                    number_fields: row.get(4)?,
                    notification_email: row.get(5)?,
                })
            },
        )
        .optional()?;

    row.map(Channel::try_from).transpose()
}

fn map_field_encoding(row: &rusqlite::Row<'_>) -> rusqlite::Result<FieldEncodingRow> {
    Ok(FieldEncodingRow {
        channel_id: row.get(0)?,
        field_no: row.get(1)?,
        encoding: row.get(2)?,
    })
}
