use std::sync::Arc;

use anyhow::Result;

use sest_types::models::{Channel, ChannelId, FieldEncoding, NewField, Record};

/// Persistence seen from the ingestion core.
///
/// `save_record` must be atomic: either the record and every one of its
/// fields are stored and the channel's `last_update` is refreshed, or
/// nothing is.
pub trait RecordStore {
    fn channel(&self, id: ChannelId) -> Result<Option<Channel>>;

    fn field_encodings(&self, channel_id: ChannelId) -> Result<Vec<FieldEncoding>>;

    /// Current encoding of one slot, read fresh on every call.
    fn field_encoding(&self, channel_id: ChannelId, field_no: u32) -> Result<Option<FieldEncoding>>;

    fn save_record(&self, channel_id: ChannelId, fields: &[NewField]) -> Result<Record>;
}

impl<T: RecordStore + ?Sized> RecordStore for Arc<T> {
    fn channel(&self, id: ChannelId) -> Result<Option<Channel>> {
        (**self).channel(id)
    }

    fn field_encodings(&self, channel_id: ChannelId) -> Result<Vec<FieldEncoding>> {
        (**self).field_encodings(channel_id)
    }

    fn field_encoding(&self, channel_id: ChannelId, field_no: u32) -> Result<Option<FieldEncoding>> {
        (**self).field_encoding(channel_id, field_no)
    }

    fn save_record(&self, channel_id: ChannelId, fields: &[NewField]) -> Result<Record> {
        (**self).save_record(channel_id, fields)
    }
}
