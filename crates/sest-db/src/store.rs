use anyhow::Result;

use sest_core::RecordStore;
use sest_types::models::{Channel, ChannelId, FieldEncoding, NewField, Record};

use crate::Database;

impl RecordStore for Database {
    fn channel(&self, id: ChannelId) -> Result<Option<Channel>> {
        self.get_channel(id)
    }

    fn field_encodings(&self, channel_id: ChannelId) -> Result<Vec<FieldEncoding>> {
        self.get_field_encodings(channel_id)
    }

    fn field_encoding(&self, channel_id: ChannelId, field_no: u32) -> Result<Option<FieldEncoding>> {
        self.get_field_encoding(channel_id, field_no)
    }

    fn save_record(&self, channel_id: ChannelId, fields: &[NewField]) -> Result<Record> {
        self.insert_record(channel_id, fields)
    }
}
