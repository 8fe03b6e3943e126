use std::collections::{BTreeMap, HashMap};

use thiserror::Error;

use sest_codec::Encoding;
use sest_types::models::{Channel, ChannelId, FieldEncoding};

const FIELD_NAME_PREFIX: &str = "field";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("at least one field must be submitted")]
    Empty,

    #[error("{submitted} fields submitted, channel accepts at most {allowed}")]
    TooMany { submitted: usize, allowed: u32 },

    #[error("field {field_no} is outside the channel's slots 1..={number_fields}")]
    OutOfRange { field_no: u32, number_fields: u32 },

    #[error("'{name}' is not a field name (expected field<N>)")]
    MalformedFieldName { name: String },
}

/// Field layout of one channel: how many slots it has and how each one is
/// encoded.
#[derive(Debug, Clone)]
pub struct ChannelSchema {
    channel_id: ChannelId,
    number_fields: u32,
    encodings: BTreeMap<u32, Encoding>,
}

impl ChannelSchema {
    /// Build a schema from a channel and its encoding rows. Rows belonging
    /// to another channel are ignored.
    pub fn new(channel: &Channel, encodings: impl IntoIterator<Item = FieldEncoding>) -> Self {
        let encodings = encodings
            .into_iter()
            .filter(|e| e.channel_id == channel.id)
            .map(|e| (e.field_no, e.encoding))
            .collect();

        Self {
            channel_id: channel.id,
            number_fields: channel.number_fields,
            encodings,
        }
    }

    pub fn channel_id(&self) -> ChannelId {
        self.channel_id
    }

    pub fn number_fields(&self) -> u32 {
        self.number_fields
    }

    pub fn encoding(&self, field_no: u32) -> Option<&Encoding> {
        self.encodings.get(&field_no)
    }

    /// Check a submission keyed by slot number. Returns the pairs in
    /// ascending slot order.
    pub fn validate(
        &self,
        submitted: &BTreeMap<u32, String>,
    ) -> Result<Vec<(u32, String)>, ValidationError> {
        self.check_count(submitted.len())?;

        if let Some(&field_no) = submitted
            .keys()
            .find(|&&n| n == 0 || n > self.number_fields)
        {
            return Err(ValidationError::OutOfRange {
                field_no,
                number_fields: self.number_fields,
            });
        }

        Ok(submitted
            .iter()
            .map(|(n, v)| (*n, v.clone()))
            .collect())
    }

    /// Check a submission keyed by `field<N>` names. Count limits are
    /// applied to the raw submission before any name is looked at.
    pub fn validate_named(
        &self,
        submitted: &HashMap<String, String>,
    ) -> Result<Vec<(u32, String)>, ValidationError> {
        self.check_count(submitted.len())?;

        let mut by_slot = BTreeMap::new();
        for (name, value) in submitted {
            let field_no = parse_field_name(name).ok_or_else(|| {
                ValidationError::MalformedFieldName { name: name.clone() }
            })?;
            by_slot.insert(field_no, value.clone());
        }

        self.validate(&by_slot)
    }

    fn check_count(&self, submitted: usize) -> Result<(), ValidationError> {
        if submitted == 0 {
            return Err(ValidationError::Empty);
        }
        if submitted > self.number_fields as usize {
            return Err(ValidationError::TooMany {
                submitted,
                allowed: self.number_fields,
            });
        }
        Ok(())
    }
}

/// Slot number of a `field<N>` name. `N` must be written without sign or
/// leading zeros, so two names never map to the same slot.
pub fn parse_field_name(name: &str) -> Option<u32> {
    let digits = name.strip_prefix(FIELD_NAME_PREFIX)?;
    if digits.is_empty() || digits.starts_with('0') || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}
