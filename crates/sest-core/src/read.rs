use thiserror::Error;

use sest_codec::{DecodeError, TypedValue};
use sest_types::models::{ChannelId, Field};

use crate::schema::ChannelSchema;
use crate::store::RecordStore;

#[derive(Debug, Error)]
pub enum FieldReadError {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error("store failure: {0:#}")]
    Store(anyhow::Error),
}

/// Typed value of `field`, decoded with the slot's encoding as it is stored
/// right now.
pub fn decode_field<S: RecordStore + ?Sized>(
    store: &S,
    channel_id: ChannelId,
    field: &Field,
) -> Result<TypedValue, FieldReadError> {
    let encoding = store
        .field_encoding(channel_id, field.field_no)
        .map_err(FieldReadError::Store)?
        .ok_or(DecodeError::MissingEncoding {
            field_no: field.field_no,
        })?;

    Ok(sest_codec::decode(&encoding.encoding, &field.raw)?)
}

/// Typed value of `field` against a schema loaded for the current request.
pub fn decode_with(schema: &ChannelSchema, field: &Field) -> Result<TypedValue, DecodeError> {
    let encoding = schema
        .encoding(field.field_no)
        .ok_or(DecodeError::MissingEncoding {
            field_no: field.field_no,
        })?;

    sest_codec::decode(encoding, &field.raw)
}
