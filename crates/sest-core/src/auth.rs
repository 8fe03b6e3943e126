use subtle::ConstantTimeEq;
use thiserror::Error;
use uuid::Uuid;

use sest_types::models::{Channel, ChannelId};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("write key missing")]
    MissingKey,

    #[error("write key does not match")]
    KeyMismatch,

    #[error("unknown channel {channel_id}")]
    UnknownChannel { channel_id: ChannelId },
}

/// Check a presented write key against the channel's key.
pub fn authenticate(channel: &Channel, presented: Option<&str>) -> Result<(), AuthError> {
    let presented = presented.ok_or(AuthError::MissingKey)?;

    if keys_match(presented, &channel.write_key) {
        Ok(())
    } else {
        Err(AuthError::KeyMismatch)
    }
}

/// Rejection for an upload to a channel that does not exist. Runs the same
/// comparison as a real mismatch before answering.
pub fn reject_unknown_channel(channel_id: ChannelId, presented: Option<&str>) -> AuthError {
    let Some(presented) = presented else {
        return AuthError::MissingKey;
    };
    std::hint::black_box(keys_match(presented, &Uuid::nil()));
    AuthError::UnknownChannel { channel_id }
}

fn keys_match(presented: &str, expected: &Uuid) -> bool {
    let expected = expected.hyphenated().to_string();
    let presented_bytes = presented.as_bytes();
    let expected_bytes = expected.as_bytes();

    presented_bytes.len() == expected_bytes.len()
        && presented_bytes.ct_eq(expected_bytes).unwrap_u8() == 1
}
