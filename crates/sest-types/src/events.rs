use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{ChannelId, RecordId};

/// Events published by the ingestion pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum IngestEvent {
    /// A record and all of its fields were persisted
    RecordCreated {
        channel_id: ChannelId,
        record_id: RecordId,
        field_count: usize,
        at: DateTime<Utc>,
    },
}

impl IngestEvent {
    pub fn channel_id(&self) -> ChannelId {
        match self {
            Self::RecordCreated { channel_id, .. } => *channel_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_created_wire_format() {
        let at = "2024-01-02T03:04:05Z".parse::<DateTime<Utc>>().unwrap();
        let event = IngestEvent::RecordCreated {
            channel_id: 1234,
            record_id: 1,
            field_count: 2,
            at,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "RecordCreated");
        assert_eq!(json["data"]["channel_id"], 1234);
        assert_eq!(event.channel_id(), 1234);
    }
}
