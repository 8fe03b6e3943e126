use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use thiserror::Error;
use tracing::{debug, info, warn};

use sest_codec::{ParseError, StoredValue};
use sest_types::events::IngestEvent;
use sest_types::models::{ChannelId, NewField, Record};

use crate::auth::{self, AuthError};
use crate::events::EventBus;
use crate::schema::{ChannelSchema, ValidationError};
use crate::store::RecordStore;

/// What to do with a value that does not fit its slot's encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParsePolicy {
    /// Store the value verbatim; it will fail when decoded.
    #[default]
    Lenient,
    /// Reject the whole record.
    Strict,
}

#[derive(Debug, Error)]
#[error("unknown parse policy '{0}' (expected 'lenient' or 'strict')")]
pub struct UnknownPolicy(pub String);

impl FromStr for ParsePolicy {
    type Err = UnknownPolicy;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lenient" => Ok(Self::Lenient),
            "strict" => Ok(Self::Strict),
            _ => Err(UnknownPolicy(s.to_string())),
        }
    }
}

/// Pipeline stages, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
    Received,
    Authenticated,
    Validated,
    Parsed,
    Persisted,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Received => "received",
            Self::Authenticated => "authenticated",
            Self::Validated => "validated",
            Self::Parsed => "parsed",
            Self::Persisted => "persisted",
        };
        f.write_str(name)
    }
}

/// One upload, as handed over by the transport layer.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub channel_id: ChannelId,
    pub write_key: Option<String>,
    /// `field<N>` name -> raw submitted value
    pub fields: HashMap<String, String>,
}

#[derive(Debug, Clone)]
pub struct IngestOutcome {
    pub record: Record,
    pub field_count: usize,
    /// Slots stored verbatim because their value failed the encoding check.
    pub unvalidated: Vec<u32>,
}

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("authentication failed: {0}")]
    Auth(#[from] AuthError),

    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("field {field_no}: {source}")]
    Parse {
        field_no: u32,
        #[source]
        source: ParseError,
    },

    #[error("store failure after stage '{stage}': {error:#}")]
    Store { stage: Stage, error: anyhow::Error },
}

impl IngestError {
    /// The last stage reached before the upload was rejected.
    pub fn stage(&self) -> Stage {
        match self {
            Self::Auth(_) => Stage::Received,
            Self::Validation(_) => Stage::Authenticated,
            Self::Parse { .. } => Stage::Validated,
            Self::Store { stage, .. } => *stage,
        }
    }

    fn store(stage: Stage) -> impl FnOnce(anyhow::Error) -> Self {
        move |error| Self::Store { stage, error }
    }
}

/// Runs uploads through authentication, validation, parsing and persistence.
#[derive(Debug, Clone)]
pub struct IngestionPipeline<S> {
    store: S,
    policy: ParsePolicy,
    events: Option<EventBus>,
}

impl<S: RecordStore> IngestionPipeline<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            policy: ParsePolicy::default(),
            events: None,
        }
    }

    pub fn with_policy(mut self, policy: ParsePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_events(mut self, events: EventBus) -> Self {
        self.events = Some(events);
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn ingest(&self, req: &UploadRequest) -> Result<IngestOutcome, IngestError> {
        let result = self.run(req);
        if let Err(e) = &result {
            info!(channel_id = req.channel_id, stage = %e.stage(), "upload rejected: {}", e);
        }
        result
    }

    fn run(&self, req: &UploadRequest) -> Result<IngestOutcome, IngestError> {
        debug!(channel_id = req.channel_id, fields = req.fields.len(), "upload {}", Stage::Received);

        let channel = self
            .store
            .channel(req.channel_id)
            .map_err(IngestError::store(Stage::Received))?
            .ok_or_else(|| auth::reject_unknown_channel(req.channel_id, req.write_key.as_deref()))?;
        auth::authenticate(&channel, req.write_key.as_deref())?;
        debug!(channel_id = channel.id, "upload {}", Stage::Authenticated);

        let encodings = self
            .store
            .field_encodings(channel.id)
            .map_err(IngestError::store(Stage::Authenticated))?;
        let schema = ChannelSchema::new(&channel, encodings);
        let pairs = schema.validate_named(&req.fields)?;
        debug!(channel_id = channel.id, "upload {}", Stage::Validated);

        let (fields, unvalidated) = self.parse_fields(&schema, pairs)?;
        debug!(channel_id = channel.id, "upload {}", Stage::Parsed);

        let record = self
            .store
            .save_record(channel.id, &fields)
            .map_err(IngestError::store(Stage::Parsed))?;
        debug!(channel_id = channel.id, record_id = record.id, "upload {}", Stage::Persisted);

        if let Some(events) = &self.events {
            events.publish(IngestEvent::RecordCreated {
                channel_id: channel.id,
                record_id: record.id,
                field_count: fields.len(),
                at: record.created_at,
            });
        }

        Ok(IngestOutcome {
            record,
            field_count: fields.len(),
            unvalidated,
        })
    }

    fn parse_fields(
        &self,
        schema: &ChannelSchema,
        pairs: Vec<(u32, String)>,
    ) -> Result<(Vec<NewField>, Vec<u32>), IngestError> {
        let mut fields = Vec::with_capacity(pairs.len());
        let mut unvalidated = Vec::new();

        for (field_no, raw) in pairs {
            let stored = match schema.encoding(field_no) {
                Some(encoding) => match sest_codec::parse(encoding, &raw) {
                    Ok(stored) => stored,
                    Err(source) if self.policy == ParsePolicy::Lenient => {
                        warn!(
                            channel_id = schema.channel_id(),
                            field_no,
                            encoding = %encoding,
                            "storing value that failed its encoding check: {}",
                            source
                        );
                        unvalidated.push(field_no);
                        sest_codec::store_raw(&raw)
                    }
                    Err(source) => return Err(IngestError::Parse { field_no, source }),
                },
                None => store_unencoded(schema.channel_id(), field_no, &raw),
            };
            fields.push(NewField { field_no, raw: stored });
        }

        Ok((fields, unvalidated))
    }
}

fn store_unencoded(channel_id: ChannelId, field_no: u32, raw: &str) -> StoredValue {
    debug!(channel_id, field_no, "no encoding declared, storing value as submitted");
    sest_codec::store_raw(raw)
}
