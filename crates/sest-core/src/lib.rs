//! Sest ingestion core
//!
//! One upload walks through the pipeline stages
//! `Received -> Authenticated -> Validated -> Parsed -> Persisted`,
//! or stops in a rejection that names the stage it failed at.
//! Persistence is reached through the `RecordStore` trait only.

pub mod auth;
pub mod events;
pub mod notify;
pub mod pipeline;
pub mod read;
pub mod schema;
pub mod store;

pub use auth::AuthError;
pub use events::EventBus;
pub use pipeline::{IngestError, IngestOutcome, IngestionPipeline, ParsePolicy, Stage, UploadRequest};
pub use read::{FieldReadError, decode_field, decode_with};
pub use schema::{ChannelSchema, ValidationError};
pub use store::RecordStore;
