use std::sync::Arc;

use tracing::error;

use sest_core::{EventBus, IngestionPipeline, ParsePolicy};
use sest_db::Database;

use crate::error::ApiError;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Arc<Database>,
    pub pipeline: IngestionPipeline<Arc<Database>>,
    pub events: EventBus,
    /// Bearer token for the admin routes; `None` disables them.
    pub admin_token: Option<String>,
}

impl AppStateInner {
    pub fn new(db: Arc<Database>, policy: ParsePolicy, admin_token: Option<String>) -> Self {
        let events = EventBus::default();
        let pipeline = IngestionPipeline::new(db.clone())
            .with_policy(policy)
            .with_events(events.clone());

        Self {
            db,
            pipeline,
            events,
            admin_token,
        }
    }
}

/// Run blocking database work off the async runtime.
pub async fn run_blocking<F, T>(state: &AppState, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&AppStateInner) -> Result<T, ApiError> + Send + 'static,
    T: Send + 'static,
{
    let state = state.clone();
    tokio::task::spawn_blocking(move || f(&state))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::internal(e)
        })?
}
