use std::sync::Arc;

use anyhow::Result;
use tokio::sync::broadcast::{Receiver, error::RecvError};
use tracing::{debug, info, warn};

use sest_core::notify::{Mailer, record_created_email};
use sest_db::Database;
use sest_types::events::IngestEvent;

/// Background task that mails the channel owner for every new record.
///
/// Runs until the event bus closes. Falling behind only costs the missed
/// notifications.
pub async fn run_notifier(
    db: Arc<Database>,
    mailer: Arc<dyn Mailer>,
    from: String,
    mut events: Receiver<IngestEvent>,
) {
    loop {
        let event = match events.recv().await {
            Ok(event) => event,
            Err(RecvError::Lagged(skipped)) => {
                warn!("Notifier lagged, {} events skipped", skipped);
                continue;
            }
            Err(RecvError::Closed) => break,
        };

        let db = db.clone();
        let mailer = mailer.clone();
        let from = from.clone();
        let result =
            tokio::task::spawn_blocking(move || notify(&db, mailer.as_ref(), &from, &event)).await;

        match result {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => warn!("Notification failed: {:#}", e),
            Err(e) => warn!("Notification task failed: {}", e),
        }
    }

    info!("Event bus closed, notifier stopped");
}

/// Send the notification for one event. Returns whether a message went out.
fn notify(db: &Database, mailer: &dyn Mailer, from: &str, event: &IngestEvent) -> Result<bool> {
    let Some(channel) = db.get_channel(event.channel_id())? else {
        debug!("Channel {} gone before notification", event.channel_id());
        return Ok(false);
    };

    let Some(message) = record_created_email(&channel, event, from) else {
        return Ok(false);
    };

    mailer.send(&message)?;
    Ok(true)
}
