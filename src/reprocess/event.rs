//! "Reprocess found" event plumbing.
//!
//! After a sweep persists its matches, the service broadcasts one event
//! per user carrying the found results. External listeners (push
//! notification, metrics, a UI) subscribe via
//! [`crate::reprocess::ReprocessService::subscribe`]; the crate ships a
//! logging listener.

use std::collections::HashMap;

use tokio::sync::broadcast;
use tracing::{info, warn};

use super::cache::ReprocessResult;

/// Emitted after a sweep marked requests `FOUND` for a user.
#[derive(Debug, Clone)]
pub struct ReprocessFoundEvent {
    pub user_id: i64,
    /// request id -> the accepted candidate
    pub results: HashMap<i64, ReprocessResult>,
}

/// Spawn a listener that logs every found event until the channel closes.
pub fn spawn_logging_listener(
    mut receiver: broadcast::Receiver<ReprocessFoundEvent>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match receiver.recv().await {
                Ok(event) => {
                    info!(
                        user_id = event.user_id,
                        found = event.results.len(),
                        "Reprocessing found results"
                    );
                }
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    warn!(missed, "Found-event listener lagged");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}
