//! Analytics event recorder.
//!
//! [`EventRecorder`] subscribes to the [`EventBus`](crate::bus::EventBus)
//! and writes every [`ImportEvent`] to the tracing log under the
//! `wayfarer::analytics` target. It runs as a long-lived background task and
//! stops when the bus is dropped.

use tokio::sync::broadcast;

use crate::bus::ImportEvent;

/// Background service that logs import events.
pub struct EventRecorder;

impl EventRecorder {
    /// Run the recording loop until the channel closes.
    ///
    /// Returns the number of events recorded.
    pub async fn run(mut receiver: broadcast::Receiver<ImportEvent>) -> usize {
        let mut recorded = 0;
        loop {
            match receiver.recv().await {
                Ok(event) => {
                    Self::record(&event);
                    recorded += 1;
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(skipped = n, "Event recorder lagged, some events were dropped");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::info!("Event bus closed, recorder shutting down");
                    break;
                }
            }
        }
        recorded
    }

    fn record(event: &ImportEvent) {
        tracing::info!(
            target: "wayfarer::analytics",
            event_type = %event.event_type,
            import_id = ?event.import_id,
            file_hash = event.file_hash.as_deref().unwrap_or(""),
            payload = %event.payload,
            "Import event"
        );
    }
}
