use std::sync::Arc;

use crate::model::{Event, Status};
use crate::store::EventStore;

/// Writes a decision to the event log and, for alerts, to the current-event row.
///
/// The two writes are independent: a failure of one is logged and does not
/// undo or skip the other. Divergence between them is not reconciled here.
#[derive(Clone)]
pub struct StatusRecorder {
    events: Arc<dyn EventStore>,
}

impl StatusRecorder {
    pub fn new(events: Arc<dyn EventStore>) -> Self {
        Self { events }
    }

    #[tracing::instrument(skip_all, fields(event_id = event.id, hashid = event.hashid, status = %status))]
    pub async fn record(&self, event: &Event, status: Status) {
        match self.events.save_event_status(event.id, status).await {
            Ok(()) => tracing::info!(
                name = "status.event.saved",
                target = concat!(env!("CARGO_PKG_NAME"), "::", module_path!()),
                hashid = event.hashid,
                status = %status,
                message = "Event status saved"
            ),
            Err(e) => tracing::error!(
                name = "status.event.failed",
                target = concat!(env!("CARGO_PKG_NAME"), "::", module_path!()),
                event_id = event.id,
                status = %status,
                error = %e,
                message = "Failed to save event status"
            ),
        }

        if !event.is_alert() {
            return;
        }

        match self.events.save_event_cur_status(event.hashid, status).await {
            Ok(()) => tracing::info!(
                name = "status.event_cur.saved",
                target = concat!(env!("CARGO_PKG_NAME"), "::", module_path!()),
                hashid = event.hashid,
                status = %status,
                message = "Current event status saved"
            ),
            Err(e) => tracing::error!(
                name = "status.event_cur.failed",
                target = concat!(env!("CARGO_PKG_NAME"), "::", module_path!()),
                hashid = event.hashid,
                status = %status,
                error = %e,
                message = "Failed to save current event status"
            ),
        }
    }
}
