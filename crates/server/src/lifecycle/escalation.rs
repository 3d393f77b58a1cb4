//! Escalation: raise an unhandled alert to a wider audience after a dwell time.

use std::sync::Arc;

use crate::Services;
use crate::clock::Clock;
use crate::lifecycle::convergence::ConvergenceEvaluator;
use crate::model::{Event, EventType};
use crate::store::{EventStore, Markers};

#[derive(Clone)]
pub struct EscalationEvaluator {
    events: Arc<dyn EventStore>,
    markers: Markers,
    clock: Arc<dyn Clock>,
    convergence: ConvergenceEvaluator,
}

impl EscalationEvaluator {
    pub fn new(services: &Services, convergence: ConvergenceEvaluator) -> Self {
        Self {
            events: services.events.clone(),
            markers: services.markers.clone(),
            clock: services.clock.clone(),
            convergence,
        }
    }

    /// Returns `(need_upgrade, need_notify)`.
    ///
    /// Claimed, ignored or vanished alerts never escalate.
    #[tracing::instrument(skip_all, fields(hashid = event.hashid, event_type = %event.event_type))]
    pub async fn should_escalate(&self, event: &Event) -> (bool, bool) {
        if event.event_type == EventType::Recovery {
            // an escalated incident resolved: tell the escalated audience and
            // start a fresh cycle
            if self.markers.is_upgraded(event.hashid).await {
                self.markers.clear_escalation(event.hashid).await;
                return (true, true);
            }
            return (false, false);
        }

        let current = match self.events.event_cur_get(event.hashid).await {
            Ok(Some(cur)) => cur,
            Ok(None) => {
                tracing::info!(
                    name = "escalation.current_event_missing",
                    target = concat!(env!("CARGO_PKG_NAME"), "::", module_path!()),
                    hashid = event.hashid,
                    message = "No current event for hash, not escalating"
                );
                return (false, false);
            }
            Err(e) => {
                tracing::error!(
                    name = "escalation.current_event_failed",
                    target = concat!(env!("CARGO_PKG_NAME"), "::", module_path!()),
                    hashid = event.hashid,
                    error = %e,
                    message = "Current event lookup failed, not escalating"
                );
                return (false, false);
            }
        };

        let upgrade = match event.alert_upgrade() {
            Ok(u) => u,
            Err(e) => {
                tracing::error!(
                    name = "escalation.invalid_config",
                    target = concat!(env!("CARGO_PKG_NAME"), "::", module_path!()),
                    event_id = event.id,
                    alert_upgrade = %event.alert_upgrade,
                    error = %e,
                    message = "Unparsable alert upgrade config, not escalating"
                );
                return (false, false);
            }
        };

        if current.is_claimed() || current.is_ignored() {
            return (false, false);
        }

        let now = self.clock.now();

        let Some(first_alert) = self.markers.first_alert_time(event.hashid).await else {
            // starts the dwell clock; escalation needs it to elapse first
            self.markers.set_first_alert_time(event.hashid, now).await;
            return (false, false);
        };

        if now - first_alert < upgrade.duration {
            return (false, false);
        }

        if !self.markers.set_upgraded(event.hashid).await {
            return (false, false);
        }

        if self.convergence.is_converged(event, true).await {
            return (true, false);
        }

        (true, true)
    }
}
