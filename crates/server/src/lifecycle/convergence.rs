//! Convergence: suppress notifications that repeat too often for one hash.

use std::sync::Arc;

use crate::Services;
use crate::clock::Clock;
use crate::model::{Event, EventType};
use crate::store::{EventStore, Markers, StrategyCache};

#[derive(Clone)]
pub struct ConvergenceEvaluator {
    strategies: StrategyCache,
    events: Arc<dyn EventStore>,
    markers: Markers,
    clock: Arc<dyn Clock>,
}

impl ConvergenceEvaluator {
    pub fn new(services: &Services) -> Self {
        Self {
            strategies: services.strategies.clone(),
            events: services.events.clone(),
            markers: services.markers.clone(),
            clock: services.clock.clone(),
        }
    }

    /// Returns true when the event must not be notified.
    ///
    /// Two rules apply: a strategy may allow at most `max_count` notifications
    /// per `window` seconds, and a strategy may opt out of recovery notices.
    /// Anything that prevents evaluation (unknown strategy, count query
    /// failure) answers "not converged".
    #[tracing::instrument(skip_all, fields(hashid = event.hashid, sid = event.sid, is_upgrade = is_upgrade))]
    pub async fn is_converged(&self, event: &Event, is_upgrade: bool) -> bool {
        let Some(stra) = self.strategies.get_by_id(event.sid) else {
            tracing::error!(
                name = "convergence.strategy_not_found",
                target = concat!(env!("CARGO_PKG_NAME"), "::", module_path!()),
                sid = event.sid,
                event_id = event.id,
                message = "Strategy not found, not converging"
            );
            return false;
        };

        let now = self.clock.now();

        if event.event_type == EventType::Recovery {
            self.markers.set_recovery_time(event.hashid, now).await;
            return stra.recovery_notify == 0;
        }

        let [window, max_count] = stra.converge;

        // at most zero notifications: the rule never alerts
        if max_count <= 0 {
            return true;
        }

        if window <= 0 {
            return false;
        }

        // the window restarts at the last recovery
        let recovery_ts = self.markers.recovery_time(event.hashid).await.unwrap_or(0);
        let start = (now - window).max(recovery_ts);

        let count = match self
            .events
            .event_count(event.hashid, start, now, is_upgrade)
            .await
        {
            Ok(c) => c,
            Err(e) => {
                tracing::error!(
                    name = "convergence.count_failed",
                    target = concat!(env!("CARGO_PKG_NAME"), "::", module_path!()),
                    hashid = event.hashid,
                    error = %e,
                    message = "Event count query failed, not converging"
                );
                return false;
            }
        };

        if count >= max_count as u64 {
            tracing::info!(
                name = "convergence.limit_reached",
                target = concat!(env!("CARGO_PKG_NAME"), "::", module_path!()),
                hashid = event.hashid,
                max_count,
                current = count,
                message = "Converge max count reached"
            );
            return true;
        }

        false
    }
}
