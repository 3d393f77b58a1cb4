//! Alert lifecycle: mask, escalation, convergence, status recording, dispatch.
//!
//! ## Submodules
//!
//! - `convergence` - rate limiting per hash identity
//! - `escalation` - dwell-time based priority upgrade
//! - `recorder` - dual write of the decided status
//! - `decision` - pure decision tree over evaluated facts

pub mod convergence;
pub mod decision;
pub mod escalation;
pub mod recorder;

pub use convergence::ConvergenceEvaluator;
pub use decision::{Decision, Escalated, Facts, Step, decide};
pub use escalation::EscalationEvaluator;
pub use recorder::StatusRecorder;

use crate::Services;
use crate::aggregator::LowPriorityBatcher;
use crate::model::{Event, Status};
use crate::notify::Dispatcher;

/// Runs the decision flow for one event occurrence at a time.
///
/// Cheap to clone; workers share one engine.
#[derive(Clone)]
pub struct Engine {
    services: Services,
    convergence: ConvergenceEvaluator,
    escalation: EscalationEvaluator,
    recorder: StatusRecorder,
    dispatcher: Dispatcher,
    batcher: LowPriorityBatcher,
}

impl Engine {
    pub fn new(services: Services, dispatcher: Dispatcher, batcher: LowPriorityBatcher) -> Self {
        let convergence = ConvergenceEvaluator::new(&services);
        let escalation = EscalationEvaluator::new(&services, convergence.clone());
        let recorder = StatusRecorder::new(services.events.clone());
        Self {
            services,
            convergence,
            escalation,
            recorder,
            dispatcher,
            batcher,
        }
    }

    /// Evaluate the facts the decision tree needs, in decision order.
    ///
    /// Evaluators with side effects on markers only run when an earlier
    /// branch has not already settled the outcome.
    pub async fn evaluate(&self, event: &Event) -> Facts {
        let masked = self.services.masks.is_masked(event, self.services.clock.now());

        let escalation = if !masked && event.needs_upgrade() {
            self.escalate(event).await
        } else {
            None
        };

        let converged = if !masked && escalation.is_none() {
            self.convergence.is_converged(event, false).await
        } else {
            false
        };

        let needs_callback = self
            .services
            .strategies
            .get_by_id(event.sid)
            .is_some_and(|s| s.needs_callback());

        Facts {
            masked,
            escalation,
            converged,
            needs_callback,
            is_high: event.priority <= self.services.config.notify.high_priority_max,
        }
    }

    async fn escalate(&self, event: &Event) -> Option<Escalated> {
        let (need_upgrade, need_notify) = self.escalation.should_escalate(event).await;
        if !need_upgrade {
            return None;
        }
        match event.alert_upgrade() {
            Ok(upgrade) => Some(Escalated {
                level: upgrade.level,
                notify: need_notify,
            }),
            Err(e) => {
                tracing::error!(
                    name = "lifecycle.escalation.invalid_config",
                    target = concat!(env!("CARGO_PKG_NAME"), "::", module_path!()),
                    event_id = event.id,
                    error = %e,
                    message = "Escalation granted but level unreadable, continuing unescalated"
                );
                None
            }
        }
    }

    /// Decide and apply the outcome for one event.
    #[tracing::instrument(skip_all, fields(event_id = event.id, hashid = event.hashid, sid = event.sid))]
    pub async fn consume(&self, mut event: Event) -> Status {
        let facts = self.evaluate(&event).await;
        let decision = decide(&event, &facts);

        for step in decision.steps {
            self.apply(&mut event, step).await;
        }

        tracing::debug!(
            name = "lifecycle.consumed",
            target = concat!(env!("CARGO_PKG_NAME"), "::", module_path!()),
            hashid = event.hashid,
            outcome = %decision.outcome,
            message = "Event consumed"
        );
        decision.outcome
    }

    async fn apply(&self, event: &mut Event, step: Step) {
        match step {
            Step::RaisePriority(level) => self.raise_priority(event, level).await,
            Step::Record(status) => self.recorder.record(event, status).await,
            Step::PushCallback => self.push_callback(event).await,
            Step::Notify { escalated } => self.dispatcher.submit(escalated, vec![event.clone()]),
            Step::Batch => self.batcher.push(event.clone()),
        }
    }

    async fn raise_priority(&self, event: &mut Event, level: i32) {
        let events = &self.services.events;
        if event.is_alert()
            && let Err(e) = events.update_event_cur_priority(event.hashid, level).await
        {
            tracing::error!(
                name = "lifecycle.priority.event_cur_failed",
                target = concat!(env!("CARGO_PKG_NAME"), "::", module_path!()),
                hashid = event.hashid,
                level,
                error = %e,
                message = "Failed to raise current event priority"
            );
        }
        if let Err(e) = events.update_event_priority(event.id, level).await {
            tracing::error!(
                name = "lifecycle.priority.event_failed",
                target = concat!(env!("CARGO_PKG_NAME"), "::", module_path!()),
                event_id = event.id,
                level,
                error = %e,
                message = "Failed to raise event priority"
            );
        }
        event.priority = level;
    }

    async fn push_callback(&self, event: &Event) {
        let queue = &self.services.config.notify.callback_queue;
        let payload = match serde_json::to_string(event) {
            Ok(p) => p,
            Err(e) => {
                tracing::error!(
                    name = "lifecycle.callback.encode_failed",
                    target = concat!(env!("CARGO_PKG_NAME"), "::", module_path!()),
                    event_id = event.id,
                    error = %e,
                    message = "Failed to encode callback event"
                );
                return;
            }
        };
        match self.services.queues.push(queue, payload).await {
            Ok(()) => tracing::info!(
                name = "lifecycle.callback.pushed",
                target = concat!(env!("CARGO_PKG_NAME"), "::", module_path!()),
                hashid = event.hashid,
                message = "Pushed event to callback queue"
            ),
            Err(e) => tracing::error!(
                name = "lifecycle.callback.push_failed",
                target = concat!(env!("CARGO_PKG_NAME"), "::", module_path!()),
                event_id = event.id,
                queue = %queue,
                error = %e,
                message = "Failed to push event to callback queue"
            ),
        }
    }
}
