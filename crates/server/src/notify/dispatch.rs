//! Fire-and-forget notification dispatch over a bounded work queue.

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;

use crate::model::Event;
use crate::notify::Notifier;

#[derive(Debug)]
pub struct NotifyJob {
    pub escalated: bool,
    pub events: Vec<Event>,
}

/// Handle used by the decision path to hand notifications off.
#[derive(Clone)]
pub struct Dispatcher {
    tx: mpsc::Sender<NotifyJob>,
}

impl Dispatcher {
    /// Start the background task that drains the queue through `notifier`.
    pub fn spawn(notifier: Notifier, capacity: usize) -> (Self, JoinHandle<()>) {
        let (tx, mut rx) = mpsc::channel::<NotifyJob>(capacity);
        let handle = tokio::spawn(async move {
            while let Some(job) = rx.recv().await {
                notifier.notify(job.escalated, &job.events).await;
            }
            tracing::info!(
                name = "notify.dispatcher.stopped",
                target = concat!(env!("CARGO_PKG_NAME"), "::", module_path!()),
                message = "Notification dispatcher stopped"
            );
        });
        (Self { tx }, handle)
    }

    /// Queue a notification without waiting on channel I/O.
    ///
    /// When the queue is full the job is parked on its own task until space
    /// frees up, so nothing is dropped while the dispatcher runs.
    pub fn submit(&self, escalated: bool, events: Vec<Event>) {
        if events.is_empty() {
            return;
        }
        match self.tx.try_send(NotifyJob { escalated, events }) {
            Ok(()) => {}
            Err(TrySendError::Full(job)) => {
                let tx = self.tx.clone();
                tokio::spawn(async move {
                    if tx.send(job).await.is_err() {
                        tracing::error!(
                            name = "notify.dispatcher.closed",
                            target = concat!(env!("CARGO_PKG_NAME"), "::", module_path!()),
                            message = "Dispatcher closed, notification dropped"
                        );
                    }
                });
            }
            Err(TrySendError::Closed(job)) => {
                tracing::error!(
                    name = "notify.dispatcher.closed",
                    target = concat!(env!("CARGO_PKG_NAME"), "::", module_path!()),
                    events = job.events.len(),
                    message = "Dispatcher closed, notification dropped"
                );
            }
        }
    }
}
