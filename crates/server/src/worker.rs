//! Event consumption: a bounded queue drained by a fixed pool of workers.

use std::sync::Arc;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;

use crate::lifecycle::Engine;
use crate::model::Event;

pub fn event_queue(capacity: usize) -> (mpsc::Sender<Event>, mpsc::Receiver<Event>) {
    mpsc::channel(capacity)
}

/// Spawn `workers` consumers sharing `rx`. Each exits once the queue is closed and empty.
pub fn spawn_workers(
    engine: Engine,
    rx: mpsc::Receiver<Event>,
    workers: usize,
) -> Vec<JoinHandle<()>> {
    let rx = Arc::new(Mutex::new(rx));
    (0..workers)
        .map(|worker| {
            let engine = engine.clone();
            let rx = rx.clone();
            tokio::spawn(async move {
                loop {
                    let next = rx.lock().await.recv().await;
                    let Some(event) = next else {
                        break;
                    };
                    engine.consume(event).await;
                }
                tracing::info!(
                    name = "worker.stopped",
                    target = concat!(env!("CARGO_PKG_NAME"), "::", module_path!()),
                    worker,
                    message = "Event worker stopped"
                );
            })
        })
        .collect()
}
