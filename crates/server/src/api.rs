//! HTTP ingestion surface.
//!
//! - `POST /v1/events` - enqueue one event or an array of events
//! - `GET /healthz` - liveness

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tower_http::trace::TraceLayer;

use crate::model::Event;

#[derive(Clone)]
pub struct IngestState {
    pub tx: mpsc::Sender<Event>,
}

#[derive(Deserialize)]
#[serde(untagged)]
pub enum IngestBody {
    Many(Vec<Event>),
    One(Box<Event>),
}

impl IngestBody {
    fn into_events(self) -> Vec<Event> {
        match self {
            IngestBody::Many(events) => events,
            IngestBody::One(event) => vec![*event],
        }
    }
}

#[tracing::instrument(skip_all)]
pub async fn ingest(
    State(state): State<IngestState>,
    Json(body): Json<IngestBody>,
) -> (StatusCode, Json<Value>) {
    let mut accepted = 0usize;
    for event in body.into_events() {
        match state.tx.try_send(event) {
            Ok(()) => accepted += 1,
            Err(TrySendError::Full(_)) => {
                tracing::warn!(
                    name = "api.ingest.queue_full",
                    target = concat!(env!("CARGO_PKG_NAME"), "::", module_path!()),
                    accepted,
                    message = "Worker queue full, rejecting remaining events"
                );
                return (
                    StatusCode::SERVICE_UNAVAILABLE,
                    Json(json!({ "error": "worker queue full", "accepted": accepted })),
                );
            }
            Err(TrySendError::Closed(_)) => {
                return (
                    StatusCode::SERVICE_UNAVAILABLE,
                    Json(json!({ "error": "worker queue closed", "accepted": accepted })),
                );
            }
        }
    }
    (StatusCode::ACCEPTED, Json(json!({ "accepted": accepted })))
}

#[tracing::instrument()]
pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

pub fn router(state: IngestState) -> Router {
    Router::new()
        .route("/v1/events", post(ingest))
        .route("/healthz", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve the router on `addr` until the process exits.
#[tracing::instrument(skip(state))]
pub async fn start_webserver(addr: &str, state: IngestState) -> color_eyre::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(
        name = "api.listening",
        target = concat!(env!("CARGO_PKG_NAME"), "::", module_path!()),
        addr = %addr,
        message = "Server running"
    );
    axum::serve(listener, router(state))
        .await
        .map_err(|e| color_eyre::Report::msg(format!("Failed to start server: {e}")))?;
    Ok(())
}
