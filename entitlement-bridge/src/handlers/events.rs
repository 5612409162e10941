//! Entitlement event endpoints.
//!
//! REMS posts batches and cannot retry part of a batch, so every event is
//! reconciled on its own and the reply is always the same acknowledgement.
//! Per-event failures surface in logs and metrics only.

use axum::{extract::State, Json};
use serde::Serialize;

use crate::models::{ApproveEvent, EntitlementEvent, EventKind, RevokeEvent};
use crate::services::record_event;
use crate::startup::AppState;

#[derive(Debug, Serialize)]
pub struct Ack {
    pub status: &'static str,
}

impl Ack {
    pub fn ok() -> Self {
        Self { status: "ok" }
    }
}

/// Per-batch tally, logged once the batch is done.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BatchSummary {
    pub applied: usize,
    pub skipped: usize,
    pub failed: usize,
}

#[tracing::instrument(skip(state, events), fields(batch_size = events.len()))]
pub async fn approve(
    State(state): State<AppState>,
    Json(events): Json<Vec<ApproveEvent>>,
) -> Json<Ack> {
    process_batch(&state, EventKind::Approve, &events).await;
    Json(Ack::ok())
}

#[tracing::instrument(skip(state, events), fields(batch_size = events.len()))]
pub async fn revoke(
    State(state): State<AppState>,
    Json(events): Json<Vec<RevokeEvent>>,
) -> Json<Ack> {
    process_batch(&state, EventKind::Revoke, &events).await;
    Json(Ack::ok())
}

/// Reconcile each event in order; an error on one never stops the others.
pub async fn process_batch(
    state: &AppState,
    kind: EventKind,
    events: &[EntitlementEvent],
) -> BatchSummary {
    let mut summary = BatchSummary::default();

    for (index, event) in events.iter().enumerate() {
        let result = match kind {
            EventKind::Approve => state.reconciler.approve(event).await,
            EventKind::Revoke => state.reconciler.revoke(event).await,
        };

        match result {
            Ok(outcome) => {
                if outcome.is_noop() {
                    summary.skipped += 1;
                } else {
                    summary.applied += 1;
                }
                record_event(kind.as_str(), outcome.as_str());
                tracing::info!(
                    event_kind = %kind,
                    index,
                    resource = %event.resource,
                    user = %event.user_external_id,
                    outcome = outcome.as_str(),
                    "Entitlement event processed"
                );
            }
            Err(e) => {
                summary.failed += 1;
                record_event(kind.as_str(), "failed");
                tracing::error!(
                    event_kind = %kind,
                    index,
                    application_id = event.application_id,
                    resource = %event.resource,
                    user = %event.user_external_id,
                    mail = %event.user_email,
                    status = ?e.status(),
                    error = %e,
                    "Failed to process entitlement event"
                );
            }
        }
    }

    tracing::info!(
        event_kind = %kind,
        applied = summary.applied,
        skipped = summary.skipped,
        failed = summary.failed,
        "Entitlement batch finished"
    );

    summary
}
