use axum::{extract::State, Json};

use crate::document::ChangeEvent;
use crate::error::Result;
use crate::notification::HandleReport;
use crate::server::AppState;

/// Receive one change event from the HTTP webhook.
///
/// Answers with the handling report. Only a malformed event is an error
/// (`400 VALIDATION_ERROR`); delivery failures show up in the report.
pub async fn receive_event(
    State(state): State<AppState>,
    Json(event): Json<ChangeEvent>,
) -> Result<Json<HandleReport>> {
    let report = state.notifier.handle(&event).await?;

    tracing::debug!(
        document_id = %report.document_id,
        matched = report.matched(),
        "Handled webhook event"
    );

    Ok(Json(report))
}
