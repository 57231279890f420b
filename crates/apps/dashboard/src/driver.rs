//! Async glue between the session and a [`Backend`].
//!
//! Each function runs one request to completion. Callers that overlap
//! requests use the ticket API on [`Dashboard`] directly; ordering is enforced
//! there either way.

use streaming::{Backend, QueryRequest, SaveOutcome};
use tracing::{info, warn};

use crate::error::{ControllerError, DashboardError};
use crate::session::Dashboard;
use crate::view::Applied;

/// Asks `question` and applies the answer, following up with a prescription
/// request when the answer calls for one.
pub async fn ask(
    dashboard: &mut Dashboard,
    backend: &dyn Backend,
    question: &str,
) -> Result<Applied, ControllerError> {
    let ticket = dashboard.submit(question)?;
    let result = backend.query(QueryRequest::new(ticket.question.clone())).await;
    let applied = dashboard.apply_response(&ticket, result);

    let field_name = match applied {
        Applied::NeedsPrescription { field_name } => field_name,
        other => return Ok(other),
    };
    let field = match field_name.or_else(|| dashboard.active_field().map(|f| f.name().to_string())) {
        Some(field) => field,
        None => {
            return Ok(dashboard
                .controller_mut()
                .abandon(&ticket, ControllerError::NoActiveField));
        }
    };
    let result = backend.prescription(field.clone()).await;
    Ok(dashboard.apply_prescription(&ticket, &field, result))
}

/// Requests prescription maps for the active field.
pub async fn prescribe(
    dashboard: &mut Dashboard,
    backend: &dyn Backend,
) -> Result<Applied, ControllerError> {
    let (ticket, field) = dashboard.request_prescription(None)?;
    let result = backend.prescription(field.clone()).await;
    Ok(dashboard.apply_prescription(&ticket, &field, result))
}

/// Sends the pending edits of the active field. The overlay is kept in every
/// outcome; failures are also logged to the conversation.
pub async fn save(
    dashboard: &mut Dashboard,
    backend: &dyn Backend,
) -> Result<SaveOutcome, DashboardError> {
    let field = dashboard
        .active_field()
        .map(|f| f.name().to_string())
        .ok_or(DashboardError::NoActiveField)?;
    let outcome = streaming::save(backend, &field, dashboard.overlay()).await;
    let conversation = dashboard.controller_mut().conversation_mut();
    match outcome {
        Ok(SaveOutcome::Saved {
            changeset_id,
            features,
        }) => {
            let text = match &changeset_id {
                Some(id) => format!("Saved {features} edited cells (changeset {id})."),
                None => format!("Saved {features} edited cells."),
            };
            conversation.assistant(text, None);
            Ok(SaveOutcome::Saved {
                changeset_id,
                features,
            })
        }
        Ok(SaveOutcome::Rejected) => {
            let err = DashboardError::SaveRejected;
            conversation.error(err.to_string(), None);
            Err(err)
        }
        Ok(SaveOutcome::NothingToSave) => Ok(SaveOutcome::NothingToSave),
        Err(err) => {
            let err = DashboardError::Save(err);
            conversation.error(err.to_string(), None);
            Err(err)
        }
    }
}

/// Clears local history first, then tells the backend. A backend failure is
/// only logged.
pub async fn clear_history(dashboard: &mut Dashboard, backend: &dyn Backend) {
    dashboard.clear_history();
    match backend.clear_history().await {
        Ok(()) => info!("backend history cleared"),
        Err(err) => warn!(error = %err, "backend history clear failed"),
    }
}

/// Recomputes field statistics on the blocking pool if anything changed.
/// Returns `true` if a fresh result was installed.
pub async fn refresh_statistics(dashboard: &mut Dashboard) -> Result<bool, DashboardError> {
    let Some(job) = dashboard.begin_statistics() else {
        return Ok(false);
    };
    let (ticket, stats) = tokio::task::spawn_blocking(move || job.run())
        .await
        .map_err(|e| DashboardError::Statistics(e.to_string()))?;
    Ok(dashboard.finish_statistics(ticket, stats))
}
