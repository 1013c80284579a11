//! Calendar event endpoint

use axum::{Json, Router, extract::State, routing::post};
use serde::Serialize;

use dashpad_core::{Event, fetch_events};

use crate::routes::AppError;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/events", post(events))
}

#[derive(Serialize)]
pub struct EventsResponse {
    pub success: bool,
    pub events: Vec<Event>,
    pub count: usize,
    pub skipped: usize,
}

/// POST /api/events - Fetch and normalize the configured calendar list.
/// Requires a completed device-code sign-in; never touches the remote
/// otherwise.
async fn events(State(state): State<AppState>) -> Result<Json<EventsResponse>, AppError> {
    let session = state.auth.session()?;
    let summary = fetch_events(&session).await?;

    Ok(Json(EventsResponse {
        success: true,
        count: summary.events.len(),
        skipped: summary.skipped,
        events: summary.events,
    }))
}
