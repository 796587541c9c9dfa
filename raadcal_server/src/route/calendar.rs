use std::sync::Arc;

use axum::{
    extract::State,
    http::{
        header::{CACHE_CONTROL, CONTENT_TYPE},
        StatusCode,
    },
    response::{IntoResponse, Response},
};
use raadcal_core::{config::FeedMeta, render, store::SnapshotStore};
use tracing::error;

#[derive(Debug, Clone)]
pub struct AppState {
    pub store: Arc<SnapshotStore>,
    pub feed: Arc<FeedMeta>,
}

/// Serve the current snapshot as an iCalendar feed.
///
/// Until the first refresh succeeded this is a calendar without events.
pub async fn handler(State(state): State<AppState>) -> Result<Response, (StatusCode, String)> {
    let snapshot = state.store.current();
    let mut body = Vec::new();
    render::render(&snapshot, &state.feed, &mut body).map_err(|err| {
        error!(error = %err, "Unable to render the calendar");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            String::from("Couldn't render calendar items!"),
        )
    })?;
    let response = (
        [
            (CONTENT_TYPE, "text/calendar; charset=utf-8"),
            (CACHE_CONTROL, "max-age=3600"),
        ],
        body,
    )
        .into_response();
    Ok(response)
}
