pub mod calendar;

use std::path::Path;

use axum::{routing::get, Router};
use tower_http::{services::ServeDir, trace::TraceLayer};

use self::calendar::AppState;

/// The feed is served at `feed_path`, every other path from `static_dir`.
pub fn router(feed_path: &str, static_dir: &Path, state: AppState) -> Router {
    Router::new()
        .route(feed_path, get(calendar::handler))
        .fallback_service(ServeDir::new(static_dir))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
