use std::{path::Path, sync::Arc};

use axum::{
    routing::{get, post, put},
    Router,
};
use tower_http::{
    services::{ServeDir, ServeFile},
    trace::TraceLayer,
};

use crate::error::StoreError;
use crate::planner::Planner;
use crate::store::KeyValueStore;
use crate::sync::GroupHub;
use crate::{routes_day, routes_sync, routes_tasks};

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub planner: Arc<Planner>,
    pub hub: Arc<GroupHub>,
}

impl AppState {
    /// Load the local planner and set up the group hub over one store.
    pub fn new(store: Arc<dyn KeyValueStore>) -> Result<Self, StoreError> {
        Ok(Self {
            planner: Arc::new(Planner::load(store.clone())?),
            hub: Arc::new(GroupHub::new(store)),
        })
    }
}

/// API and sync routes only.
pub fn api_router(state: AppState) -> Router {
    let api = Router::new()
        // tasks
        .route("/tasks", get(routes_tasks::get_tasks).post(routes_tasks::create_task))
        .route("/tasks/:id", put(routes_tasks::update_task).delete(routes_tasks::delete_task))
        .route("/tasks/:id/toggle", post(routes_tasks::toggle_task))
        // settings, notes, backup
        .route("/settings", get(routes_tasks::get_settings).put(routes_tasks::put_settings))
        .route("/export", get(routes_tasks::export_backup))
        .route("/import", post(routes_tasks::import_backup))
        .route("/notes/:year/:month", get(routes_tasks::get_note).put(routes_tasks::put_note))
        // day views
        .route("/days/:date", get(routes_day::get_day))
        .route("/months/:year/:month", get(routes_day::get_month))
        .route("/conflicts", post(routes_day::check_conflicts))
        // groups
        .route(
            "/groups/:group_id/tasks",
            get(routes_sync::get_group_tasks).post(routes_sync::replace_group_tasks),
        );

    Router::new()
        .nest("/api", api)
        .route("/ws", get(routes_sync::ws_handler))
        .with_state(state)
}

/// Full application: API, sync socket, and the static web client.
pub fn create_app(state: AppState, static_dir: &Path) -> Router {
    api_router(state)
        .route_service("/group/:group_id", ServeFile::new(static_dir.join("index.html")))
        .fallback_service(ServeDir::new(static_dir))
        .layer(TraceLayer::new_for_http())
}
