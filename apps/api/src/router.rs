use std::sync::Arc;

use axum::{routing::get, Router};

use appointment_cell::router::scheduling_routes;
use appointment_cell::services::ScheduleRegistry;

pub fn create_router(state: Arc<ScheduleRegistry>) -> Router {
    Router::new()
        .route("/", get(|| async { "Doctor scheduling API is running!" }))
        .merge(scheduling_routes(state))
}
