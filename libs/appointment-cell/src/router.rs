// libs/appointment-cell/src/router.rs
use std::sync::Arc;

use axum::{
    routing::{delete, get, post, put},
    Router,
};

use crate::handlers;
use crate::services::registry::ScheduleRegistry;

pub fn scheduling_routes(state: Arc<ScheduleRegistry>) -> Router {
    // Doctor-side schedule configuration and internal slot view
    let doctor_routes = Router::new()
        .route("/{doctor_id}/availability", get(handlers::get_weekly_availability))
        .route("/{doctor_id}/availability/{day_of_week}", put(handlers::set_weekly_availability))
        .route("/{doctor_id}/availability/{day_of_week}/copy-to-all", post(handlers::copy_availability_to_all_days))
        .route("/{doctor_id}/exceptions", get(handlers::get_exceptions))
        .route("/{doctor_id}/off-days", post(handlers::add_off_day))
        .route("/{doctor_id}/off-days/{date}", delete(handlers::remove_off_day))
        .route("/{doctor_id}/blocked-intervals", post(handlers::add_blocked_interval))
        .route("/{doctor_id}/blocked-intervals/{interval_id}", delete(handlers::remove_blocked_interval))
        .route("/{doctor_id}/emergency-policy", put(handlers::set_emergency_policy))
        .route("/{doctor_id}/publication", get(handlers::get_publication_state))
        .route("/{doctor_id}/publish", post(handlers::publish_schedule))
        .route("/{doctor_id}/slots", get(handlers::get_available_slots))
        .route("/{doctor_id}/appointments", get(handlers::list_doctor_appointments))
        // Patient-facing: gated on publication
        .route("/{doctor_id}/bookable-slots", get(handlers::get_bookable_slots));

    let appointment_routes = Router::new()
        .route("/", post(handlers::create_appointment))
        .route("/conflicts/check", get(handlers::check_appointment_conflicts))
        .route("/{appointment_id}", get(handlers::get_appointment))
        .route("/{appointment_id}/status", post(handlers::change_appointment_status));

    Router::new()
        .nest("/doctors", doctor_routes)
        .nest("/appointments", appointment_routes)
        .with_state(state)
}
