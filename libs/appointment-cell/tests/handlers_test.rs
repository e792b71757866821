use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    extract::{Path, Query, State},
    http::{Request, StatusCode},
    Json,
};
use chrono::{Duration, NaiveDate, NaiveTime, Utc};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use appointment_cell::handlers::*;
use appointment_cell::models::*;
use appointment_cell::router::scheduling_routes;
use appointment_cell::services::ScheduleRegistry;
use doctor_cell::models::SetDayAvailabilityRequest;
use shared_config::AppConfig;
use shared_models::error::AppError;

fn time(hour: u32, minute: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, minute, 0).unwrap()
}

/// The next Monday strictly after today, so emergency release never interferes.
fn next_monday() -> NaiveDate {
    let today = Utc::now().date_naive();
    today
        .iter_days()
        .skip(1)
        .find(|date| doctor_cell::day_of_week(*date) == 1)
        .unwrap()
}

fn registry() -> Arc<ScheduleRegistry> {
    Arc::new(ScheduleRegistry::new(AppConfig::default()))
}

async fn configure_monday(registry: &Arc<ScheduleRegistry>, doctor_id: Uuid) {
    set_weekly_availability(
        State(registry.clone()),
        Path((doctor_id, 1)),
        Json(SetDayAvailabilityRequest {
            enabled: true,
            start_time: time(9, 0),
            end_time: time(17, 0),
            slot_minutes: 30,
        }),
    )
    .await
    .unwrap();
}

async fn send(registry: Arc<ScheduleRegistry>, request: Request<Body>) -> (StatusCode, Value) {
    let response = scheduling_routes(registry).oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get_request(uri: &str) -> Request<Body> {
    Request::builder().method("GET").uri(uri).body(Body::empty()).unwrap()
}

// ==============================================================================
// DIRECT HANDLER CALLS
// ==============================================================================

#[tokio::test]
async fn test_set_weekly_availability_rejects_invalid_window() {
    let registry = registry();

    let result = set_weekly_availability(
        State(registry.clone()),
        Path((Uuid::new_v4(), 1)),
        Json(SetDayAvailabilityRequest {
            enabled: true,
            start_time: time(17, 0),
            end_time: time(9, 0),
            slot_minutes: 30,
        }),
    )
    .await;

    assert!(matches!(result, Err(AppError::ValidationError(_))));
}

#[tokio::test]
async fn test_get_available_slots_returns_template_slots() {
    let registry = registry();
    let doctor_id = Uuid::new_v4();
    configure_monday(&registry, doctor_id).await;

    let monday = next_monday();
    let Json(body) = get_available_slots(
        State(registry.clone()),
        Path(doctor_id),
        Query(SlotQuery { from: monday, to: monday, use_default_policy: false }),
    )
    .await
    .unwrap();

    assert_eq!(body["total_slots"], 16);
    assert_eq!(body["available_slots"][0]["start_time"], "09:00:00");
}

#[tokio::test]
async fn test_get_available_slots_unknown_doctor_not_found() {
    let monday = next_monday();

    let result = get_available_slots(
        State(registry()),
        Path(Uuid::new_v4()),
        Query(SlotQuery { from: monday, to: monday, use_default_policy: false }),
    )
    .await;

    assert!(matches!(result, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn test_create_appointment_conflict_maps_to_conflict() {
    let registry = registry();
    let doctor_id = Uuid::new_v4();
    configure_monday(&registry, doctor_id).await;

    let start = next_monday().and_time(time(10, 0)).and_utc();
    let request = CreateAppointmentRequest {
        doctor_id,
        patient_id: Uuid::new_v4(),
        start_datetime: start,
        end_datetime: start + Duration::minutes(30),
        initial_status: AppointmentStatus::Pending,
        notes: None,
        created_by_id: Uuid::new_v4(),
    };

    let (status, _) = create_appointment(State(registry.clone()), Json(request.clone()))
        .await
        .unwrap();
    assert_eq!(status, StatusCode::CREATED);

    let second = create_appointment(State(registry.clone()), Json(request)).await;
    assert!(matches!(second, Err(AppError::Conflict(_))));
}

#[tokio::test]
async fn test_invalid_transition_maps_to_conflict() {
    let registry = registry();
    let doctor_id = Uuid::new_v4();
    configure_monday(&registry, doctor_id).await;

    let start = next_monday().and_time(time(11, 0)).and_utc();
    let appointment = registry
        .create_appointment(
            CreateAppointmentRequest {
                doctor_id,
                patient_id: Uuid::new_v4(),
                start_datetime: start,
                end_datetime: start + Duration::minutes(30),
                initial_status: AppointmentStatus::Pending,
                notes: None,
                created_by_id: Uuid::new_v4(),
            },
            Utc::now(),
        )
        .unwrap();

    let result = change_appointment_status(
        State(registry.clone()),
        Path(appointment.id),
        Json(ChangeStatusRequest {
            action: StatusAction::Complete,
            reason: None,
            actor_id: Uuid::new_v4(),
        }),
    )
    .await;

    assert!(matches!(result, Err(AppError::Conflict(_))));
}

// ==============================================================================
// ROUTER
// ==============================================================================

#[tokio::test]
async fn test_router_booking_flow() {
    let registry = registry();
    let doctor_id = Uuid::new_v4();
    let monday = next_monday();

    let (status, _) = send(
        registry.clone(),
        json_request(
            "PUT",
            &format!("/doctors/{}/availability/1", doctor_id),
            json!({ "enabled": true, "start_time": "09:00:00", "end_time": "17:00:00", "slot_minutes": 30 }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(
        registry.clone(),
        get_request(&format!("/doctors/{}/bookable-slots?from={}&to={}", doctor_id, monday, monday)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["published"], false);
    assert_eq!(body["total_slots"], 0);

    let (status, body) = send(registry.clone(), json_request("POST", &format!("/doctors/{}/publish", doctor_id), json!({}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["publication"]["status"], "published");

    let (_, body) = send(
        registry.clone(),
        get_request(&format!("/doctors/{}/bookable-slots?from={}&to={}", doctor_id, monday, monday)),
    )
    .await;
    assert_eq!(body["published"], true);
    assert_eq!(body["total_slots"], 16);

    let start = monday.and_time(time(9, 0)).and_utc();
    let (status, body) = send(
        registry.clone(),
        json_request(
            "POST",
            "/appointments",
            json!({
                "doctor_id": doctor_id,
                "patient_id": Uuid::new_v4(),
                "start_datetime": start,
                "end_datetime": start + Duration::minutes(30),
                "created_by_id": Uuid::new_v4()
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["appointment"]["status"], "pending");
    let appointment_id = body["appointment"]["id"].as_str().unwrap().to_string();

    let (status, body) = send(registry.clone(), get_request(&format!("/appointments/{}", appointment_id))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["valid_actions"], json!(["confirm", "cancel"]));

    let (status, body) = send(
        registry.clone(),
        json_request(
            "POST",
            &format!("/appointments/{}/status", appointment_id),
            json!({ "action": "cancel", "actor_id": Uuid::new_v4() }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    let (status, body) = send(
        registry.clone(),
        json_request(
            "POST",
            &format!("/appointments/{}/status", appointment_id),
            json!({ "action": "cancel", "reason": "Patient travelling", "actor_id": Uuid::new_v4() }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["appointment"]["status"], "cancelled");
    assert_eq!(body["appointment"]["cancellation_reason"], "Patient travelling");
}

#[tokio::test]
async fn test_router_exceptions_and_conflict_check() {
    let registry = registry();
    let doctor_id = Uuid::new_v4();
    configure_monday(&registry, doctor_id).await;
    let monday = next_monday();

    let (status, body) = send(
        registry.clone(),
        json_request(
            "POST",
            &format!("/doctors/{}/blocked-intervals", doctor_id),
            json!({ "date": monday, "start_time": "12:00:00", "end_time": "13:00:00", "reason": "lunch" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let interval_id = body["blocked_interval"]["id"].as_str().unwrap().to_string();

    let (_, body) = send(registry.clone(), get_request(&format!("/doctors/{}/exceptions", doctor_id))).await;
    assert_eq!(body["blocked_intervals"].as_array().unwrap().len(), 1);

    let (status, _) = send(
        registry.clone(),
        Request::builder()
            .method("DELETE")
            .uri(format!("/doctors/{}/blocked-intervals/{}", doctor_id, interval_id))
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(
        registry.clone(),
        Request::builder()
            .method("DELETE")
            .uri(format!("/doctors/{}/off-days/{}", doctor_id, monday))
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let start = monday.and_time(time(9, 0)).and_utc();
    let end = start + Duration::minutes(30);
    let uri = format!(
        "/appointments/conflicts/check?doctor_id={}&start_time={}&end_time={}",
        doctor_id,
        start.format("%Y-%m-%dT%H:%M:%SZ"),
        end.format("%Y-%m-%dT%H:%M:%SZ")
    );
    let (status, body) = send(registry.clone(), get_request(&uri)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["has_conflict"], false);
}

#[tokio::test]
async fn test_router_copy_to_all_days() {
    let registry = registry();
    let doctor_id = Uuid::new_v4();
    configure_monday(&registry, doctor_id).await;

    let (status, body) = send(
        registry.clone(),
        json_request("POST", &format!("/doctors/{}/availability/1/copy-to-all", doctor_id), json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let days = body["availability"].as_array().unwrap();
    assert_eq!(days.len(), 7);
    assert!(days.iter().all(|day| day["enabled"] == true));
    assert!(days.iter().all(|day| day["start_time"] == "09:00:00"));
}
