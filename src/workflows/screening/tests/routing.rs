use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use serde_json::{json, Value};
use tower::ServiceExt;

use super::common::*;
use crate::workflows::screening::domain::{CheckType, CriminalOutcome, CriminalScope};
use crate::workflows::screening::engine::{LifecycleEngine, ScreeningConfig};
use crate::workflows::screening::router::{self, screening_router, ListQuery};

fn test_router() -> (axum::Router, Arc<TestEngine>) {
    let (engine, _, _) = build_engine();
    (screening_router(engine.clone()), engine)
}

#[tokio::test]
async fn create_route_accepts_payloads() {
    let (router, _) = test_router();

    let response = router
        .oneshot(
            axum::http::Request::post("/api/v1/screening/checks")
                .header(axum::http::header::CONTENT_TYPE, "application/json")
                .body(axum::body::Body::from(
                    serde_json::to_vec(&json!({
                        "candidate_id": "cand-001",
                        "check_type": "comprehensive",
                        "priority": "high",
                        "requested_by": "recruiter@example.com",
                    }))
                    .unwrap(),
                ))
                .unwrap(),
        )
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let payload = read_json_body(response).await;
    assert_eq!(payload.get("status"), Some(&json!("awaiting_consent")));
    assert_eq!(payload.get("priority"), Some(&json!("high")));
    assert!(payload.get("id").is_some());
}

#[tokio::test]
async fn create_handler_rejects_unknown_check_type() {
    let (engine, _, _) = build_engine();

    let response = router::create_handler(
        State(engine),
        axum::Json(request("exhaustive")),
    )
    .await;

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let payload = read_json_body(response).await;
    assert!(payload
        .get("error")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .contains("exhaustive"));
}

#[tokio::test]
async fn start_before_consent_maps_to_conflict() {
    let (engine, _, _) = build_engine();
    let check = engine.create(request("basic")).expect("check created");

    let response =
        router::start_handler(State(engine), Path(check.id.0.clone())).await;

    assert_eq!(response.status(), StatusCode::CONFLICT);
    let payload = read_json_body(response).await;
    assert!(payload
        .get("error")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .contains("consent"));
}

#[tokio::test]
async fn unknown_check_maps_to_not_found() {
    let (engine, _, _) = build_engine();

    let response =
        router::get_handler(State(engine), Path("chk-missing".to_string())).await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn full_lifecycle_over_http() {
    let (router, engine) = test_router();

    let created = engine.create(request("basic")).expect("check created");
    let id = created.id.0.clone();

    let consent = router
        .clone()
        .oneshot(
            axum::http::Request::post(format!("/api/v1/screening/checks/{id}/consent"))
                .header(axum::http::header::CONTENT_TYPE, "application/json")
                .body(axum::body::Body::from(
                    serde_json::to_vec(&json!({ "given": true })).unwrap(),
                ))
                .unwrap(),
        )
        .await
        .expect("route executes");
    assert_eq!(consent.status(), StatusCode::OK);

    let started = router
        .clone()
        .oneshot(
            axum::http::Request::post(format!("/api/v1/screening/checks/{id}/start"))
                .body(axum::body::Body::empty())
                .unwrap(),
        )
        .await
        .expect("route executes");
    assert_eq!(started.status(), StatusCode::OK);
    let payload = read_json_body(started).await;
    assert_eq!(payload.get("status"), Some(&json!("in_progress")));
    assert_eq!(payload.get("progress"), Some(&json!(0)));

    let resolved = router
        .clone()
        .oneshot(
            axum::http::Request::post(format!("/api/v1/screening/checks/{id}/results"))
                .header(axum::http::header::CONTENT_TYPE, "application/json")
                .body(axum::body::Body::from(
                    serde_json::to_vec(&json!({
                        "category": "verification",
                        "kind": "identity",
                        "result": "pass",
                        "verified_by": "Acme Verifications",
                    }))
                    .unwrap(),
                ))
                .unwrap(),
        )
        .await
        .expect("route executes");
    assert_eq!(resolved.status(), StatusCode::OK);
    let payload = read_json_body(resolved).await;
    assert_eq!(payload.get("status"), Some(&json!("completed")));
    assert_eq!(payload.get("progress"), Some(&json!(100)));

    let fetched = router
        .oneshot(
            axum::http::Request::get(format!("/api/v1/screening/checks/{id}"))
                .body(axum::body::Body::empty())
                .unwrap(),
        )
        .await
        .expect("route executes");
    assert_eq!(fetched.status(), StatusCode::OK);
    let aggregate = read_json_body(fetched).await;
    assert_eq!(aggregate.get("status"), Some(&json!("completed")));
    assert_eq!(
        aggregate
            .get("verification_results")
            .and_then(Value::as_array)
            .map(Vec::len),
        Some(1)
    );
}

#[tokio::test]
async fn cancel_route_is_idempotent() {
    let (router, engine) = test_router();
    let created = engine.create(request("standard")).expect("check created");
    let id = created.id.0.clone();

    for _ in 0..2 {
        let response = router
            .clone()
            .oneshot(
                axum::http::Request::post(format!("/api/v1/screening/checks/{id}/cancel"))
                    .body(axum::body::Body::empty())
                    .unwrap(),
            )
            .await
            .expect("route executes");
        assert_eq!(response.status(), StatusCode::OK);
        let payload = read_json_body(response).await;
        assert_eq!(payload.get("status"), Some(&json!("cancelled")));
    }
}

#[tokio::test]
async fn list_handler_rejects_unknown_status_filter() {
    let (engine, _, _) = build_engine();

    let response = router::list_handler(
        State(engine),
        Query(ListQuery {
            status: Some("archived".to_string()),
            candidate_id: None,
        }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn list_route_filters_by_candidate() {
    let (router, engine) = test_router();
    engine
        .create(request_for("cand-a", "basic"))
        .expect("created");
    engine
        .create(request_for("cand-b", "basic"))
        .expect("created");

    let response = router
        .oneshot(
            axum::http::Request::get("/api/v1/screening/checks?candidate_id=cand-b")
                .body(axum::body::Body::empty())
                .unwrap(),
        )
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    let entries = payload.as_array().expect("array payload");
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].get("candidate_id"), Some(&json!("cand-b")));
}

#[tokio::test]
async fn repository_outage_maps_to_internal_error() {
    let engine = Arc::new(LifecycleEngine::new(
        Arc::new(UnavailableRepository),
        Arc::new(MemoryEvents::default()),
        ScreeningConfig::default(),
    ));

    let response = router::get_handler(State(engine), Path("chk-000001".to_string())).await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn failed_check_surface_via_result_route() {
    let (router, engine) = test_router();
    let check = started_check(&engine, CheckType::Comprehensive);
    engine
        .record_sub_check_result(
            &check.id,
            crate::workflows::screening::SubCheckResult::Criminal {
                scope: CriminalScope::County,
                result: CriminalOutcome::RecordsFound,
            },
        )
        .expect("result accepted");

    // aggregate is terminal now, further results conflict
    let response = router
        .oneshot(
            axum::http::Request::post(format!(
                "/api/v1/screening/checks/{}/results",
                check.id.0
            ))
            .header(axum::http::header::CONTENT_TYPE, "application/json")
            .body(axum::body::Body::from(
                serde_json::to_vec(&json!({
                    "category": "credit",
                    "score": 700,
                }))
                .unwrap(),
            ))
            .unwrap(),
        )
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::CONFLICT);
}
