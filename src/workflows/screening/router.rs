use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;

use super::domain::{CandidateId, CheckId, CheckRequest, CheckStatus, SubCheckResult};
use super::engine::{LifecycleEngine, ScreeningError};
use super::events::EventPublisher;
use super::repository::{CheckFilter, CheckRepository, CheckStatusView};

/// Router builder exposing HTTP endpoints for the lifecycle command and query
/// surface.
pub fn screening_router<R, E>(engine: Arc<LifecycleEngine<R, E>>) -> Router
where
    R: CheckRepository + 'static,
    E: EventPublisher + 'static,
{
    Router::new()
        .route(
            "/api/v1/screening/checks",
            post(create_handler::<R, E>).get(list_handler::<R, E>),
        )
        .route("/api/v1/screening/checks/:id", get(get_handler::<R, E>))
        .route(
            "/api/v1/screening/checks/:id/consent",
            post(consent_handler::<R, E>),
        )
        .route(
            "/api/v1/screening/checks/:id/start",
            post(start_handler::<R, E>),
        )
        .route(
            "/api/v1/screening/checks/:id/pause",
            post(pause_handler::<R, E>),
        )
        .route(
            "/api/v1/screening/checks/:id/resume",
            post(resume_handler::<R, E>),
        )
        .route(
            "/api/v1/screening/checks/:id/cancel",
            post(cancel_handler::<R, E>),
        )
        .route(
            "/api/v1/screening/checks/:id/results",
            post(result_handler::<R, E>),
        )
        .with_state(engine)
}

/// Consent payload; the decision timestamp defaults to receipt time.
#[derive(Debug, Deserialize)]
pub struct ConsentRequest {
    pub given: bool,
    #[serde(default)]
    pub date: Option<DateTime<Utc>>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub status: Option<String>,
    pub candidate_id: Option<String>,
}

pub(crate) async fn create_handler<R, E>(
    State(engine): State<Arc<LifecycleEngine<R, E>>>,
    axum::Json(request): axum::Json<CheckRequest>,
) -> Response
where
    R: CheckRepository + 'static,
    E: EventPublisher + 'static,
{
    match engine.create(request) {
        Ok(check) => {
            let view = CheckStatusView::from_check(&check, Utc::now());
            (StatusCode::ACCEPTED, axum::Json(view)).into_response()
        }
        Err(error) => error_response(error),
    }
}

pub(crate) async fn list_handler<R, E>(
    State(engine): State<Arc<LifecycleEngine<R, E>>>,
    Query(query): Query<ListQuery>,
) -> Response
where
    R: CheckRepository + 'static,
    E: EventPublisher + 'static,
{
    let status = match query.status.as_deref() {
        Some(raw) => match CheckStatus::parse(raw) {
            Some(status) => Some(status),
            None => {
                let payload = json!({ "error": format!("unrecognized status '{raw}'") });
                return (StatusCode::UNPROCESSABLE_ENTITY, axum::Json(payload)).into_response();
            }
        },
        None => None,
    };
    let filter = CheckFilter {
        status,
        candidate_id: query.candidate_id.map(CandidateId),
    };

    match engine.list(&filter) {
        Ok(checks) => {
            let now = Utc::now();
            let views: Vec<CheckStatusView> = checks
                .iter()
                .map(|check| CheckStatusView::from_check(check, now))
                .collect();
            (StatusCode::OK, axum::Json(views)).into_response()
        }
        Err(error) => error_response(error),
    }
}

pub(crate) async fn get_handler<R, E>(
    State(engine): State<Arc<LifecycleEngine<R, E>>>,
    Path(id): Path<String>,
) -> Response
where
    R: CheckRepository + 'static,
    E: EventPublisher + 'static,
{
    match engine.get(&CheckId(id)) {
        Ok(check) => (StatusCode::OK, axum::Json(check)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn consent_handler<R, E>(
    State(engine): State<Arc<LifecycleEngine<R, E>>>,
    Path(id): Path<String>,
    axum::Json(request): axum::Json<ConsentRequest>,
) -> Response
where
    R: CheckRepository + 'static,
    E: EventPublisher + 'static,
{
    let date = request.date.unwrap_or_else(Utc::now);
    respond(engine.record_consent(&CheckId(id), request.given, date))
}

pub(crate) async fn start_handler<R, E>(
    State(engine): State<Arc<LifecycleEngine<R, E>>>,
    Path(id): Path<String>,
) -> Response
where
    R: CheckRepository + 'static,
    E: EventPublisher + 'static,
{
    respond(engine.start(&CheckId(id)))
}

pub(crate) async fn pause_handler<R, E>(
    State(engine): State<Arc<LifecycleEngine<R, E>>>,
    Path(id): Path<String>,
) -> Response
where
    R: CheckRepository + 'static,
    E: EventPublisher + 'static,
{
    respond(engine.pause(&CheckId(id)))
}

pub(crate) async fn resume_handler<R, E>(
    State(engine): State<Arc<LifecycleEngine<R, E>>>,
    Path(id): Path<String>,
) -> Response
where
    R: CheckRepository + 'static,
    E: EventPublisher + 'static,
{
    respond(engine.resume(&CheckId(id)))
}

pub(crate) async fn cancel_handler<R, E>(
    State(engine): State<Arc<LifecycleEngine<R, E>>>,
    Path(id): Path<String>,
) -> Response
where
    R: CheckRepository + 'static,
    E: EventPublisher + 'static,
{
    respond(engine.cancel(&CheckId(id)))
}

pub(crate) async fn result_handler<R, E>(
    State(engine): State<Arc<LifecycleEngine<R, E>>>,
    Path(id): Path<String>,
    axum::Json(result): axum::Json<SubCheckResult>,
) -> Response
where
    R: CheckRepository + 'static,
    E: EventPublisher + 'static,
{
    respond(engine.record_sub_check_result(&CheckId(id), result))
}

fn respond(
    outcome: Result<super::domain::BackgroundCheck, ScreeningError>,
) -> Response {
    match outcome {
        Ok(check) => {
            let view = CheckStatusView::from_check(&check, Utc::now());
            (StatusCode::OK, axum::Json(view)).into_response()
        }
        Err(error) => error_response(error),
    }
}

fn error_response(error: ScreeningError) -> Response {
    let status = match &error {
        ScreeningError::NotFound => StatusCode::NOT_FOUND,
        ScreeningError::InvalidCheckType(_) => StatusCode::UNPROCESSABLE_ENTITY,
        ScreeningError::ConsentRequired | ScreeningError::InvalidTransition { .. } => {
            StatusCode::CONFLICT
        }
        ScreeningError::Repository(_) | ScreeningError::Events(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    let payload = json!({ "error": error.to_string() });
    (status, axum::Json(payload)).into_response()
}
