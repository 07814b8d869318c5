use std::sync::{Arc, Mutex};

use axum::response::Response;
use serde_json::Value;

use crate::workflows::screening::domain::{
    BackgroundCheck, CandidateId, CheckId, CheckRequest, CheckType, Priority, SubCheckResult,
    VerificationOutcome,
};
use crate::workflows::screening::engine::{LifecycleEngine, ScreeningConfig};
use crate::workflows::screening::events::{EventError, EventPublisher, StatusChanged};
use crate::workflows::screening::repository::{
    CheckFilter, CheckRepository, MemoryCheckRepository, RepositoryError,
};
use crate::workflows::screening::status::DisqualificationPolicy;

pub(super) type TestEngine = LifecycleEngine<MemoryCheckRepository, MemoryEvents>;

pub(super) fn build_engine() -> (Arc<TestEngine>, Arc<MemoryCheckRepository>, Arc<MemoryEvents>) {
    build_engine_with(ScreeningConfig::default())
}

pub(super) fn build_engine_with(
    config: ScreeningConfig,
) -> (Arc<TestEngine>, Arc<MemoryCheckRepository>, Arc<MemoryEvents>) {
    let repository = Arc::new(MemoryCheckRepository::default());
    let events = Arc::new(MemoryEvents::default());
    let engine = Arc::new(LifecycleEngine::new(
        repository.clone(),
        events.clone(),
        config,
    ));
    (engine, repository, events)
}

pub(super) fn lenient_policy() -> DisqualificationPolicy {
    DisqualificationPolicy {
        criminal_records_disqualify: false,
        verification_fail_disqualifies: false,
        minimum_credit_score: None,
    }
}

pub(super) fn request(check_type: &str) -> CheckRequest {
    CheckRequest {
        candidate_id: CandidateId("cand-001".to_string()),
        check_type: check_type.to_string(),
        priority: Priority::Normal,
        requested_by: "recruiter@example.com".to_string(),
    }
}

pub(super) fn request_for(candidate: &str, check_type: &str) -> CheckRequest {
    CheckRequest {
        candidate_id: CandidateId(candidate.to_string()),
        check_type: check_type.to_string(),
        priority: Priority::Normal,
        requested_by: "recruiter@example.com".to_string(),
    }
}

/// Create, consent, and start a check of the given tier.
pub(super) fn started_check(engine: &TestEngine, check_type: CheckType) -> BackgroundCheck {
    let created = engine
        .create(request(check_type.label()))
        .expect("check created");
    engine
        .record_consent(&created.id, true, chrono::Utc::now())
        .expect("consent recorded");
    engine.start(&created.id).expect("check started")
}

pub(super) fn pass_verification(kind: crate::workflows::screening::VerificationKind) -> SubCheckResult {
    SubCheckResult::Verification {
        kind,
        result: VerificationOutcome::Pass,
        verified_by: "Acme Verifications".to_string(),
    }
}

#[derive(Default, Clone)]
pub(super) struct MemoryEvents {
    events: Arc<Mutex<Vec<StatusChanged>>>,
}

impl MemoryEvents {
    pub(super) fn events(&self) -> Vec<StatusChanged> {
        self.events.lock().expect("event mutex poisoned").clone()
    }
}

impl EventPublisher for MemoryEvents {
    fn publish(&self, event: StatusChanged) -> Result<(), EventError> {
        self.events
            .lock()
            .expect("event mutex poisoned")
            .push(event);
        Ok(())
    }
}

/// Accepts the initial insert, then refuses every update, like a store
/// flipped read-only mid-flight.
#[derive(Default)]
pub(super) struct FailingUpdateRepository {
    inner: MemoryCheckRepository,
}

impl CheckRepository for FailingUpdateRepository {
    fn insert(&self, check: BackgroundCheck) -> Result<BackgroundCheck, RepositoryError> {
        self.inner.insert(check)
    }

    fn update(&self, _check: BackgroundCheck) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("write path offline".to_string()))
    }

    fn fetch(&self, id: &CheckId) -> Result<Option<BackgroundCheck>, RepositoryError> {
        self.inner.fetch(id)
    }

    fn list(&self, filter: &CheckFilter) -> Result<Vec<BackgroundCheck>, RepositoryError> {
        self.inner.list(filter)
    }
}

pub(super) struct UnavailableRepository;

impl CheckRepository for UnavailableRepository {
    fn insert(&self, _check: BackgroundCheck) -> Result<BackgroundCheck, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn update(&self, _check: BackgroundCheck) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn fetch(&self, _id: &CheckId) -> Result<Option<BackgroundCheck>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn list(&self, _filter: &CheckFilter) -> Result<Vec<BackgroundCheck>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
