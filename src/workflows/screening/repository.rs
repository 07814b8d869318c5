use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{BackgroundCheck, CandidateId, CheckId, CheckStatus};

/// Storage abstraction so the engine can be exercised against fakes in tests
/// and swapped for a durable store later.
pub trait CheckRepository: Send + Sync {
    fn insert(&self, check: BackgroundCheck) -> Result<BackgroundCheck, RepositoryError>;
    fn update(&self, check: BackgroundCheck) -> Result<(), RepositoryError>;
    fn fetch(&self, id: &CheckId) -> Result<Option<BackgroundCheck>, RepositoryError>;
    fn list(&self, filter: &CheckFilter) -> Result<Vec<BackgroundCheck>, RepositoryError>;
}

/// Listing filter; empty filter matches everything.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct CheckFilter {
    pub status: Option<CheckStatus>,
    pub candidate_id: Option<CandidateId>,
}

impl CheckFilter {
    pub fn matches(&self, check: &BackgroundCheck) -> bool {
        if let Some(status) = self.status {
            if check.status != status {
                return false;
            }
        }
        if let Some(candidate_id) = &self.candidate_id {
            if &check.candidate_id != candidate_id {
                return false;
            }
        }
        true
    }
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Process-local repository backing the service binary and tests.
#[derive(Default, Clone)]
pub struct MemoryCheckRepository {
    checks: Arc<Mutex<HashMap<CheckId, BackgroundCheck>>>,
}

impl CheckRepository for MemoryCheckRepository {
    fn insert(&self, check: BackgroundCheck) -> Result<BackgroundCheck, RepositoryError> {
        let mut guard = self.checks.lock().expect("repository mutex poisoned");
        if guard.contains_key(&check.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(check.id.clone(), check.clone());
        Ok(check)
    }

    fn update(&self, check: BackgroundCheck) -> Result<(), RepositoryError> {
        let mut guard = self.checks.lock().expect("repository mutex poisoned");
        if !guard.contains_key(&check.id) {
            return Err(RepositoryError::NotFound);
        }
        guard.insert(check.id.clone(), check);
        Ok(())
    }

    fn fetch(&self, id: &CheckId) -> Result<Option<BackgroundCheck>, RepositoryError> {
        let guard = self.checks.lock().expect("repository mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn list(&self, filter: &CheckFilter) -> Result<Vec<BackgroundCheck>, RepositoryError> {
        let guard = self.checks.lock().expect("repository mutex poisoned");
        Ok(guard
            .values()
            .filter(|check| filter.matches(check))
            .cloned()
            .collect())
    }
}

/// Sanitized summary of one check for API responses and listings.
#[derive(Debug, Clone, Serialize)]
pub struct CheckStatusView {
    pub id: CheckId,
    pub candidate_id: CandidateId,
    pub check_type: &'static str,
    pub priority: &'static str,
    pub status: &'static str,
    pub paused: bool,
    pub progress: u8,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub elapsed_seconds: Option<i64>,
}

impl CheckStatusView {
    pub fn from_check(check: &BackgroundCheck, now: DateTime<Utc>) -> Self {
        Self {
            id: check.id.clone(),
            candidate_id: check.candidate_id.clone(),
            check_type: check.check_type.label(),
            priority: check.priority.label(),
            status: check.status.label(),
            paused: check.paused,
            progress: check.progress,
            created_at: check.created_at,
            started_at: check.started_at,
            completed_at: check.completed_at,
            elapsed_seconds: check
                .elapsed_since_start(now)
                .map(|elapsed| elapsed.num_seconds()),
        }
    }
}
