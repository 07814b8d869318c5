use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};

use super::domain::{
    BackgroundCheck, CheckId, CheckRequest, CheckStatus, CheckType, CreditCheck,
    CreditCheckStatus, CreditRating, CriminalCheck, CriminalCheckStatus, CriminalOutcome,
    JurisdictionPlan, SubCheckResult, VerificationOutcome, VerificationResult,
    VerificationStatus,
};
use super::events::{EventError, EventPublisher, StatusChanged};
use super::repository::{CheckFilter, CheckRepository, RepositoryError};
use super::status::{self, DisqualificationPolicy};

/// Engine-level configuration: the disqualification policy table plus the
/// jurisdiction plan used when fanning out criminal searches.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScreeningConfig {
    pub policy: DisqualificationPolicy,
    pub jurisdictions: JurisdictionPlan,
}

/// Command and query surface over background-check aggregates.
///
/// Commands against the same check id are serialized through a per-aggregate
/// lock; commands against different ids run in parallel. No command waits on
/// external verification providers: `start` fans out sub-checks and returns,
/// results arrive later through [`LifecycleEngine::record_sub_check_result`].
pub struct LifecycleEngine<R, E> {
    repository: Arc<R>,
    events: Arc<E>,
    config: ScreeningConfig,
    locks: Mutex<BTreeMap<CheckId, Arc<Mutex<()>>>>,
}

static CHECK_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_check_id() -> CheckId {
    let id = CHECK_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    CheckId(format!("chk-{id:06}"))
}

impl<R, E> LifecycleEngine<R, E>
where
    R: CheckRepository + 'static,
    E: EventPublisher + 'static,
{
    pub fn new(repository: Arc<R>, events: Arc<E>, config: ScreeningConfig) -> Self {
        Self {
            repository,
            events,
            config,
            locks: Mutex::new(BTreeMap::new()),
        }
    }

    pub fn policy(&self) -> &DisqualificationPolicy {
        &self.config.policy
    }

    /// Register a new background check in `awaiting_consent`.
    pub fn create(&self, request: CheckRequest) -> Result<BackgroundCheck, ScreeningError> {
        let check_type = CheckType::parse(&request.check_type)
            .ok_or_else(|| ScreeningError::InvalidCheckType(request.check_type.clone()))?;

        let now = Utc::now();
        let check = BackgroundCheck {
            id: next_check_id(),
            candidate_id: request.candidate_id,
            check_type,
            priority: request.priority,
            requested_by: request.requested_by,
            status: CheckStatus::AwaitingConsent,
            paused: false,
            consent_given: false,
            consent_date: None,
            created_at: now,
            updated_at: now,
            started_at: None,
            completed_at: None,
            progress: 0,
            verification_results: Vec::new(),
            criminal_checks: Vec::new(),
            credit_check: None,
        };

        let stored = self.repository.insert(check)?;
        Ok(stored)
    }

    /// Record the candidate's consent decision. Moves `awaiting_consent`
    /// checks to `pending` when consent is granted. Once a check has
    /// started its consent is locked in: started and terminal checks
    /// reject consent updates outright.
    pub fn record_consent(
        &self,
        id: &CheckId,
        given: bool,
        date: DateTime<Utc>,
    ) -> Result<BackgroundCheck, ScreeningError> {
        self.with_check(id, |_, check, _| {
            if check.is_terminal() || check.started_at.is_some() {
                return Err(ScreeningError::invalid_transition("record_consent", check));
            }

            check.consent_given = given;
            check.consent_date = Some(date);
            if given && check.status == CheckStatus::AwaitingConsent {
                check.status = CheckStatus::Pending;
            }
            Ok(())
        })
    }

    /// Fan out the required sub-checks and move the aggregate to
    /// `in_progress`. Returns immediately; providers report back through
    /// [`LifecycleEngine::record_sub_check_result`].
    pub fn start(&self, id: &CheckId) -> Result<BackgroundCheck, ScreeningError> {
        self.with_check(id, |engine, check, now| {
            let startable = matches!(
                check.status,
                CheckStatus::AwaitingConsent | CheckStatus::Pending
            ) && !check.paused
                && check.started_at.is_none();
            if !startable {
                return Err(ScreeningError::invalid_transition("start", check));
            }
            if !check.consent_given {
                return Err(ScreeningError::ConsentRequired);
            }

            check.verification_results = check
                .check_type
                .required_verifications()
                .iter()
                .copied()
                .map(VerificationResult::pending)
                .collect();
            check.criminal_checks = check
                .check_type
                .required_criminal_scopes()
                .iter()
                .map(|&scope| {
                    CriminalCheck::pending(
                        scope,
                        engine.config.jurisdictions.jurisdiction_for(scope).to_string(),
                    )
                })
                .collect();
            check.credit_check = check.check_type.includes_credit().then(CreditCheck::pending);

            check.started_at = Some(now);
            check.progress = 0;
            check.status = CheckStatus::InProgress;
            Ok(())
        })
    }

    /// Apply one provider-reported sub-check result and rederive the
    /// aggregate status and progress.
    pub fn record_sub_check_result(
        &self,
        id: &CheckId,
        result: SubCheckResult,
    ) -> Result<BackgroundCheck, ScreeningError> {
        self.with_check(id, |engine, check, now| {
            if check.status != CheckStatus::InProgress {
                return Err(ScreeningError::invalid_transition(
                    "record_sub_check_result",
                    check,
                ));
            }

            engine.apply_sub_check_result(check, result, now)?;

            let tally = status::tally(
                &check.verification_results,
                &check.criminal_checks,
                check.credit_check.as_ref(),
                &engine.config.policy,
            );
            check.progress = tally.progress();

            let derived = status::derive_status(check, &engine.config.policy);
            if derived.is_terminal() {
                check.completed_at = Some(now);
            }
            check.status = derived;
            Ok(())
        })
    }

    /// Suspend an in-progress check without discarding sub-check state or
    /// progress. In-flight provider requests are not retracted.
    pub fn pause(&self, id: &CheckId) -> Result<BackgroundCheck, ScreeningError> {
        self.with_check(id, |_, check, _| {
            if check.status != CheckStatus::InProgress {
                return Err(ScreeningError::invalid_transition("pause", check));
            }
            check.paused = true;
            check.status = CheckStatus::Pending;
            Ok(())
        })
    }

    /// Reverse a pause. Only legal from the paused `pending` state, never from
    /// the never-started one.
    pub fn resume(&self, id: &CheckId) -> Result<BackgroundCheck, ScreeningError> {
        self.with_check(id, |_, check, _| {
            if check.status != CheckStatus::Pending || !check.paused {
                return Err(ScreeningError::invalid_transition("resume", check));
            }
            check.paused = false;
            check.status = CheckStatus::InProgress;
            Ok(())
        })
    }

    /// Cancel a non-terminal check. Cancellation is cooperative: in-flight
    /// provider requests keep running but their results are no longer
    /// accepted. Cancelling an already-cancelled check is a no-op.
    pub fn cancel(&self, id: &CheckId) -> Result<BackgroundCheck, ScreeningError> {
        self.with_check(id, |_, check, now| {
            if check.status == CheckStatus::Cancelled {
                return Ok(());
            }
            if check.is_terminal() {
                return Err(ScreeningError::invalid_transition("cancel", check));
            }
            check.paused = false;
            check.progress = 0;
            check.completed_at = Some(now);
            check.status = CheckStatus::Cancelled;
            Ok(())
        })
    }

    /// Fetch one check by id.
    pub fn get(&self, id: &CheckId) -> Result<BackgroundCheck, ScreeningError> {
        self.repository.fetch(id)?.ok_or(ScreeningError::NotFound)
    }

    /// List checks matching the filter, newest first.
    pub fn list(&self, filter: &CheckFilter) -> Result<Vec<BackgroundCheck>, ScreeningError> {
        let mut checks = self.repository.list(filter)?;
        checks.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(checks)
    }

    fn apply_sub_check_result(
        &self,
        check: &mut BackgroundCheck,
        result: SubCheckResult,
        now: DateTime<Utc>,
    ) -> Result<(), ScreeningError> {
        match result {
            SubCheckResult::Verification {
                kind,
                result,
                verified_by,
            } => {
                let verification = check
                    .verification_results
                    .iter_mut()
                    .find(|v| v.kind == kind)
                    .ok_or(ScreeningError::NotFound)?;
                verification.status = match result {
                    VerificationOutcome::Fail => VerificationStatus::Failed,
                    _ => VerificationStatus::Verified,
                };
                verification.result = Some(result);
                verification.verified_by = Some(verified_by);
                verification.verification_date = Some(now);
            }
            SubCheckResult::Criminal { scope, result } => {
                let criminal = check
                    .criminal_checks
                    .iter_mut()
                    .find(|c| c.scope == scope)
                    .ok_or(ScreeningError::NotFound)?;
                criminal.status = CriminalCheckStatus::Completed;
                criminal.result = Some(result);
                criminal.records_found = Some(result == CriminalOutcome::RecordsFound);
                criminal.search_date = Some(now);
            }
            SubCheckResult::Credit { score } => {
                let credit = check
                    .credit_check
                    .as_mut()
                    .ok_or(ScreeningError::NotFound)?;
                credit.status = CreditCheckStatus::Completed;
                credit.credit_score = Some(score);
                credit.credit_rating = Some(CreditRating::from_score(score));
                credit.checked_at = Some(now);
            }
        }
        Ok(())
    }

    /// Serialize on the per-aggregate lock, run the command against a working
    /// copy, and persist it only when the command accepted. The status-change
    /// event goes out after the update is stored, never for a state the
    /// repository has not seen.
    fn with_check<F>(&self, id: &CheckId, apply: F) -> Result<BackgroundCheck, ScreeningError>
    where
        F: FnOnce(&Self, &mut BackgroundCheck, DateTime<Utc>) -> Result<(), ScreeningError>,
    {
        let lock = self.lock_for(id);
        let _held = lock.lock().expect("aggregate lock poisoned");

        let mut check = self.repository.fetch(id)?.ok_or(ScreeningError::NotFound)?;
        let before = check.clone();
        let now = Utc::now();

        apply(self, &mut check, now).map_err(|err| {
            if before.is_terminal() {
                self.drop_lock(id);
            }
            err
        })?;

        if check != before {
            check.updated_at = now;
            self.repository.update(check.clone())?;
            if check.status != before.status {
                self.events.publish(StatusChanged {
                    id: check.id.clone(),
                    previous_status: before.status,
                    new_status: check.status,
                    at: now,
                })?;
            }
        }
        // terminal checks take no further commands, their lock entry is done
        if check.is_terminal() {
            self.drop_lock(id);
        }
        Ok(check)
    }

    fn lock_for(&self, id: &CheckId) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().expect("lock map poisoned");
        locks.entry(id.clone()).or_default().clone()
    }

    fn drop_lock(&self, id: &CheckId) {
        self.locks.lock().expect("lock map poisoned").remove(id);
    }

    #[cfg(test)]
    pub(crate) fn tracked_lock_count(&self) -> usize {
        self.locks.lock().expect("lock map poisoned").len()
    }
}

/// Error raised by the lifecycle engine's command and query surface.
#[derive(Debug, thiserror::Error)]
pub enum ScreeningError {
    #[error("background check or sub-check not found")]
    NotFound,
    #[error("unrecognized check type '{0}'")]
    InvalidCheckType(String),
    #[error("candidate consent is required before starting")]
    ConsentRequired,
    #[error("{command} is not allowed while the check is {status}")]
    InvalidTransition {
        command: &'static str,
        status: &'static str,
    },
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Events(#[from] EventError),
}

impl ScreeningError {
    fn invalid_transition(command: &'static str, check: &BackgroundCheck) -> Self {
        ScreeningError::InvalidTransition {
            command,
            status: check.status.label(),
        }
    }
}
