//! Background-check lifecycle engine.
//!
//! One `BackgroundCheck` aggregate per candidate check request: commands
//! (create, consent, start, pause, resume, cancel, record sub-check result)
//! mutate it under per-id serialization, and the overall status and progress
//! are always derived from the sub-check collections through the pure
//! functions in [`status`].

pub mod domain;
pub mod engine;
pub mod events;
pub mod repository;
pub mod router;
pub mod status;

#[cfg(test)]
mod tests;

pub use domain::{
    BackgroundCheck, CandidateId, CheckId, CheckRequest, CheckStatus, CheckType, CreditCheck,
    CreditCheckStatus, CreditRating, CriminalCheck, CriminalCheckStatus, CriminalOutcome,
    CriminalScope, JurisdictionPlan, Priority, SubCheckResult, VerificationKind,
    VerificationOutcome, VerificationResult, VerificationStatus,
};
pub use engine::{LifecycleEngine, ScreeningConfig, ScreeningError};
pub use events::{EventError, EventPublisher, StatusChanged, TracingPublisher};
pub use repository::{
    CheckFilter, CheckRepository, CheckStatusView, MemoryCheckRepository, RepositoryError,
};
pub use router::screening_router;
pub use status::{derive_status, DisqualificationPolicy, SubCheckTally};
