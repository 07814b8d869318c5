use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Identifier wrapper for background checks.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CheckId(pub String);

/// Identifier wrapper for the candidate a check was requested for. Candidate
/// records themselves are owned by a separate intake system.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CandidateId(pub String);

/// Package of sub-checks requested for a candidate. Each tier is a superset of
/// the previous one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckType {
    Basic,
    Standard,
    Comprehensive,
}

impl CheckType {
    pub const fn label(self) -> &'static str {
        match self {
            CheckType::Basic => "basic",
            CheckType::Standard => "standard",
            CheckType::Comprehensive => "comprehensive",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "basic" => Some(CheckType::Basic),
            "standard" => Some(CheckType::Standard),
            "comprehensive" => Some(CheckType::Comprehensive),
            _ => None,
        }
    }

    /// Verification claims this tier must resolve.
    pub const fn required_verifications(self) -> &'static [VerificationKind] {
        match self {
            CheckType::Basic => &[VerificationKind::Identity],
            CheckType::Standard => &[VerificationKind::Identity, VerificationKind::Employment],
            CheckType::Comprehensive => &[
                VerificationKind::Identity,
                VerificationKind::Employment,
                VerificationKind::Education,
            ],
        }
    }

    /// Jurisdiction scopes this tier searches for criminal records.
    pub const fn required_criminal_scopes(self) -> &'static [CriminalScope] {
        match self {
            CheckType::Basic | CheckType::Standard => &[],
            CheckType::Comprehensive => &[
                CriminalScope::County,
                CriminalScope::State,
                CriminalScope::Federal,
            ],
        }
    }

    pub const fn includes_credit(self) -> bool {
        matches!(self, CheckType::Comprehensive)
    }

    /// Total number of sub-checks a started check of this tier must resolve.
    pub const fn required_sub_check_count(self) -> usize {
        self.required_verifications().len()
            + self.required_criminal_scopes().len()
            + self.includes_credit() as usize
    }
}

/// Advisory scheduling priority. The engine records it but never enforces
/// ordering; an external scheduler consumes it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    #[default]
    Normal,
    High,
    Urgent,
}

impl Priority {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "low" => Some(Priority::Low),
            "normal" => Some(Priority::Normal),
            "high" => Some(Priority::High),
            "urgent" => Some(Priority::Urgent),
            _ => None,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Normal => "normal",
            Priority::High => "high",
            Priority::Urgent => "urgent",
        }
    }
}

/// Aggregate status. Never assigned ad hoc: terminal and in-progress values
/// are recomputed from sub-check state on every accepted command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckStatus {
    AwaitingConsent,
    Pending,
    InProgress,
    Completed,
    Failed,
    Cancelled,
}

impl CheckStatus {
    pub const fn label(self) -> &'static str {
        match self {
            CheckStatus::AwaitingConsent => "awaiting_consent",
            CheckStatus::Pending => "pending",
            CheckStatus::InProgress => "in_progress",
            CheckStatus::Completed => "completed",
            CheckStatus::Failed => "failed",
            CheckStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "awaiting_consent" => Some(CheckStatus::AwaitingConsent),
            "pending" => Some(CheckStatus::Pending),
            "in_progress" => Some(CheckStatus::InProgress),
            "completed" => Some(CheckStatus::Completed),
            "failed" => Some(CheckStatus::Failed),
            "cancelled" => Some(CheckStatus::Cancelled),
            _ => None,
        }
    }

    /// Terminal statuses accept no further mutation.
    pub const fn is_terminal(self) -> bool {
        matches!(
            self,
            CheckStatus::Completed | CheckStatus::Failed | CheckStatus::Cancelled
        )
    }
}

/// Claim categories resolvable through verification providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationKind {
    Identity,
    Education,
    Employment,
}

impl VerificationKind {
    pub const fn label(self) -> &'static str {
        match self {
            VerificationKind::Identity => "identity",
            VerificationKind::Education => "education",
            VerificationKind::Employment => "employment",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationStatus {
    Pending,
    InProgress,
    Verified,
    Failed,
}

impl VerificationStatus {
    pub const fn is_terminal(self) -> bool {
        matches!(self, VerificationStatus::Verified | VerificationStatus::Failed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationOutcome {
    Pass,
    Fail,
    Inconclusive,
}

/// One verification claim tracked inside the aggregate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationResult {
    pub kind: VerificationKind,
    pub status: VerificationStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<VerificationOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verified_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verification_date: Option<DateTime<Utc>>,
}

impl VerificationResult {
    pub(crate) fn pending(kind: VerificationKind) -> Self {
        Self {
            kind,
            status: VerificationStatus::Pending,
            result: None,
            verified_by: None,
            verification_date: None,
        }
    }
}

/// Jurisdiction levels searched for criminal records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CriminalScope {
    County,
    State,
    Federal,
}

impl CriminalScope {
    pub const fn label(self) -> &'static str {
        match self {
            CriminalScope::County => "county",
            CriminalScope::State => "state",
            CriminalScope::Federal => "federal",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CriminalCheckStatus {
    Pending,
    InProgress,
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CriminalOutcome {
    Clear,
    RecordsFound,
}

/// One jurisdiction search tracked inside the aggregate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CriminalCheck {
    pub jurisdiction: String,
    pub scope: CriminalScope,
    pub status: CriminalCheckStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<CriminalOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub records_found: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_date: Option<DateTime<Utc>>,
}

impl CriminalCheck {
    pub(crate) fn pending(scope: CriminalScope, jurisdiction: String) -> Self {
        Self {
            jurisdiction,
            scope,
            status: CriminalCheckStatus::Pending,
            result: None,
            records_found: None,
            search_date: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CreditCheckStatus {
    Pending,
    InProgress,
    Completed,
    Skipped,
}

impl CreditCheckStatus {
    pub const fn is_terminal(self) -> bool {
        matches!(self, CreditCheckStatus::Completed | CreditCheckStatus::Skipped)
    }
}

/// Bureau-style rating band derived from the reported score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CreditRating {
    Excellent,
    Good,
    Fair,
    Poor,
}

impl CreditRating {
    pub const fn from_score(score: u16) -> Self {
        match score {
            750.. => CreditRating::Excellent,
            670..=749 => CreditRating::Good,
            580..=669 => CreditRating::Fair,
            _ => CreditRating::Poor,
        }
    }
}

/// Optional credit sub-check, present only for tiers that include it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreditCheck {
    pub status: CreditCheckStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credit_score: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credit_rating: Option<CreditRating>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checked_at: Option<DateTime<Utc>>,
}

impl CreditCheck {
    pub(crate) fn pending() -> Self {
        Self {
            status: CreditCheckStatus::Pending,
            credit_score: None,
            credit_rating: None,
            checked_at: None,
        }
    }
}

/// Jurisdiction display strings used when fanning out criminal searches. A
/// real intake flow overwrites these per candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JurisdictionPlan {
    pub county: String,
    pub state: String,
    pub federal: String,
}

impl JurisdictionPlan {
    pub fn jurisdiction_for(&self, scope: CriminalScope) -> &str {
        match scope {
            CriminalScope::County => &self.county,
            CriminalScope::State => &self.state,
            CriminalScope::Federal => &self.federal,
        }
    }
}

impl Default for JurisdictionPlan {
    fn default() -> Self {
        Self {
            county: "County of residence".to_string(),
            state: "State of residence".to_string(),
            federal: "United States (federal)".to_string(),
        }
    }
}

/// Intake payload for a new background check. The check type arrives raw so
/// the engine can reject unrecognized values at the command surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckRequest {
    pub candidate_id: CandidateId,
    pub check_type: String,
    #[serde(default)]
    pub priority: Priority,
    pub requested_by: String,
}

/// A terminal result reported back by a verification provider, addressed
/// structurally: each kind/scope is unique within one aggregate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "category", rename_all = "snake_case")]
pub enum SubCheckResult {
    Verification {
        kind: VerificationKind,
        result: VerificationOutcome,
        verified_by: String,
    },
    Criminal {
        scope: CriminalScope,
        result: CriminalOutcome,
    },
    Credit {
        score: u16,
    },
}

/// The background-check aggregate root.
///
/// Sub-check collections are append-only after `start`: entries flip status
/// and gain result fields in place but are never removed. `status` and
/// `progress` are derived, see the `status` module.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackgroundCheck {
    pub id: CheckId,
    pub candidate_id: CandidateId,
    pub check_type: CheckType,
    pub priority: Priority,
    pub requested_by: String,
    pub status: CheckStatus,
    /// Distinguishes a paused check from one that has never started; both
    /// surface the `pending` status label.
    pub paused: bool,
    pub consent_given: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub consent_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    /// 0-100, floor of terminal sub-checks over required sub-checks.
    pub progress: u8,
    pub verification_results: Vec<VerificationResult>,
    pub criminal_checks: Vec<CriminalCheck>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credit_check: Option<CreditCheck>,
}

impl BackgroundCheck {
    /// Wall-clock time the check has been running, for SLA escalation by an
    /// external scheduler. `None` until started.
    pub fn elapsed_since_start(&self, now: DateTime<Utc>) -> Option<Duration> {
        self.started_at.map(|started| now - started)
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    pub fn verification(&self, kind: VerificationKind) -> Option<&VerificationResult> {
        self.verification_results.iter().find(|v| v.kind == kind)
    }

    pub fn criminal(&self, scope: CriminalScope) -> Option<&CriminalCheck> {
        self.criminal_checks.iter().find(|c| c.scope == scope)
    }
}
