//! Pure status and progress derivation.
//!
//! The aggregate's `status` and `progress` fields are never assigned by
//! command handlers directly; every accepted command recomputes them here from
//! the sub-check collections and the disqualification policy table. That keeps
//! the displayed status from ever desyncing from sub-check reality.

use serde::{Deserialize, Serialize};

use super::domain::{
    BackgroundCheck, CheckStatus, CreditCheck, CreditCheckStatus, CriminalCheck, CriminalOutcome,
    VerificationOutcome, VerificationResult,
};

/// Named policy table deciding which sub-check outcomes fail the whole check.
///
/// Defaults: criminal hits are always disqualifying; a failed verification
/// taints only that claim; credit outcomes never disqualify unless a score
/// floor is configured.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisqualificationPolicy {
    pub criminal_records_disqualify: bool,
    pub verification_fail_disqualifies: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minimum_credit_score: Option<u16>,
}

impl Default for DisqualificationPolicy {
    fn default() -> Self {
        Self {
            criminal_records_disqualify: true,
            verification_fail_disqualifies: false,
            minimum_credit_score: None,
        }
    }
}

/// Terminal/total counts plus the disqualification verdict for one aggregate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubCheckTally {
    pub total: usize,
    pub terminal: usize,
    pub disqualified: bool,
}

impl SubCheckTally {
    /// Progress percentage, floor of terminal over total.
    pub fn progress(&self) -> u8 {
        if self.total == 0 {
            return 0;
        }
        (self.terminal * 100 / self.total) as u8
    }

    pub fn all_terminal(&self) -> bool {
        self.terminal == self.total
    }
}

pub fn tally(
    verifications: &[VerificationResult],
    criminal_checks: &[CriminalCheck],
    credit_check: Option<&CreditCheck>,
    policy: &DisqualificationPolicy,
) -> SubCheckTally {
    let mut total = verifications.len() + criminal_checks.len();
    let mut terminal = 0;
    let mut disqualified = false;

    for verification in verifications {
        if verification.status.is_terminal() {
            terminal += 1;
        }
        if policy.verification_fail_disqualifies
            && verification.result == Some(VerificationOutcome::Fail)
        {
            disqualified = true;
        }
    }

    for criminal in criminal_checks {
        if criminal.result.is_some() {
            terminal += 1;
        }
        if policy.criminal_records_disqualify
            && criminal.result == Some(CriminalOutcome::RecordsFound)
        {
            disqualified = true;
        }
    }

    if let Some(credit) = credit_check {
        total += 1;
        if credit.status.is_terminal() {
            terminal += 1;
        }
        if let (Some(floor), Some(score)) = (policy.minimum_credit_score, credit.credit_score) {
            if credit.status == CreditCheckStatus::Completed && score < floor {
                disqualified = true;
            }
        }
    }

    SubCheckTally {
        total,
        terminal,
        disqualified,
    }
}

/// Status of a started check, derived purely from its sub-checks.
pub fn derive_status(check: &BackgroundCheck, policy: &DisqualificationPolicy) -> CheckStatus {
    let tally = tally(
        &check.verification_results,
        &check.criminal_checks,
        check.credit_check.as_ref(),
        policy,
    );

    if tally.disqualified {
        CheckStatus::Failed
    } else if tally.all_terminal() {
        CheckStatus::Completed
    } else {
        CheckStatus::InProgress
    }
}
