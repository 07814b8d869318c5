use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::domain::{CheckId, CheckStatus};

/// Notification emitted on every aggregate status transition so report
/// generation and observability collaborators can subscribe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusChanged {
    pub id: CheckId,
    pub previous_status: CheckStatus,
    pub new_status: CheckStatus,
    pub at: DateTime<Utc>,
}

/// Trait describing outbound transition hooks (e.g., report generator or
/// webhook adapters).
pub trait EventPublisher: Send + Sync {
    fn publish(&self, event: StatusChanged) -> Result<(), EventError>;
}

/// Event dispatch error.
#[derive(Debug, thiserror::Error)]
pub enum EventError {
    #[error("event transport unavailable: {0}")]
    Transport(String),
}

/// Default publisher: records transitions on the service log.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingPublisher;

impl EventPublisher for TracingPublisher {
    fn publish(&self, event: StatusChanged) -> Result<(), EventError> {
        info!(
            check_id = %event.id.0,
            previous = event.previous_status.label(),
            new = event.new_status.label(),
            "background check transitioned"
        );
        Ok(())
    }
}
