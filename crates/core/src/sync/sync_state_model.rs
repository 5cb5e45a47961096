//! Externally observable sync status.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Status of the reconciliation pass, as shown to the user.
///
/// Every pass goes `Idle -> Loading -> {Success | Error | Conflict}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "state", content = "detail", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SyncUiState {
    #[default]
    Idle,
    Loading(String),
    Success(String),
    Error(String),
    /// Divergent edits that MERGE could not order; carries the remote
    /// snapshot's modification time.
    Conflict(DateTime<Utc>),
}

impl SyncUiState {
    /// Whether the pass has reached an end state.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SyncUiState::Success(_) | SyncUiState::Error(_) | SyncUiState::Conflict(_)
        )
    }
}
