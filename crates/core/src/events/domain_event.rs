//! Domain event types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::sync::SyncStrategy;

/// Domain events emitted by core services after successful mutations.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DomainEvent {
    /// Transactions were committed, manually or by the scheduler.
    TransactionsPosted {
        account_ids: Vec<String>,
        transaction_ids: Vec<String>,
        /// Set when the posting was produced by a periodic definition.
        definition_id: Option<String>,
    },

    /// A periodic definition was deactivated because it can never fire again
    /// (deleted account, operation not permitted for the category).
    DefinitionInvalidated {
        definition_id: String,
        reason: String,
    },

    /// A debt payoff schedule brought the outstanding amount to zero.
    DefinitionCompleted {
        definition_id: String,
        account_id: String,
    },

    /// One occurrence was refused by a balance bound; the definition stays
    /// due and is retried on a later pass.
    OccurrenceRejected {
        definition_id: String,
        due_at: DateTime<Utc>,
        reason: String,
    },

    /// A reconciliation pass wrote its resolution to both sides.
    LedgerReconciled {
        strategy: SyncStrategy,
        synced_at: DateTime<Utc>,
        transaction_count: usize,
    },
}

impl DomainEvent {
    pub fn transactions_posted(
        account_ids: Vec<String>,
        transaction_ids: Vec<String>,
        definition_id: Option<String>,
    ) -> Self {
        Self::TransactionsPosted {
            account_ids,
            transaction_ids,
            definition_id,
        }
    }

    pub fn definition_invalidated(definition_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::DefinitionInvalidated {
            definition_id: definition_id.into(),
            reason: reason.into(),
        }
    }

    pub fn definition_completed(definition_id: impl Into<String>, account_id: impl Into<String>) -> Self {
        Self::DefinitionCompleted {
            definition_id: definition_id.into(),
            account_id: account_id.into(),
        }
    }

    pub fn occurrence_rejected(
        definition_id: impl Into<String>,
        due_at: DateTime<Utc>,
        reason: impl Into<String>,
    ) -> Self {
        Self::OccurrenceRejected {
            definition_id: definition_id.into(),
            due_at,
            reason: reason.into(),
        }
    }

    pub fn ledger_reconciled(
        strategy: SyncStrategy,
        synced_at: DateTime<Utc>,
        transaction_count: usize,
    ) -> Self {
        Self::LedgerReconciled {
            strategy,
            synced_at,
            transaction_count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_event_serialization() {
        let event = DomainEvent::transactions_posted(
            vec!["acc1".to_string()],
            vec!["tx1".to_string(), "tx2".to_string()],
            Some("def1".to_string()),
        );

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"transactions_posted\""));

        let deserialized: DomainEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized, event);
    }

    #[test]
    fn test_reconciled_event_carries_strategy_tag() {
        let event = DomainEvent::ledger_reconciled(SyncStrategy::Merge, Utc::now(), 3);
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "ledger_reconciled");
        assert_eq!(json["strategy"], "MERGE");
    }
}
