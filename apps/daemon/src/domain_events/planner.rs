//! Decides what a batch of domain events should trigger.

use ledgerkeep_core::events::DomainEvent;

/// Whether the batch changed the local ledger in a way the remote should see.
///
/// `LedgerReconciled` is produced by the sync pass itself and never
/// requests another one.
pub fn plan_sync(events: &[DomainEvent]) -> bool {
    events.iter().any(|event| match event {
        DomainEvent::TransactionsPosted { .. }
        | DomainEvent::DefinitionInvalidated { .. }
        | DomainEvent::DefinitionCompleted { .. } => true,
        DomainEvent::OccurrenceRejected { .. } | DomainEvent::LedgerReconciled { .. } => false,
    })
}

/// Definitions the user should look at: invalidated or repeatedly rejected.
pub fn plan_attention(events: &[DomainEvent]) -> Vec<String> {
    let mut ids: Vec<String> = events
        .iter()
        .filter_map(|event| match event {
            DomainEvent::DefinitionInvalidated { definition_id, .. }
            | DomainEvent::OccurrenceRejected { definition_id, .. } => Some(definition_id.clone()),
            _ => None,
        })
        .collect();
    ids.sort();
    ids.dedup();
    ids
}
