use std::sync::Arc;

use chrono::Utc;
use log::{debug, info};

use super::periodic_model::{NewPeriodicDefinition, PeriodicDefinition};
use crate::accounts::operation_rule;
use crate::errors::{LedgerError, Result, StoreError};
use crate::store::LedgerStore;

/// User-facing management of periodic definitions.
pub struct PeriodicService {
    store: Arc<dyn LedgerStore>,
}

impl PeriodicService {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self { store }
    }

    /// Creates a definition after checking that its accounts exist and accept
    /// the operations it will post.
    pub async fn create(&self, new_definition: NewPeriodicDefinition) -> Result<PeriodicDefinition> {
        let definition = new_definition.into_definition(Utc::now())?;

        let source = self
            .store
            .get_account(&definition.account_id)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("account {}", definition.account_id)))?;
        let kind = definition.kind.source_operation();
        if operation_rule(source.category(), kind).is_none() {
            return Err(LedgerError::InvalidOperation {
                category: source.category(),
                kind,
            }
            .into());
        }

        if let Some(counter_id) = &definition.counter_account_id {
            let counter = self
                .store
                .get_account(counter_id)
                .await?
                .ok_or_else(|| StoreError::NotFound(format!("account {}", counter_id)))?;
            let direction = source.debt_terms().map(|terms| terms.direction);
            if let Some(kind) = definition.kind.counter_operation(direction) {
                if operation_rule(counter.category(), kind).is_none() {
                    return Err(LedgerError::InvalidOperation {
                        category: counter.category(),
                        kind,
                    }
                    .into());
                }
            }
        }

        debug!(
            "Creating periodic definition {} ({:?}) on account {}",
            definition.id, definition.kind, definition.account_id
        );
        self.store.save_definition(definition).await
    }

    /// Deactivates a definition. Cancelling an inactive definition is a no-op.
    pub async fn cancel(&self, definition_id: &str) -> Result<PeriodicDefinition> {
        let definition = self
            .store
            .get_definition(definition_id)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("periodic definition {}", definition_id)))?;
        if !definition.active {
            return Ok(definition);
        }
        info!("Cancelling periodic definition {}", definition_id);
        self.store
            .save_definition(definition.deactivated(Utc::now()))
            .await
    }

    pub async fn list(&self, active_only: bool) -> Result<Vec<PeriodicDefinition>> {
        let mut definitions = self.store.list_definitions().await?;
        if active_only {
            definitions.retain(|d| d.active);
        }
        definitions.sort_by(|a, b| a.next_due.cmp(&b.next_due).then_with(|| a.id.cmp(&b.id)));
        Ok(definitions)
    }
}
