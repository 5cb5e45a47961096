//! Periodic transaction scheduler.
//!
//! A pass posts every due occurrence of every active definition, oldest
//! first, interleaved across definitions in `(next_due, id)` order. Each
//! occurrence is one atomic posting that also advances the definition, so an
//! occurrence fires at most once no matter how often the pass is re-run.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use log::{debug, info, warn};
use rust_decimal::Decimal;
use thiserror::Error;

use super::periodic_model::{OccurrenceState, PeriodicDefinition, PeriodicKind};
use crate::accounts::{operation_rule, Account, TransactionKind};
use crate::errors::{LedgerError, StoreError};
use crate::events::{DomainEvent, DomainEventSink, NoOpDomainEventSink};
use crate::fx::{normalize_currency_code, ExchangeRateLookup};
use crate::store::LedgerStore;
use crate::transactions::{DefinitionAdvance, Posting, Transaction, TransactionSource};
use crate::Error;

/// Why a pass stopped before finishing.
#[derive(Error, Debug)]
pub enum SchedulerError {
    /// A transient failure (store or rate source unavailable). Nothing after
    /// the failing occurrence was attempted; re-run the whole pass later.
    #[error("Scheduler pass aborted, retry later: {0}")]
    Retryable(#[source] Error),

    #[error("Scheduler pass failed: {0}")]
    Failed(#[source] Error),
}

impl SchedulerError {
    fn classify(err: Error) -> Self {
        if err.is_transient() {
            SchedulerError::Retryable(err)
        } else {
            SchedulerError::Failed(err)
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, SchedulerError::Retryable(_))
    }
}

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Upper bound on occurrences handled in one pass. The remainder is left
    /// due for the next pass.
    pub max_occurrences_per_pass: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_occurrences_per_pass: 10_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PostedOccurrence {
    pub definition_id: String,
    pub due_at: DateTime<Utc>,
    pub transaction_ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RejectedOccurrence {
    pub definition_id: String,
    pub due_at: DateTime<Utc>,
    pub reason: String,
}

/// What a completed pass did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PassReport {
    pub posted: Vec<PostedOccurrence>,
    /// Definitions deactivated because they can never fire again.
    pub invalidated: Vec<String>,
    /// Debt payoff definitions that reached zero outstanding.
    pub completed: Vec<String>,
    /// Occurrences held back by a balance bound.
    pub rejected: Vec<RejectedOccurrence>,
    /// Set when the pass stopped early on shutdown or the occurrence cap.
    pub interrupted: bool,
}

impl PassReport {
    pub fn transaction_count(&self) -> usize {
        self.posted.iter().map(|p| p.transaction_ids.len()).sum()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PassOutcome {
    Completed(PassReport),
    /// Another pass was already running; this request did nothing.
    Coalesced,
}

enum Prepared {
    Post { posting: Posting, completes: bool },
    /// Debt already settled: deactivate without posting.
    Complete,
}

pub struct PeriodicScheduler {
    store: Arc<dyn LedgerStore>,
    rates: Arc<dyn ExchangeRateLookup>,
    event_sink: Arc<dyn DomainEventSink>,
    config: SchedulerConfig,
    in_progress: Arc<AtomicBool>,
    shutdown: Arc<AtomicBool>,
}

impl PeriodicScheduler {
    pub fn new(store: Arc<dyn LedgerStore>, rates: Arc<dyn ExchangeRateLookup>) -> Self {
        Self {
            store,
            rates,
            event_sink: Arc::new(NoOpDomainEventSink),
            config: SchedulerConfig::default(),
            in_progress: Arc::new(AtomicBool::new(false)),
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_event_sink(mut self, event_sink: Arc<dyn DomainEventSink>) -> Self {
        self.event_sink = event_sink;
        self
    }

    pub fn with_config(mut self, config: SchedulerConfig) -> Self {
        self.config = config;
        self
    }

    /// Flag checked between occurrences. Setting it stops the running pass
    /// after the occurrence in flight and makes later passes return at once.
    pub fn shutdown_handle(&self) -> Arc<AtomicBool> {
        self.shutdown.clone()
    }

    pub fn request_shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }

    /// Runs one scheduler pass as of `now`.
    pub async fn run_pass(&self, now: DateTime<Utc>) -> Result<PassOutcome, SchedulerError> {
        let Some(_guard) = crate::utils::PassGuard::try_acquire(&self.in_progress) else {
            debug!("Scheduler pass already in progress, coalescing");
            return Ok(PassOutcome::Coalesced);
        };

        let due = self
            .store
            .list_due_definitions(now)
            .await
            .map_err(SchedulerError::classify)?;

        let mut queue = BinaryHeap::new();
        let mut pending = HashMap::new();
        for definition in due.into_iter().filter(|d| d.is_due(now)) {
            queue.push(Reverse((definition.next_due, definition.id.clone())));
            pending.insert(definition.id.clone(), definition);
        }
        debug!("Scheduler pass at {}: {} definitions due", now, pending.len());

        let mut report = PassReport::default();
        let mut handled = 0usize;
        while let Some(Reverse((_, id))) = queue.pop() {
            if self.shutdown.load(Ordering::SeqCst) {
                info!("Scheduler pass interrupted by shutdown");
                report.interrupted = true;
                break;
            }
            if handled >= self.config.max_occurrences_per_pass {
                warn!(
                    "Scheduler pass stopped after {} occurrences; the rest stays due",
                    handled
                );
                report.interrupted = true;
                break;
            }
            let Some(definition) = pending.remove(&id) else {
                continue;
            };
            handled += 1;

            if let Some(next) = self.execute(&definition, now, &mut report).await? {
                if next.is_due(now) {
                    queue.push(Reverse((next.next_due, next.id.clone())));
                    pending.insert(next.id.clone(), next);
                }
            }
        }

        info!(
            "Scheduler pass finished: {} occurrences posted, {} rejected, {} invalidated, {} completed",
            report.posted.len(),
            report.rejected.len(),
            report.invalidated.len(),
            report.completed.len()
        );
        Ok(PassOutcome::Completed(report))
    }

    /// Handles one occurrence. Returns the advanced definition when it is
    /// still active.
    async fn execute(
        &self,
        definition: &PeriodicDefinition,
        now: DateTime<Utc>,
        report: &mut PassReport,
    ) -> Result<Option<PeriodicDefinition>, SchedulerError> {
        debug!(
            "Definition {} occurrence {}: {:?}",
            definition.id,
            definition.next_due,
            OccurrenceState::Executing
        );

        let prepared = match self.prepare(definition, now).await {
            Ok(prepared) => prepared,
            Err(Error::DefinitionInvalidated { reason, .. }) => {
                self.invalidate(definition, reason, now, report).await?;
                return Ok(None);
            }
            Err(err) => return Err(SchedulerError::classify(err)),
        };

        let (posting, completes) = match prepared {
            Prepared::Complete => {
                self.store
                    .save_definition(definition.deactivated(now))
                    .await
                    .map_err(SchedulerError::classify)?;
                self.complete(definition, report);
                return Ok(None);
            }
            Prepared::Post { posting, completes } => (posting, completes),
        };

        let account_ids = posting.account_ids();
        let advanced = posting.advance.as_ref().map(|a| a.definition.clone());

        match self.store.commit_posting(posting).await {
            Ok(receipt) => {
                debug!(
                    "Definition {} occurrence {}: {:?}",
                    definition.id,
                    definition.next_due,
                    OccurrenceState::Posted
                );
                self.event_sink.emit(DomainEvent::transactions_posted(
                    account_ids,
                    receipt.transaction_ids.clone(),
                    Some(definition.id.clone()),
                ));
                report.posted.push(PostedOccurrence {
                    definition_id: definition.id.clone(),
                    due_at: definition.next_due,
                    transaction_ids: receipt.transaction_ids,
                });
                if completes {
                    self.complete(definition, report);
                }
                Ok(advanced.filter(|d| d.active))
            }
            Err(Error::Ledger(err @ LedgerError::LimitExceeded { .. })) => {
                warn!(
                    "Definition {} occurrence {} held back: {}",
                    definition.id, definition.next_due, err
                );
                self.event_sink.emit(DomainEvent::occurrence_rejected(
                    definition.id.clone(),
                    definition.next_due,
                    err.to_string(),
                ));
                report.rejected.push(RejectedOccurrence {
                    definition_id: definition.id.clone(),
                    due_at: definition.next_due,
                    reason: err.to_string(),
                });
                Ok(None)
            }
            Err(
                err @ (Error::Ledger(LedgerError::InvalidOperation { .. })
                | Error::Store(StoreError::NotFound(_))
                | Error::Validation(_)),
            ) => {
                self.invalidate(definition, err.to_string(), now, report)
                    .await?;
                Ok(None)
            }
            Err(Error::Store(StoreError::Integrity(message))) => {
                // Advanced or replaced by someone else since it was loaded.
                warn!(
                    "Definition {} changed during the pass, skipping: {}",
                    definition.id, message
                );
                Ok(None)
            }
            Err(err) => {
                debug!(
                    "Definition {} occurrence {}: {:?}",
                    definition.id,
                    definition.next_due,
                    OccurrenceState::Failed
                );
                Err(SchedulerError::classify(err))
            }
        }
    }

    async fn prepare(
        &self,
        definition: &PeriodicDefinition,
        now: DateTime<Utc>,
    ) -> crate::Result<Prepared> {
        let source = self.load_account(definition, &definition.account_id).await?;
        let source_op = definition.kind.source_operation();
        check_permitted(definition, &source, source_op)?;

        let counter = match &definition.counter_account_id {
            Some(counter_id) => {
                let counter = self.load_account(definition, counter_id).await?;
                let direction = source.debt_terms().map(|terms| terms.direction);
                match definition.kind.counter_operation(direction) {
                    Some(op) => {
                        check_permitted(definition, &counter, op)?;
                        Some((counter, op))
                    }
                    None => None,
                }
            }
            None => None,
        };
        if definition.kind.requires_counter_account() && counter.is_none() {
            return Err(invalidated(definition, "transfer has no counter account"));
        }

        let as_of = definition.next_due.date_naive();
        let mut amount = self
            .convert(definition, definition.amount, &definition.currency, &source.currency, as_of)
            .await?;
        let mut capped = false;

        if definition.kind == PeriodicKind::DebtSettle {
            let outstanding = self.store.balance(&source.id).await?;
            if outstanding <= Decimal::ZERO {
                return Ok(Prepared::Complete);
            }
            if amount >= outstanding {
                amount = outstanding;
                capped = true;
            }
        }

        let mut legs = vec![self.leg(definition, &source, source_op, amount, capped)];
        if let Some((counter, op)) = counter {
            let counter_amount = if capped {
                self.convert(definition, amount, &source.currency, &counter.currency, as_of)
                    .await?
            } else {
                self.convert(
                    definition,
                    definition.amount,
                    &definition.currency,
                    &counter.currency,
                    as_of,
                )
                .await?
            };
            legs.push(self.leg(definition, &counter, op, counter_amount, capped));
        }

        let Some(mut advanced) = definition.advanced(now) else {
            return Err(invalidated(definition, "recurrence cannot be advanced"));
        };
        if capped {
            advanced.active = false;
        }

        Ok(Prepared::Post {
            posting: Posting {
                transactions: legs,
                advance: Some(DefinitionAdvance {
                    expected_next_due: definition.next_due,
                    definition: advanced,
                }),
            },
            completes: capped,
        })
    }

    async fn load_account(
        &self,
        definition: &PeriodicDefinition,
        account_id: &str,
    ) -> crate::Result<Account> {
        self.store
            .get_account(account_id)
            .await?
            .ok_or_else(|| invalidated(definition, format!("account {} no longer exists", account_id)))
    }

    /// Converts into the account currency. Permanent conversion failures
    /// invalidate the definition; transient ones propagate.
    async fn convert(
        &self,
        definition: &PeriodicDefinition,
        amount: Decimal,
        from: &str,
        to: &str,
        as_of: NaiveDate,
    ) -> crate::Result<Decimal> {
        if normalize_currency_code(from) == normalize_currency_code(to) {
            return Ok(amount);
        }
        match self.rates.convert(amount, from, to, as_of).await {
            Ok(converted) => Ok(converted),
            Err(err @ Error::Fx(_)) if !err.is_transient() => {
                Err(invalidated(definition, err.to_string()))
            }
            Err(err) => Err(err),
        }
    }

    fn leg(
        &self,
        definition: &PeriodicDefinition,
        account: &Account,
        kind: TransactionKind,
        amount: Decimal,
        capped: bool,
    ) -> Transaction {
        let tx = Transaction::new(
            account.id.clone(),
            kind,
            amount,
            definition.next_due,
            TransactionSource::Periodic {
                definition_id: definition.id.clone(),
            },
        )
        .with_note(definition.note.clone());
        let converted =
            normalize_currency_code(&definition.currency) != normalize_currency_code(&account.currency);
        if converted && !capped {
            tx.with_original(definition.amount, definition.currency.clone())
        } else {
            tx
        }
    }

    async fn invalidate(
        &self,
        definition: &PeriodicDefinition,
        reason: String,
        now: DateTime<Utc>,
        report: &mut PassReport,
    ) -> Result<(), SchedulerError> {
        warn!("Deactivating periodic definition {}: {}", definition.id, reason);
        self.store
            .save_definition(definition.deactivated(now))
            .await
            .map_err(SchedulerError::classify)?;
        self.event_sink
            .emit(DomainEvent::definition_invalidated(definition.id.clone(), reason));
        report.invalidated.push(definition.id.clone());
        Ok(())
    }

    fn complete(&self, definition: &PeriodicDefinition, report: &mut PassReport) {
        info!(
            "Debt on account {} settled, definition {} completed",
            definition.account_id, definition.id
        );
        self.event_sink.emit(DomainEvent::definition_completed(
            definition.id.clone(),
            definition.account_id.clone(),
        ));
        report.completed.push(definition.id.clone());
    }
}

fn invalidated(definition: &PeriodicDefinition, reason: impl Into<String>) -> Error {
    Error::DefinitionInvalidated {
        definition_id: definition.id.clone(),
        reason: reason.into(),
    }
}

fn check_permitted(
    definition: &PeriodicDefinition,
    account: &Account,
    kind: TransactionKind,
) -> crate::Result<()> {
    let category = account.category();
    if operation_rule(category, kind).is_none() {
        return Err(invalidated(
            definition,
            LedgerError::InvalidOperation { category, kind }.to_string(),
        ));
    }
    Ok(())
}
