//! Tests for the manual entry path.

use std::sync::Arc;

use rust_decimal_macros::dec;

use super::{LedgerService, NewTransaction, NewTransfer};
use crate::accounts::{DebtDirection, TransactionKind};
use crate::errors::{LedgerError, StoreError, ValidationError};
use crate::events::{DomainEvent, MockDomainEventSink};
use crate::fx::FxError;
use crate::test_support::{account, at, credit, debt, funds, MockLedgerStore, MockRates};
use crate::accounts::AccountKind;
use crate::Error;

fn service(store: &MockLedgerStore, rates: MockRates) -> (LedgerService, MockDomainEventSink) {
    let sink = MockDomainEventSink::new();
    let service = LedgerService::new(Arc::new(store.clone()), Arc::new(rates))
        .with_event_sink(Arc::new(sink.clone()));
    (service, sink)
}

fn entry(account_id: &str, kind: TransactionKind, amount: rust_decimal::Decimal) -> NewTransaction {
    NewTransaction {
        account_id: account_id.to_string(),
        kind,
        amount,
        currency: None,
        occurred_at: at(2024, 3, 1),
        note: Some("coffee".to_string()),
    }
}

#[tokio::test]
async fn test_record_commits_and_emits() {
    let store = MockLedgerStore::new().with_accounts(vec![funds("wallet", dec!(100))]);
    let (service, sink) = service(&store, MockRates::default());

    let receipt = service
        .record(entry("wallet", TransactionKind::Expense, dec!(4.5)))
        .await
        .unwrap();

    assert_eq!(receipt.balance_of("wallet"), Some(dec!(95.5)));
    assert_eq!(service.balance("wallet").await.unwrap(), dec!(95.5));
    assert_eq!(store.transactions()[0].note.as_deref(), Some("coffee"));
    assert!(matches!(
        &sink.events()[0],
        DomainEvent::TransactionsPosted { definition_id: None, .. }
    ));
}

#[tokio::test]
async fn test_record_converts_foreign_amount() {
    let store = MockLedgerStore::new().with_accounts(vec![funds("wallet", dec!(100))]);
    let (service, _) = service(&store, MockRates::default().with_rate("EUR", "USD", dec!(1.2)));

    let mut new = entry("wallet", TransactionKind::Expense, dec!(10));
    new.currency = Some("eur".to_string());
    service.record(new).await.unwrap();

    let tx = &store.transactions()[0];
    assert_eq!(tx.amount, dec!(12));
    assert_eq!(tx.original_amount, Some(dec!(10)));
    assert_eq!(tx.original_currency.as_deref(), Some("EUR"));
}

#[tokio::test]
async fn test_record_rejects_invalid_currency_code() {
    let store = MockLedgerStore::new().with_accounts(vec![funds("wallet", dec!(100))]);
    let (service, _) = service(&store, MockRates::default());

    let mut new = entry("wallet", TransactionKind::Expense, dec!(10));
    new.currency = Some("EURO".to_string());
    let err = service.record(new).await.unwrap_err();
    assert!(matches!(err, Error::Fx(FxError::InvalidCurrencyCode(_))));
}

#[tokio::test]
async fn test_record_on_debt_account_is_invalid_operation() {
    let store = MockLedgerStore::new()
        .with_accounts(vec![debt("loan", dec!(10), DebtDirection::Payable, "Bank")]);
    let (service, sink) = service(&store, MockRates::default());

    let err = service
        .record(entry("loan", TransactionKind::TransferOut, dec!(5)))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Ledger(LedgerError::InvalidOperation { .. })));
    assert!(store.transactions().is_empty());
    assert!(sink.is_empty());
}

#[tokio::test]
async fn test_record_over_credit_limit_leaves_balance_unchanged() {
    let store = MockLedgerStore::new().with_accounts(vec![credit("card", dec!(80), dec!(100))]);
    let (service, _) = service(&store, MockRates::default());

    let err = service
        .record(entry("card", TransactionKind::Expense, dec!(30)))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Ledger(LedgerError::LimitExceeded { .. })));
    assert_eq!(store.balance_now("card"), dec!(80));
}

#[tokio::test]
async fn test_record_unknown_account_is_not_found() {
    let store = MockLedgerStore::new();
    let (service, _) = service(&store, MockRates::default());

    let err = service
        .record(entry("ghost", TransactionKind::Income, dec!(5)))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Store(StoreError::NotFound(_))));
}

#[tokio::test]
async fn test_record_rejects_zero_amount() {
    let store = MockLedgerStore::new().with_accounts(vec![funds("wallet", dec!(100))]);
    let (service, _) = service(&store, MockRates::default());

    let err = service
        .record(entry("wallet", TransactionKind::Income, dec!(0)))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Validation(ValidationError::NonPositiveAmount(_))
    ));
}

#[tokio::test]
async fn test_transfer_between_currencies_posts_both_legs() {
    let store = MockLedgerStore::new().with_accounts(vec![
        funds("wallet", dec!(100)),
        account("euro", "EUR", dec!(0), AccountKind::Funds),
    ]);
    let (service, sink) = service(&store, MockRates::default().with_rate("USD", "EUR", dec!(0.9)));

    let receipt = service
        .record_transfer(NewTransfer {
            from_account_id: "wallet".to_string(),
            to_account_id: "euro".to_string(),
            amount: dec!(50),
            currency: Some("USD".to_string()),
            occurred_at: at(2024, 3, 1),
            note: None,
        })
        .await
        .unwrap();

    assert_eq!(receipt.transaction_ids.len(), 2);
    assert_eq!(receipt.balance_of("wallet"), Some(dec!(50)));
    assert_eq!(receipt.balance_of("euro"), Some(dec!(45)));
    assert_eq!(sink.len(), 1);
}

#[tokio::test]
async fn test_transfer_rejected_leg_writes_nothing() {
    let store = MockLedgerStore::new().with_accounts(vec![
        funds("wallet", dec!(100)),
        debt("loan", dec!(100), DebtDirection::Payable, "Bank"),
    ]);
    let (service, _) = service(&store, MockRates::default());

    let err = service
        .record_transfer(NewTransfer {
            from_account_id: "wallet".to_string(),
            to_account_id: "loan".to_string(),
            amount: dec!(50),
            currency: None,
            occurred_at: at(2024, 3, 1),
            note: None,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Ledger(LedgerError::InvalidOperation { .. })));
    assert!(store.transactions().is_empty());
    assert_eq!(store.balance_now("wallet"), dec!(100));
}
