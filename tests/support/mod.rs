#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;
use tokio::sync::Semaphore;

use retrovault::models::{
    Account, AccountKind, DataSource, Id, Transaction, TransactionKind, UserInfo,
};
use retrovault::sources::{Dataset, SeedSource, SourceError};
use retrovault::store::MemoryStore;

/// A configurable seed source for orchestrator tests.
///
/// By default it succeeds with a small fixed dataset; `failing` makes every
/// attempt return the given error instead.
pub struct StubSource {
    name: String,
    tag: DataSource,
    fail_with: Option<fn() -> SourceError>,
    attempts: AtomicUsize,
    /// When set, each `attempt` consumes one permit before proceeding. Lets
    /// tests hold a run open while other callers join it.
    gate: Option<Arc<Semaphore>>,
}

impl StubSource {
    pub fn new(tag: DataSource) -> Self {
        Self {
            name: format!("stub-{tag}"),
            tag,
            fail_with: None,
            attempts: AtomicUsize::new(0),
            gate: None,
        }
    }

    pub fn failing(tag: DataSource, fail_with: fn() -> SourceError) -> Self {
        Self {
            fail_with: Some(fail_with),
            ..Self::new(tag)
        }
    }

    pub fn gated(tag: DataSource, gate: Arc<Semaphore>) -> Self {
        Self {
            gate: Some(gate),
            ..Self::new(tag)
        }
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SeedSource for StubSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn tag(&self) -> DataSource {
        self.tag
    }

    async fn attempt(&self, user_id: &Id, _info: &UserInfo) -> Result<Dataset, SourceError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);

        if let Some(gate) = &self.gate {
            let permit = gate.acquire().await.expect("gate semaphore closed");
            permit.forget();
        }
        if let Some(fail) = self.fail_with {
            return Err(fail());
        }

        Ok(fixed_dataset(user_id, self.tag))
    }
}

/// Two accounts, three transactions, all tagged with `tag`. Totals:
/// income 2000, expenses 75.50, balances 1500.
pub fn fixed_dataset(user_id: &Id, tag: DataSource) -> Dataset {
    let checking = Account::new(
        user_id.clone(),
        "Stub Checking",
        AccountKind::Checking,
        Decimal::new(1000_00, 2),
        tag,
    );
    let savings = Account::new(
        user_id.clone(),
        "Stub Savings",
        AccountKind::Savings,
        Decimal::new(500_00, 2),
        tag,
    );

    let mut dataset = Dataset::new(tag);
    dataset.transactions = vec![
        Transaction::new(
            checking.id.clone(),
            user_id.clone(),
            TransactionKind::Income,
            Decimal::new(2000_00, 2),
            "Paycheck",
            tag,
        ),
        Transaction::new(
            checking.id.clone(),
            user_id.clone(),
            TransactionKind::Expense,
            Decimal::new(60_00, 2),
            "Groceries",
            tag,
        ),
        Transaction::new(
            savings.id.clone(),
            user_id.clone(),
            TransactionKind::Expense,
            Decimal::new(15_50, 2),
            "Streaming subscription",
            tag,
        ),
    ];
    dataset.accounts = vec![checking, savings];
    dataset
}

pub fn memory_store() -> Arc<MemoryStore> {
    Arc::new(MemoryStore::new())
}
