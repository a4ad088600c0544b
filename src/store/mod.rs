mod json_file;
mod memory;

pub use json_file::JsonFileStore;
pub use memory::MemoryStore;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::clock::Clock;
use crate::models::{Account, FinancialSummary, Id, Transaction, TransactionKind, UserProfile};

/// Query options for transactions owned by a user.
#[derive(Debug, Clone, Default)]
pub struct TransactionQuery {
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
    pub newest_first: bool,
    pub limit: Option<usize>,
}

/// A single document mutation inside a batch.
#[derive(Debug, Clone)]
pub enum DocumentWrite {
    /// Remove every account and transaction a user owns. The profile stays.
    ClearUser(Id),
    Account(Account),
    Transactions(Id, Vec<Transaction>),
    Profile(UserProfile),
}

/// An ordered group of mutations submitted together.
///
/// Order matters for stores without multi-document transactions: a seeding
/// run appends the profile write last so a partial failure never leaves a
/// profile pointing at missing accounts or transactions.
#[derive(Debug, Clone, Default)]
pub struct WriteBatch {
    writes: Vec<DocumentWrite>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop a user's existing accounts and transactions. A re-seed puts this
    /// first so the new generation supersedes the old instead of piling on.
    pub fn clear_user(&mut self, user_id: Id) -> &mut Self {
        self.writes.push(DocumentWrite::ClearUser(user_id));
        self
    }

    pub fn put_account(&mut self, account: Account) -> &mut Self {
        self.writes.push(DocumentWrite::Account(account));
        self
    }

    pub fn append_transactions(&mut self, account_id: Id, txns: Vec<Transaction>) -> &mut Self {
        if !txns.is_empty() {
            self.writes.push(DocumentWrite::Transactions(account_id, txns));
        }
        self
    }

    pub fn put_profile(&mut self, profile: UserProfile) -> &mut Self {
        self.writes.push(DocumentWrite::Profile(profile));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }

    pub fn writes(&self) -> &[DocumentWrite] {
        &self.writes
    }
}

/// Generic key-document gateway over the hosted store.
///
/// Backends only implement the single-document primitives; queries and batch
/// application are derived. Aggregate recomputation lives in
/// [`recompute_financial_summary`] so it works across backends.
#[async_trait::async_trait]
pub trait DocumentStore: Send + Sync {
    // Profiles ("users" collection)
    async fn get_profile(&self, user_id: &Id) -> Result<Option<UserProfile>>;
    async fn save_profile(&self, profile: &UserProfile) -> Result<()>;

    // Accounts
    async fn get_account(&self, id: &Id) -> Result<Option<Account>>;
    async fn save_account(&self, account: &Account) -> Result<()>;
    async fn list_accounts(&self, user_id: &Id) -> Result<Vec<Account>>;

    // Transactions
    async fn get_transactions(&self, account_id: &Id) -> Result<Vec<Transaction>>;
    async fn append_transactions(&self, account_id: &Id, txns: &[Transaction]) -> Result<()>;

    /// Delete all accounts a user owns along with their transactions. The
    /// profile document is left alone.
    async fn remove_user_data(&self, user_id: &Id) -> Result<()>;

    /// Query a user's transactions across all of their accounts.
    async fn query_transactions(
        &self,
        user_id: &Id,
        query: &TransactionQuery,
    ) -> Result<Vec<Transaction>> {
        let mut txns = Vec::new();
        for account in self.list_accounts(user_id).await? {
            txns.extend(self.get_transactions(&account.id).await?);
        }

        if let Some(since) = query.since {
            txns.retain(|t| t.date >= since);
        }
        if let Some(until) = query.until {
            txns.retain(|t| t.date < until);
        }

        txns.sort_by_key(|t| t.date);
        if query.newest_first {
            txns.reverse();
        }
        if let Some(limit) = query.limit {
            txns.truncate(limit);
        }

        Ok(txns)
    }

    /// Apply a batch of mutations in order.
    ///
    /// This is at-least-once, not atomic: a failure part-way leaves earlier
    /// writes in place. Callers order their batches accordingly.
    async fn apply_batch(&self, batch: &WriteBatch) -> Result<()> {
        for write in batch.writes() {
            match write {
                DocumentWrite::ClearUser(user_id) => self.remove_user_data(user_id).await?,
                DocumentWrite::Account(account) => self.save_account(account).await?,
                DocumentWrite::Transactions(account_id, txns) => {
                    self.append_transactions(account_id, txns).await?
                }
                DocumentWrite::Profile(profile) => self.save_profile(profile).await?,
            }
        }
        Ok(())
    }
}

/// Recompute a user's financial summary from their stored transactions and
/// account balances, then persist it on the profile.
///
/// Eventually consistent with the transaction set: a write racing this
/// recompute is picked up by the next one.
pub async fn recompute_financial_summary(
    store: &dyn DocumentStore,
    user_id: &Id,
    clock: &dyn Clock,
) -> Result<FinancialSummary> {
    let mut profile = store
        .get_profile(user_id)
        .await?
        .with_context(|| format!("No profile for user {user_id}"))?;

    let accounts = store.list_accounts(user_id).await?;
    let txns = store
        .query_transactions(user_id, &TransactionQuery::default())
        .await?;

    let mut total_income = Decimal::ZERO;
    let mut total_expenses = Decimal::ZERO;
    for txn in &txns {
        match txn.kind {
            TransactionKind::Income => total_income += txn.amount,
            TransactionKind::Expense => total_expenses += txn.amount,
        }
    }

    let summary = FinancialSummary {
        total_balance: accounts.iter().map(|a| a.balance).sum(),
        total_income,
        total_expenses,
        total_savings: total_income - total_expenses,
        updated_at: clock.now(),
    };

    profile.summary = summary.clone();
    profile.account_count = accounts.len() as u32;
    profile.transaction_count = txns.len() as u32;
    profile.sync.consistent = true;
    profile.bump_version();
    store.save_profile(&profile).await?;

    Ok(summary)
}
