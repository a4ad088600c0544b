//! In-memory store used by tests and the default server wiring.

use std::collections::HashMap;

use anyhow::Result;
use tokio::sync::Mutex;

use crate::models::{Account, Id, Transaction, UserProfile};

use super::DocumentStore;

/// In-memory document store. Not durable; per-collection maps guarded by
/// async mutexes, mirroring the document layout of the hosted store.
pub struct MemoryStore {
    profiles: Mutex<HashMap<Id, UserProfile>>,
    accounts: Mutex<HashMap<Id, Account>>,
    transactions: Mutex<HashMap<Id, Vec<Transaction>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            profiles: Mutex::new(HashMap::new()),
            accounts: Mutex::new(HashMap::new()),
            transactions: Mutex::new(HashMap::new()),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl DocumentStore for MemoryStore {
    async fn get_profile(&self, user_id: &Id) -> Result<Option<UserProfile>> {
        let profiles = self.profiles.lock().await;
        Ok(profiles.get(user_id).cloned())
    }

    async fn save_profile(&self, profile: &UserProfile) -> Result<()> {
        let mut profiles = self.profiles.lock().await;
        profiles.insert(profile.id.clone(), profile.clone());
        Ok(())
    }

    async fn get_account(&self, id: &Id) -> Result<Option<Account>> {
        let accounts = self.accounts.lock().await;
        Ok(accounts.get(id).cloned())
    }

    async fn save_account(&self, account: &Account) -> Result<()> {
        let mut accounts = self.accounts.lock().await;
        accounts.insert(account.id.clone(), account.clone());
        Ok(())
    }

    async fn list_accounts(&self, user_id: &Id) -> Result<Vec<Account>> {
        let accounts = self.accounts.lock().await;
        let mut owned: Vec<Account> = accounts
            .values()
            .filter(|a| &a.user_id == user_id)
            .cloned()
            .collect();
        owned.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(owned)
    }

    async fn get_transactions(&self, account_id: &Id) -> Result<Vec<Transaction>> {
        let txns = self.transactions.lock().await;
        Ok(txns.get(account_id).cloned().unwrap_or_default())
    }

    async fn remove_user_data(&self, user_id: &Id) -> Result<()> {
        let mut accounts = self.accounts.lock().await;
        let owned: Vec<Id> = accounts
            .values()
            .filter(|a| &a.user_id == user_id)
            .map(|a| a.id.clone())
            .collect();
        for id in &owned {
            accounts.remove(id);
        }
        drop(accounts);

        let mut txns = self.transactions.lock().await;
        for id in &owned {
            txns.remove(id);
        }
        Ok(())
    }

    async fn append_transactions(&self, account_id: &Id, new_txns: &[Transaction]) -> Result<()> {
        if new_txns.is_empty() {
            return Ok(());
        }
        let mut txns = self.transactions.lock().await;
        txns.entry(account_id.clone())
            .or_default()
            .extend(new_txns.iter().cloned());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::SystemClock;
    use crate::models::{AccountKind, DataSource, UserInfo};
    use rust_decimal::Decimal;

    #[tokio::test]
    async fn list_accounts_filters_by_owner() -> Result<()> {
        let store = MemoryStore::new();
        let mine = Account::new(
            Id::from_string("u1"),
            "Mine",
            AccountKind::Checking,
            Decimal::ZERO,
            DataSource::Mock,
        );
        let theirs = Account::new(
            Id::from_string("u2"),
            "Theirs",
            AccountKind::Savings,
            Decimal::ZERO,
            DataSource::Mock,
        );
        store.save_account(&mine).await?;
        store.save_account(&theirs).await?;

        let listed = store.list_accounts(&Id::from_string("u1")).await?;
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, mine.id);

        Ok(())
    }

    #[tokio::test]
    async fn profile_roundtrip() -> Result<()> {
        let store = MemoryStore::new();
        let profile = UserProfile::pending(
            Id::from_string("u1"),
            &UserInfo::default(),
            &SystemClock,
        );
        store.save_profile(&profile).await?;

        let loaded = store.get_profile(&profile.id).await?.unwrap();
        assert_eq!(loaded.display_name, profile.display_name);
        assert!(store.get_profile(&Id::from_string("nope")).await?.is_none());

        Ok(())
    }
}
