use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tokio::fs;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use crate::models::{Account, Id, Transaction, UserProfile};

use super::DocumentStore;

/// JSON file-backed document store.
///
/// Directory structure:
/// ```text
/// data/
///   users/
///     {user_id}.json
///   accounts/
///     {account_id}.json
///   transactions/
///     {account_id}.jsonl
/// ```
///
/// This mirrors the hosted store's flat collections so the same gateway
/// code drives either backend.
pub struct JsonFileStore {
    base_path: PathBuf,
}

impl JsonFileStore {
    pub fn new(base_path: impl AsRef<Path>) -> Self {
        Self {
            base_path: base_path.as_ref().to_path_buf(),
        }
    }

    fn users_dir(&self) -> PathBuf {
        self.base_path.join("users")
    }

    fn accounts_dir(&self) -> PathBuf {
        self.base_path.join("accounts")
    }

    fn transactions_dir(&self) -> PathBuf {
        self.base_path.join("transactions")
    }

    fn profile_file(&self, user_id: &Id) -> Result<PathBuf> {
        Ok(self.users_dir().join(format!("{}.json", checked(user_id)?)))
    }

    fn account_file(&self, id: &Id) -> Result<PathBuf> {
        Ok(self.accounts_dir().join(format!("{}.json", checked(id)?)))
    }

    fn transactions_file(&self, account_id: &Id) -> Result<PathBuf> {
        Ok(self
            .transactions_dir()
            .join(format!("{}.jsonl", checked(account_id)?)))
    }

    async fn ensure_dir(path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .context("Failed to create directory")?;
        }
        Ok(())
    }

    async fn read_json<T: for<'de> serde::Deserialize<'de>>(path: &Path) -> Result<Option<T>> {
        match fs::read_to_string(path).await {
            Ok(content) => {
                let value = serde_json::from_str(&content)
                    .with_context(|| format!("Failed to parse JSON from {path:?}"))?;
                Ok(Some(value))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).context("Failed to read file"),
        }
    }

    async fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> Result<()> {
        Self::ensure_dir(path).await?;
        let content = serde_json::to_string_pretty(value).context("Failed to serialize JSON")?;
        fs::write(path, content)
            .await
            .context("Failed to write file")?;
        Ok(())
    }

    async fn read_jsonl<T: for<'de> serde::Deserialize<'de>>(path: &Path) -> Result<Vec<T>> {
        let file = match fs::File::open(path).await {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e).context("Failed to open file"),
        };

        let reader = BufReader::new(file);
        let mut lines = reader.lines();
        let mut items = Vec::new();

        while let Some(line) = lines.next_line().await.context("Failed to read line")? {
            if line.trim().is_empty() {
                continue;
            }
            let item: T = serde_json::from_str(&line)
                .with_context(|| format!("Failed to parse JSONL line: {line}"))?;
            items.push(item);
        }

        Ok(items)
    }

    async fn remove_if_exists(path: &Path) -> Result<()> {
        match fs::remove_file(path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).context("Failed to remove file"),
        }
    }

    async fn append_jsonl<T: serde::Serialize>(path: &Path, items: &[T]) -> Result<()> {
        if items.is_empty() {
            return Ok(());
        }

        Self::ensure_dir(path).await?;

        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await
            .context("Failed to open file for append")?;

        for item in items {
            let line = serde_json::to_string(item).context("Failed to serialize item")?;
            file.write_all(line.as_bytes()).await?;
            file.write_all(b"\n").await?;
        }

        Ok(())
    }
}

fn checked(id: &Id) -> Result<&str> {
    if Id::is_path_safe(id.as_str()) {
        Ok(id.as_str())
    } else {
        anyhow::bail!("Id {:?} is not a safe path segment", id.as_str())
    }
}

#[async_trait::async_trait]
impl DocumentStore for JsonFileStore {
    async fn get_profile(&self, user_id: &Id) -> Result<Option<UserProfile>> {
        Self::read_json(&self.profile_file(user_id)?).await
    }

    async fn save_profile(&self, profile: &UserProfile) -> Result<()> {
        Self::write_json(&self.profile_file(&profile.id)?, profile).await
    }

    async fn get_account(&self, id: &Id) -> Result<Option<Account>> {
        Self::read_json(&self.account_file(id)?).await
    }

    async fn save_account(&self, account: &Account) -> Result<()> {
        Self::write_json(&self.account_file(&account.id)?, account).await
    }

    async fn list_accounts(&self, user_id: &Id) -> Result<Vec<Account>> {
        let mut accounts = Vec::new();

        let mut entries = match fs::read_dir(self.accounts_dir()).await {
            Ok(e) => e,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(accounts),
            Err(e) => return Err(e).context("Failed to read accounts directory"),
        };

        while let Some(entry) = entries.next_entry().await.context("Failed to read entry")? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            // Skip unparseable documents rather than failing the whole listing.
            match Self::read_json::<Account>(&path).await {
                Ok(Some(account)) if &account.user_id == user_id => accounts.push(account),
                Ok(_) => {}
                Err(err) => {
                    tracing::warn!(path = %path.display(), error = %err, "Skipping invalid account document");
                }
            }
        }

        accounts.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(accounts)
    }

    async fn get_transactions(&self, account_id: &Id) -> Result<Vec<Transaction>> {
        Self::read_jsonl(&self.transactions_file(account_id)?).await
    }

    async fn append_transactions(&self, account_id: &Id, txns: &[Transaction]) -> Result<()> {
        Self::append_jsonl(&self.transactions_file(account_id)?, txns).await
    }

    async fn remove_user_data(&self, user_id: &Id) -> Result<()> {
        for account in self.list_accounts(user_id).await? {
            Self::remove_if_exists(&self.transactions_file(&account.id)?).await?;
            Self::remove_if_exists(&self.account_file(&account.id)?).await?;
        }
        Ok(())
    }
}
