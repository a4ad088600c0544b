mod support;

use anyhow::Result;
use tempfile::TempDir;

use retrovault::models::{DataSource, Id};
use retrovault::store::{DocumentStore, JsonFileStore};

#[tokio::test]
async fn listing_skips_unparseable_account_documents() -> Result<()> {
    let dir = TempDir::new()?;
    let store = JsonFileStore::new(dir.path());

    let user_id = Id::from_string("u1");
    for account in support::fixed_dataset(&user_id, DataSource::Sample).accounts {
        store.save_account(&account).await?;
    }

    let accounts_dir = dir.path().join("accounts");
    std::fs::write(accounts_dir.join("corrupt.json"), "{not json at all")?;
    std::fs::write(accounts_dir.join("notes.txt"), "ignore me")?;

    let accounts = store.list_accounts(&user_id).await?;
    assert_eq!(accounts.len(), 2, "corrupt documents must not fail the listing");

    Ok(())
}

#[tokio::test]
async fn unsafe_ids_are_rejected_not_traversed() -> Result<()> {
    let dir = TempDir::new()?;
    let store = JsonFileStore::new(dir.path());

    let escape = Id::from_string("../escape");
    assert!(store.get_profile(&escape).await.is_err());
    assert!(store.get_account(&escape).await.is_err());
    assert!(store.get_transactions(&escape).await.is_err());

    // Nothing was written outside the store.
    assert!(!dir.path().parent().unwrap().join("escape.json").exists());

    Ok(())
}
