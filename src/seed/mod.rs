//! The seeding orchestrator: decides whether a user needs data, walks the
//! source fallback chain, and persists the winning dataset.

mod progress;

pub use progress::{ProgressHandle, SeedProgress};

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};

use chrono::Duration;
use tokio::sync::watch;

use crate::clock::{Clock, SystemClock};
use crate::models::{DataSource, FinancialSummary, Id, UserInfo, UserProfile};
use crate::sources::{Dataset, SeedSource, SourceError};
use crate::store::{recompute_financial_summary, DocumentStore, WriteBatch};

/// How recently a profile must have been synced to skip re-seeding.
/// An arbitrary policy constant, not derived from any external contract.
pub const DEFAULT_FRESHNESS_WINDOW_SECS: i64 = 5 * 60;

/// Identity of a physical seeding run. Two calls with the same key share one
/// run; a forced and an unforced call for the same user do not.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SeedKey {
    pub user_id: Id,
    pub force_refresh: bool,
}

/// What a seeding call resolved to. Joined callers receive a clone of the
/// physical run's result.
#[derive(Debug, Clone)]
pub struct SeedResult {
    pub data_source: DataSource,
    pub accounts_count: u32,
    pub transactions_count: u32,
    /// True when the freshness short-circuit fired and nothing was written.
    pub is_existing_data: bool,
    pub summary: FinancialSummary,
}

#[derive(Debug, thiserror::Error)]
pub enum SeedError {
    #[error("invalid request: {0}")]
    Validation(String),

    /// The terminal source in the chain failed; there is no further fallback.
    #[error("all seed sources failed")]
    AllSourcesFailed(#[source] SourceError),

    #[error("failed to persist seeded data")]
    Persistence(#[source] anyhow::Error),

    /// A run this caller joined failed. Carries the original error's message
    /// since errors themselves are not cloneable across joiners.
    #[error("seeding run failed: {0}")]
    Joined(String),
}

/// Outcome shared with joiners over the watch channel.
type SharedOutcome = Result<SeedResult, String>;

struct InFlight {
    rx: watch::Receiver<Option<SharedOutcome>>,
    progress: Arc<ProgressHandle>,
}

/// Coordinates seeding runs.
///
/// The in-flight map is guarded by a synchronous mutex and is never held
/// across an await, so "is a run in progress" and "mark a run in progress"
/// are a single atomic step.
pub struct SeedingOrchestrator {
    store: Arc<dyn DocumentStore>,
    sources: Vec<Arc<dyn SeedSource>>,
    clock: Arc<dyn Clock>,
    freshness_window: Duration,
    in_flight: StdMutex<HashMap<SeedKey, InFlight>>,
}

impl SeedingOrchestrator {
    /// `sources` is the fallback chain, tried in order. The last entry is
    /// terminal: its failure is the caller's failure.
    pub fn new(store: Arc<dyn DocumentStore>, sources: Vec<Arc<dyn SeedSource>>) -> Self {
        Self {
            store,
            sources,
            clock: Arc::new(SystemClock),
            freshness_window: Duration::seconds(DEFAULT_FRESHNESS_WINDOW_SECS),
            in_flight: StdMutex::new(HashMap::new()),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_freshness_window(mut self, window: Duration) -> Self {
        self.freshness_window = window;
        self
    }

    /// Progress of an in-flight run for this key, if any.
    pub fn progress(&self, user_id: &Id, force_refresh: bool) -> Option<SeedProgress> {
        let key = SeedKey {
            user_id: user_id.clone(),
            force_refresh,
        };
        let in_flight = self.in_flight.lock().expect("in-flight lock poisoned");
        in_flight.get(&key).map(|run| run.progress.snapshot())
    }

    /// Seed a user's data from the best available source.
    ///
    /// Concurrent calls with the same (user id, force refresh) key share one
    /// physical run and observe the same result. `force_refresh` bypasses
    /// the freshness short-circuit, not the run sharing.
    pub async fn seed(
        &self,
        user_id: &Id,
        info: &UserInfo,
        force_refresh: bool,
    ) -> Result<SeedResult, SeedError> {
        if user_id.as_str().trim().is_empty() {
            return Err(SeedError::Validation("userId must not be empty".into()));
        }

        let key = SeedKey {
            user_id: user_id.clone(),
            force_refresh,
        };

        // Check-and-register atomically. The guard's scope must not contain
        // an await, or the future stops being Send; joining happens after
        // the block.
        let registration = {
            let mut in_flight = self.in_flight.lock().expect("in-flight lock poisoned");
            match in_flight.get(&key) {
                Some(run) => Err(run.rx.clone()),
                None => {
                    let (tx, rx) = watch::channel(None);
                    let progress = Arc::new(ProgressHandle::new());
                    in_flight.insert(
                        key.clone(),
                        InFlight {
                            rx,
                            progress: progress.clone(),
                        },
                    );
                    Ok((tx, progress))
                }
            }
        };
        let (tx, progress) = match registration {
            Ok(leader) => leader,
            Err(rx) => return Self::join(rx).await,
        };

        tracing::info!(user_id = %key.user_id, force_refresh, "Starting seeding run");
        let outcome = self.run(&key, info, progress.as_ref()).await;

        // Release the slot unconditionally, success or failure, then publish
        // the outcome to joiners still holding receivers.
        {
            let mut in_flight = self.in_flight.lock().expect("in-flight lock poisoned");
            in_flight.remove(&key);
        }
        let shared: SharedOutcome = match &outcome {
            Ok(result) => Ok(result.clone()),
            Err(err) => Err(err.to_string()),
        };
        let _ = tx.send(Some(shared));

        outcome
    }

    async fn join(mut rx: watch::Receiver<Option<SharedOutcome>>) -> Result<SeedResult, SeedError> {
        tracing::debug!("Joining in-flight seeding run");
        let value = rx
            .wait_for(|outcome| outcome.is_some())
            .await
            .map_err(|_| SeedError::Joined("seeding run ended without a result".into()))?
            .clone();

        match value {
            Some(Ok(result)) => Ok(result),
            Some(Err(message)) => Err(SeedError::Joined(message)),
            None => Err(SeedError::Joined("seeding run ended without a result".into())),
        }
    }

    async fn run(
        &self,
        key: &SeedKey,
        info: &UserInfo,
        progress: &ProgressHandle,
    ) -> Result<SeedResult, SeedError> {
        progress.report(5, "Checking existing data");

        let existing = self
            .store
            .get_profile(&key.user_id)
            .await
            .map_err(SeedError::Persistence)?;

        if !key.force_refresh {
            if let Some(profile) = &existing {
                if profile.is_fresh(self.clock.now(), self.freshness_window) {
                    tracing::info!(user_id = %key.user_id, "Profile is fresh; skipping seed");
                    progress.report(100, "Data already up to date");
                    return Ok(SeedResult {
                        data_source: profile.data_source,
                        accounts_count: profile.account_count,
                        transactions_count: profile.transaction_count,
                        is_existing_data: true,
                        summary: profile.summary.clone(),
                    });
                }
            }
        }

        let dataset = self.fetch_dataset(&key.user_id, info, progress).await?;

        progress.report(75, "Saving accounts and transactions");
        self.persist(key, info, existing, &dataset).await?;

        progress.report(90, "Computing financial summary");
        let summary = recompute_financial_summary(
            self.store.as_ref(),
            &key.user_id,
            self.clock.as_ref(),
        )
        .await
        .map_err(SeedError::Persistence)?;

        progress.report(100, "Done");
        tracing::info!(
            user_id = %key.user_id,
            data_source = %dataset.source,
            accounts = dataset.accounts.len(),
            transactions = dataset.transactions.len(),
            "Seeding run complete"
        );

        Ok(SeedResult {
            data_source: dataset.source,
            accounts_count: dataset.accounts.len() as u32,
            transactions_count: dataset.transactions.len() as u32,
            is_existing_data: false,
            summary,
        })
    }

    /// Walk the fallback chain. Non-terminal failures are logged and the
    /// chain advances; the terminal failure propagates.
    async fn fetch_dataset(
        &self,
        user_id: &Id,
        info: &UserInfo,
        progress: &ProgressHandle,
    ) -> Result<Dataset, SeedError> {
        let total = self.sources.len();
        for (index, source) in self.sources.iter().enumerate() {
            let percent = 10 + ((index * 50) / total.max(1)) as u8;
            progress.report(percent, format!("Fetching data from {}", source.name()));

            match source.attempt(user_id, info).await {
                Ok(mut dataset) => {
                    // Provenance is the chain entry's tag, not whatever the
                    // dataset builder stamped.
                    dataset.source = source.tag();
                    tracing::info!(source = source.name(), "Seed source succeeded");
                    return Ok(dataset);
                }
                Err(err) if index + 1 == total => {
                    tracing::error!(source = source.name(), error = %err, "Terminal seed source failed");
                    return Err(SeedError::AllSourcesFailed(err));
                }
                Err(err) => {
                    tracing::warn!(source = source.name(), error = %err, "Seed source failed; falling back");
                }
            }
        }

        Err(SeedError::AllSourcesFailed(SourceError::Empty))
    }

    /// Write the dataset in one batch: clear the previous generation first,
    /// then accounts and transactions, profile last, so a partial failure
    /// never leaves a profile pointing at missing records. A re-seed
    /// supersedes rather than accumulates.
    async fn persist(
        &self,
        key: &SeedKey,
        info: &UserInfo,
        existing: Option<UserProfile>,
        dataset: &Dataset,
    ) -> Result<(), SeedError> {
        let now = self.clock.now();

        let mut profile = existing
            .unwrap_or_else(|| UserProfile::pending(key.user_id.clone(), info, self.clock.as_ref()));
        profile.data_source = dataset.source;
        profile.sync.last_synced_at = now;
        profile.sync.needs_refresh = false;
        // The summary recompute flips this back once counts and totals agree.
        profile.sync.consistent = false;

        let mut batch = WriteBatch::new();
        batch.clear_user(key.user_id.clone());
        for account in &dataset.accounts {
            batch.put_account(account.clone());
        }

        let mut by_account: HashMap<Id, Vec<_>> = HashMap::new();
        for txn in &dataset.transactions {
            by_account
                .entry(txn.account_id.clone())
                .or_default()
                .push(txn.clone());
        }
        for (account_id, txns) in by_account {
            batch.append_transactions(account_id, txns);
        }

        batch.put_profile(profile);

        self.store
            .apply_batch(&batch)
            .await
            .map_err(SeedError::Persistence)
    }
}
