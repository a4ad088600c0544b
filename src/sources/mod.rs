mod mock;
mod nessie;
mod sample;

pub use mock::MockSource;
pub use nessie::NessieSource;
pub use sample::SampleSource;

use crate::models::{Account, DataSource, Id, Transaction, UserInfo};

/// Why a seed source could not produce data.
///
/// Everything here is recoverable by advancing the fallback chain; only the
/// terminal source's failure is surfaced to the caller.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// No API key (or a placeholder one) configured for this source.
    #[error("source is not configured")]
    Unconfigured,

    /// The backing service was unreachable, unauthorized, or returned a
    /// malformed response. `status` is set when the failure was a non-2xx
    /// HTTP response, so callers can branch on the code instead of parsing
    /// the message.
    #[error("source unavailable: {reason}")]
    Unavailable {
        status: Option<u16>,
        reason: String,
    },

    /// The source is healthy but has nothing for this user.
    #[error("source returned no data")]
    Empty,
}

impl SourceError {
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::Unavailable {
            status: None,
            reason: reason.into(),
        }
    }

    pub fn http_status(status: u16, reason: impl Into<String>) -> Self {
        Self::Unavailable {
            status: Some(status),
            reason: reason.into(),
        }
    }
}

/// One seeding run's worth of data from a single source.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub source: DataSource,
    pub accounts: Vec<Account>,
    pub transactions: Vec<Transaction>,
}

impl Dataset {
    pub fn new(source: DataSource) -> Self {
        Self {
            source,
            accounts: Vec::new(),
            transactions: Vec::new(),
        }
    }
}

/// A data-source strategy in the fallback chain.
///
/// The orchestrator tries sources in a fixed order; the first `Ok` wins.
/// Sources never persist anything themselves.
#[async_trait::async_trait]
pub trait SeedSource: Send + Sync {
    /// Human-readable name for logs.
    fn name(&self) -> &str;

    /// Provenance tag stamped on everything this source produces.
    fn tag(&self) -> DataSource;

    async fn attempt(&self, user_id: &Id, info: &UserInfo) -> Result<Dataset, SourceError>;
}
