use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::clock::Clock;

use super::{DataSource, Id};

/// Basic identity info supplied by the caller when seeding. Everything is
/// optional; defaults are applied when the profile is created.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

pub const DEFAULT_DISPLAY_NAME: &str = "Demo User";

/// Derived totals over a user's transactions and accounts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinancialSummary {
    pub total_balance: Decimal,
    pub total_income: Decimal,
    pub total_expenses: Decimal,
    pub total_savings: Decimal,
    pub updated_at: DateTime<Utc>,
}

impl FinancialSummary {
    pub fn empty(at: DateTime<Utc>) -> Self {
        Self {
            total_balance: Decimal::ZERO,
            total_income: Decimal::ZERO,
            total_expenses: Decimal::ZERO,
            total_savings: Decimal::ZERO,
            updated_at: at,
        }
    }
}

/// Machine-managed sync bookkeeping for a profile.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncState {
    pub last_synced_at: DateTime<Utc>,
    /// False while a seeding run has written some but not all of its data.
    pub consistent: bool,
    /// Set by callers that want the next seed to re-fetch regardless of age.
    pub needs_refresh: bool,
    /// Bumped on every write to the profile.
    pub version: u64,
}

/// The per-user root document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: Id,
    pub display_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    pub summary: FinancialSummary,
    pub data_source: DataSource,
    pub sync: SyncState,
    pub account_count: u32,
    pub transaction_count: u32,
    pub created_at: DateTime<Utc>,
}

impl UserProfile {
    /// Create a profile that has not been seeded yet.
    pub fn pending(id: Id, info: &UserInfo, clock: &dyn Clock) -> Self {
        let now = clock.now();
        Self {
            id,
            display_name: info
                .display_name
                .clone()
                .filter(|n| !n.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_DISPLAY_NAME.to_string()),
            email: info.email.clone().unwrap_or_default(),
            avatar_url: info.avatar_url.clone(),
            summary: FinancialSummary::empty(now),
            data_source: DataSource::Pending,
            sync: SyncState {
                last_synced_at: now,
                consistent: false,
                needs_refresh: false,
                version: 0,
            },
            account_count: 0,
            transaction_count: 0,
            created_at: now,
        }
    }

    /// Whether this profile was synced recently enough to skip re-seeding.
    ///
    /// The window is a policy knob, not a correctness requirement; see the
    /// seeding orchestrator for the default.
    pub fn is_fresh(&self, now: DateTime<Utc>, window: Duration) -> bool {
        self.data_source != DataSource::Pending
            && !self.sync.needs_refresh
            && now.signed_duration_since(self.sync.last_synced_at) < window
    }

    pub fn bump_version(&mut self) {
        self.sync.version += 1;
    }
}
