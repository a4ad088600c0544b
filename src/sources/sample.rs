//! Pre-built illustrative profiles used when the remote source is down or
//! unconfigured.

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::Decimal;

use crate::clock::{Clock, SystemClock};
use crate::models::{
    Account, AccountKind, Category, DataSource, Id, Transaction, TransactionKind, UserInfo,
};

use super::{Dataset, SeedSource, SourceError};

struct BlueprintAccount {
    name: &'static str,
    kind: AccountKind,
    balance: &'static str,
    institution: &'static str,
}

struct BlueprintTransaction {
    account: usize,
    kind: TransactionKind,
    amount: &'static str,
    category: Category,
    description: &'static str,
    merchant: &'static str,
    days_ago: i64,
}

/// One hand-written dataset shape. Instantiated per user at attempt time so
/// ids are fresh and dates are relative to "now".
pub struct Blueprint {
    pub name: &'static str,
    accounts: Vec<BlueprintAccount>,
    transactions: Vec<BlueprintTransaction>,
}

fn builtin_pool() -> Vec<Blueprint> {
    vec![
        Blueprint {
            name: "young professional",
            accounts: vec![
                BlueprintAccount {
                    name: "Everyday Checking",
                    kind: AccountKind::Checking,
                    balance: "2840.55",
                    institution: "First Retro Bank",
                },
                BlueprintAccount {
                    name: "Rainy Day Savings",
                    kind: AccountKind::Savings,
                    balance: "6100.00",
                    institution: "First Retro Bank",
                },
            ],
            transactions: vec![
                BlueprintTransaction {
                    account: 0,
                    kind: TransactionKind::Income,
                    amount: "3200.00",
                    category: Category::Other,
                    description: "Monthly salary",
                    merchant: "Initech Payroll",
                    days_ago: 14,
                },
                BlueprintTransaction {
                    account: 0,
                    kind: TransactionKind::Expense,
                    amount: "1450.00",
                    category: Category::Bills,
                    description: "Rent payment",
                    merchant: "Parkview Apartments",
                    days_ago: 13,
                },
                BlueprintTransaction {
                    account: 0,
                    kind: TransactionKind::Expense,
                    amount: "86.20",
                    category: Category::Food,
                    description: "Weekly groceries",
                    merchant: "Trader Joe's",
                    days_ago: 9,
                },
                BlueprintTransaction {
                    account: 0,
                    kind: TransactionKind::Expense,
                    amount: "15.49",
                    category: Category::Entertainment,
                    description: "Streaming subscription",
                    merchant: "Netflix",
                    days_ago: 8,
                },
                BlueprintTransaction {
                    account: 0,
                    kind: TransactionKind::Expense,
                    amount: "32.80",
                    category: Category::Transport,
                    description: "Ride home",
                    merchant: "Uber",
                    days_ago: 6,
                },
                BlueprintTransaction {
                    account: 0,
                    kind: TransactionKind::Expense,
                    amount: "64.99",
                    category: Category::Shopping,
                    description: "Order #1182-A",
                    merchant: "Amazon",
                    days_ago: 4,
                },
                BlueprintTransaction {
                    account: 1,
                    kind: TransactionKind::Income,
                    amount: "150.00",
                    category: Category::Other,
                    description: "Savings transfer",
                    merchant: "Internal transfer",
                    days_ago: 3,
                },
            ],
        },
        Blueprint {
            name: "family budget",
            accounts: vec![
                BlueprintAccount {
                    name: "Household Checking",
                    kind: AccountKind::Checking,
                    balance: "4310.75",
                    institution: "Sunrise Credit Union",
                },
                BlueprintAccount {
                    name: "Family Card",
                    kind: AccountKind::CreditCard,
                    balance: "-820.40",
                    institution: "Sunrise Credit Union",
                },
            ],
            transactions: vec![
                BlueprintTransaction {
                    account: 0,
                    kind: TransactionKind::Income,
                    amount: "4800.00",
                    category: Category::Other,
                    description: "Combined household income",
                    merchant: "Payroll",
                    days_ago: 15,
                },
                BlueprintTransaction {
                    account: 0,
                    kind: TransactionKind::Expense,
                    amount: "1890.00",
                    category: Category::Bills,
                    description: "Mortgage payment",
                    merchant: "Sunrise Credit Union",
                    days_ago: 14,
                },
                BlueprintTransaction {
                    account: 0,
                    kind: TransactionKind::Expense,
                    amount: "240.30",
                    category: Category::Food,
                    description: "Costco run",
                    merchant: "Costco Wholesale",
                    days_ago: 10,
                },
                BlueprintTransaction {
                    account: 1,
                    kind: TransactionKind::Expense,
                    amount: "95.00",
                    category: Category::Healthcare,
                    description: "Pediatrician copay",
                    merchant: "Lakeside Clinic",
                    days_ago: 7,
                },
                BlueprintTransaction {
                    account: 1,
                    kind: TransactionKind::Expense,
                    amount: "58.12",
                    category: Category::Education,
                    description: "School supplies",
                    merchant: "Campus Books",
                    days_ago: 5,
                },
                BlueprintTransaction {
                    account: 1,
                    kind: TransactionKind::Expense,
                    amount: "312.90",
                    category: Category::Travel,
                    description: "Weekend cabin",
                    merchant: "Airbnb",
                    days_ago: 2,
                },
            ],
        },
    ]
}

/// Fallback source backed by a small fixed pool of illustrative profiles.
pub struct SampleSource {
    pool: Vec<Blueprint>,
    rng_seed: Option<u64>,
    clock: Arc<dyn Clock>,
}

impl SampleSource {
    pub fn new() -> Self {
        Self {
            pool: builtin_pool(),
            rng_seed: None,
            clock: Arc::new(SystemClock),
        }
    }

    /// Replace the built-in pool. An empty pool makes every attempt fail
    /// with [`SourceError::Empty`], which the chain recovers from.
    pub fn with_pool(mut self, pool: Vec<Blueprint>) -> Self {
        self.pool = pool;
        self
    }

    pub fn empty() -> Self {
        Self::new().with_pool(Vec::new())
    }

    /// Pin the pool choice for deterministic tests.
    pub fn with_rng_seed(mut self, seed: u64) -> Self {
        self.rng_seed = Some(seed);
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    fn pick(&self) -> Option<&Blueprint> {
        if self.pool.is_empty() {
            return None;
        }
        let mut rng = match self.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let index = rng.gen_range(0..self.pool.len());
        self.pool.get(index)
    }
}

impl Default for SampleSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl SeedSource for SampleSource {
    fn name(&self) -> &str {
        "sample"
    }

    fn tag(&self) -> DataSource {
        DataSource::Sample
    }

    async fn attempt(&self, user_id: &Id, _info: &UserInfo) -> Result<Dataset, SourceError> {
        let blueprint = self.pick().ok_or(SourceError::Empty)?;
        let now = self.clock.now();

        let mut dataset = Dataset::new(DataSource::Sample);
        let mut account_ids = Vec::with_capacity(blueprint.accounts.len());

        for spec in &blueprint.accounts {
            let balance: Decimal = spec.balance.parse().unwrap_or_default();
            let account = Account::new(
                user_id.clone(),
                spec.name,
                spec.kind,
                balance,
                DataSource::Sample,
            )
            .with_institution(spec.institution);
            account_ids.push(account.id.clone());
            dataset.accounts.push(account);
        }

        for spec in &blueprint.transactions {
            let account_id = account_ids
                .get(spec.account)
                .cloned()
                .ok_or_else(|| SourceError::unavailable("blueprint references unknown account"))?;
            let amount: Decimal = spec.amount.parse().unwrap_or_default();

            dataset.transactions.push(
                Transaction::new(
                    account_id,
                    user_id.clone(),
                    spec.kind,
                    amount,
                    spec.description,
                    DataSource::Sample,
                )
                .with_category(spec.category)
                .with_merchant(spec.merchant)
                .with_date(now - chrono::Duration::days(spec.days_ago)),
            );
        }

        tracing::debug!(blueprint = blueprint.name, "Built sample dataset");
        Ok(dataset)
    }
}
