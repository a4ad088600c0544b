//! Terminal fallback: a fully procedural dataset. Cannot fail, so the chain
//! always ends with renderable data.

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::Decimal;

use crate::clock::{Clock, SystemClock};
use crate::models::{
    Account, AccountKind, Category, DataSource, Id, Transaction, TransactionKind, UserInfo,
};

use super::{Dataset, SeedSource, SourceError};

/// Generated history covers the trailing 30 days.
const HISTORY_DAYS: i64 = 30;

fn amount_range_cents(category: Category) -> (i64, i64) {
    match category {
        Category::Food => (800, 12000),
        Category::Transport => (500, 6000),
        Category::Entertainment => (900, 8000),
        Category::Shopping => (1500, 20000),
        Category::Bills => (4000, 25000),
        Category::Healthcare => (1500, 15000),
        Category::Education => (2000, 18000),
        Category::Travel => (5000, 40000),
        Category::Other => (500, 10000),
    }
}

fn merchant_for(category: Category) -> &'static str {
    match category {
        Category::Food => "Corner Grocer",
        Category::Transport => "City Transit",
        Category::Entertainment => "Pixel Cinema",
        Category::Shopping => "General Store",
        Category::Bills => "Utility Co-op",
        Category::Healthcare => "Main St Pharmacy",
        Category::Education => "Night School",
        Category::Travel => "Budget Travel",
        Category::Other => "Misc",
    }
}

/// Procedural mock data generator.
pub struct MockSource {
    rng_seed: Option<u64>,
    clock: Arc<dyn Clock>,
}

impl MockSource {
    pub fn new() -> Self {
        Self {
            rng_seed: None,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_rng_seed(mut self, seed: u64) -> Self {
        self.rng_seed = Some(seed);
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }
}

impl Default for MockSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl SeedSource for MockSource {
    fn name(&self) -> &str {
        "mock"
    }

    fn tag(&self) -> DataSource {
        DataSource::Mock
    }

    async fn attempt(&self, user_id: &Id, _info: &UserInfo) -> Result<Dataset, SourceError> {
        let mut rng = match self.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let now = self.clock.now();

        let mut dataset = Dataset::new(DataSource::Mock);

        let checking = Account::new(
            user_id.clone(),
            "Mock Checking",
            AccountKind::Checking,
            Decimal::new(rng.gen_range(150_000..600_000), 2),
            DataSource::Mock,
        )
        .with_institution("RetroVault Demo Bank");
        let savings = Account::new(
            user_id.clone(),
            "Mock Savings",
            AccountKind::Savings,
            Decimal::new(rng.gen_range(300_000..1_200_000), 2),
            DataSource::Mock,
        )
        .with_institution("RetroVault Demo Bank");

        // Two paychecks over the trailing month.
        for days_ago in [3, 17] {
            dataset.transactions.push(
                Transaction::new(
                    checking.id.clone(),
                    user_id.clone(),
                    TransactionKind::Income,
                    Decimal::new(rng.gen_range(200_000..350_000), 2),
                    "Paycheck",
                    DataSource::Mock,
                )
                .with_merchant("Demo Payroll")
                .with_date(now - chrono::Duration::days(days_ago)),
            );
        }

        let expense_count = rng.gen_range(18..=30);
        for _ in 0..expense_count {
            let category = Category::ALL[rng.gen_range(0..Category::ALL.len())];
            let (min, max) = amount_range_cents(category);
            let days_ago = rng.gen_range(0..HISTORY_DAYS);

            dataset.transactions.push(
                Transaction::new(
                    checking.id.clone(),
                    user_id.clone(),
                    TransactionKind::Expense,
                    Decimal::new(rng.gen_range(min..=max), 2),
                    format!("{} purchase", merchant_for(category)),
                    DataSource::Mock,
                )
                .with_category(category)
                .with_merchant(merchant_for(category))
                .with_date(now - chrono::Duration::days(days_ago)),
            );
        }

        dataset.accounts.push(checking);
        dataset.accounts.push(savings);
        Ok(dataset)
    }
}
