//! Capital One Nessie sandbox adapter.
//!
//! Maps the sandbox's customers/accounts/purchases/deposits endpoints onto
//! the canonical account and transaction records. Purchases become expenses,
//! deposits become income; amounts are magnitudes throughout.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use reqwest::Client;
use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use crate::clock::{Clock, SystemClock};
use crate::models::{
    Account, AccountKind, CategoryRules, DataSource, Id, Transaction, TransactionKind, UserInfo,
};

use super::{Dataset, SeedSource, SourceError};

const NESSIE_BASE: &str = "http://api.nessieisreal.com";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Illustrative records fabricated when a sandbox account has no history.
/// The sandbox frequently has accounts but zero transactions; these keep the
/// dashboard from rendering empty. They carry the remote provenance tag plus
/// a `synthetic` marker.
const FABRICATED: [(TransactionKind, &str, &str, &str); 5] = [
    (TransactionKind::Income, "2500.00", "Direct deposit - payroll", "Employer"),
    (TransactionKind::Expense, "82.45", "Grocery run", "Whole Foods Market"),
    (TransactionKind::Expense, "24.99", "Streaming subscription", "Netflix"),
    (TransactionKind::Expense, "41.20", "Fuel", "Shell Gas Station"),
    (TransactionKind::Expense, "120.00", "Electric utility bill", "City Power & Light"),
];

/// Remote data source over the Nessie sandbox HTTP API.
pub struct NessieSource {
    api_key: Option<SecretString>,
    customer_id: Option<String>,
    base_url: String,
    timeout: Duration,
    client: Client,
    rules: CategoryRules,
    clock: Arc<dyn Clock>,
}

impl NessieSource {
    /// `api_key = None` means unconfigured: every attempt fails fast with
    /// [`SourceError::Unconfigured`] so the chain advances immediately.
    pub fn new(api_key: Option<SecretString>) -> Self {
        Self {
            api_key,
            customer_id: None,
            base_url: NESSIE_BASE.to_string(),
            timeout: DEFAULT_TIMEOUT,
            client: Client::new(),
            rules: CategoryRules::default(),
            clock: Arc::new(SystemClock),
        }
    }

    /// Override API base URL (useful for tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Pin the sandbox customer to fetch instead of taking the first one.
    pub fn with_customer_id(mut self, customer_id: impl Into<String>) -> Self {
        self.customer_id = Some(customer_id.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_rules(mut self, rules: CategoryRules) -> Self {
        self.rules = rules;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    async fn get<T: for<'de> Deserialize<'de>>(
        &self,
        key: &str,
        path: &str,
    ) -> Result<T, SourceError> {
        let url = format!("{}{}", self.base_url.trim_end_matches('/'), path);

        let response = self
            .client
            .get(&url)
            .query(&[("key", key)])
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| SourceError::unavailable(format!("Nessie HTTP request failed: {e}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| SourceError::unavailable(format!("Failed to read Nessie response: {e}")))?;

        if !status.is_success() {
            return Err(SourceError::http_status(
                status.as_u16(),
                format!("Nessie API request failed ({status}): {body}"),
            ));
        }

        serde_json::from_str(&body)
            .map_err(|e| SourceError::unavailable(format!("Failed to parse Nessie JSON: {e}")))
    }

    /// Like `get`, but a 404 means "no records", which the sandbox uses for
    /// accounts with no transaction history.
    async fn get_or_empty<T: for<'de> Deserialize<'de>>(
        &self,
        key: &str,
        path: &str,
    ) -> Result<Vec<T>, SourceError> {
        match self.get::<Vec<T>>(key, path).await {
            Ok(items) => Ok(items),
            Err(SourceError::Unavailable {
                status: Some(404), ..
            }) => Ok(Vec::new()),
            Err(err) => Err(err),
        }
    }

    async fn resolve_customer(&self, key: &str) -> Result<String, SourceError> {
        if let Some(id) = &self.customer_id {
            return Ok(id.clone());
        }

        // Demo behavior: without a pinned customer, use the first one the
        // sandbox knows about.
        let customers: Vec<NessieCustomer> = self.get(key, "/customers").await?;
        customers
            .into_iter()
            .next()
            .map(|c| c.id)
            .ok_or(SourceError::Empty)
    }

    fn parse_date(&self, raw: Option<&str>) -> DateTime<Utc> {
        raw.and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok())
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|dt| dt.and_utc())
            .unwrap_or_else(|| self.clock.now())
    }

    fn map_transaction(
        &self,
        user_id: &Id,
        account_id: &Id,
        external_id: &str,
        kind: TransactionKind,
        amount: Decimal,
        date: Option<&str>,
        description: Option<String>,
    ) -> Transaction {
        let description = description.unwrap_or_else(|| match kind {
            TransactionKind::Income => "Deposit".to_string(),
            TransactionKind::Expense => "Purchase".to_string(),
        });
        let category = self.rules.classify(&description);

        Transaction::new(
            account_id.clone(),
            user_id.clone(),
            kind,
            amount,
            description,
            DataSource::Nessie,
        )
        .with_id(Id::from_external(external_id))
        .with_category(category)
        .with_date(self.parse_date(date))
    }

    fn fabricate_transactions(&self, user_id: &Id, account_id: &Id) -> Vec<Transaction> {
        let now = self.clock.now();
        FABRICATED
            .iter()
            .enumerate()
            .map(|(i, (kind, amount, description, merchant))| {
                let amount: Decimal = amount.parse().unwrap_or_default();
                let category = self.rules.classify(&format!("{description} {merchant}"));
                Transaction::new(
                    account_id.clone(),
                    user_id.clone(),
                    *kind,
                    amount,
                    *description,
                    DataSource::Nessie,
                )
                .with_category(category)
                .with_merchant(*merchant)
                .with_date(now - chrono::Duration::days((i as i64) + 1))
                .synthetic()
            })
            .collect()
    }
}

#[async_trait::async_trait]
impl SeedSource for NessieSource {
    fn name(&self) -> &str {
        "nessie"
    }

    fn tag(&self) -> DataSource {
        DataSource::Nessie
    }

    async fn attempt(&self, user_id: &Id, _info: &UserInfo) -> Result<Dataset, SourceError> {
        let key = self
            .api_key
            .as_ref()
            .ok_or(SourceError::Unconfigured)?
            .expose_secret()
            .to_string();

        let customer_id = self.resolve_customer(&key).await?;
        let nessie_accounts: Vec<NessieAccount> = self
            .get(&key, &format!("/customers/{customer_id}/accounts"))
            .await?;

        if nessie_accounts.is_empty() {
            return Err(SourceError::Empty);
        }

        let mut dataset = Dataset::new(DataSource::Nessie);

        for nessie_account in &nessie_accounts {
            let account_id = Id::from_external(&nessie_account.id);
            let name = nessie_account
                .nickname
                .clone()
                .filter(|n| !n.trim().is_empty())
                .unwrap_or_else(|| format!("{} Account", nessie_account.account_type));

            let account = Account::new(
                user_id.clone(),
                name,
                AccountKind::from_provider(&nessie_account.account_type),
                nessie_account.balance,
                DataSource::Nessie,
            )
            .with_id(account_id.clone())
            .with_institution("Capital One");
            dataset.accounts.push(account);

            let purchases: Vec<NessiePurchase> = self
                .get_or_empty(&key, &format!("/accounts/{}/purchases", nessie_account.id))
                .await?;
            for purchase in purchases {
                dataset.transactions.push(self.map_transaction(
                    user_id,
                    &account_id,
                    &purchase.id,
                    TransactionKind::Expense,
                    purchase.amount,
                    purchase.purchase_date.as_deref(),
                    purchase.description,
                ));
            }

            let deposits: Vec<NessieDeposit> = self
                .get_or_empty(&key, &format!("/accounts/{}/deposits", nessie_account.id))
                .await?;
            for deposit in deposits {
                dataset.transactions.push(self.map_transaction(
                    user_id,
                    &account_id,
                    &deposit.id,
                    TransactionKind::Income,
                    deposit.amount,
                    deposit.transaction_date.as_deref(),
                    deposit.description,
                ));
            }
        }

        if dataset.transactions.is_empty() {
            // Sandbox accounts routinely have no history; fabricate a small
            // illustrative set against the first account.
            let first_account = dataset.accounts[0].id.clone();
            tracing::info!(
                user_id = %user_id,
                "Nessie returned accounts with no transactions; fabricating illustrative set"
            );
            dataset.transactions = self.fabricate_transactions(user_id, &first_account);
        }

        Ok(dataset)
    }
}

#[derive(Debug, Deserialize)]
struct NessieCustomer {
    #[serde(rename = "_id")]
    id: String,
}

#[derive(Debug, Deserialize)]
struct NessieAccount {
    #[serde(rename = "_id")]
    id: String,
    #[serde(rename = "type")]
    account_type: String,
    #[serde(default)]
    nickname: Option<String>,
    #[serde(default)]
    balance: Decimal,
}

#[derive(Debug, Deserialize)]
struct NessiePurchase {
    #[serde(rename = "_id")]
    id: String,
    amount: Decimal,
    #[serde(default)]
    purchase_date: Option<String>,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NessieDeposit {
    #[serde(rename = "_id")]
    id: String,
    amount: Decimal,
    #[serde(default)]
    transaction_date: Option<String>,
    #[serde(default)]
    description: Option<String>,
}
