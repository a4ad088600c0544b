use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::clock::{Clock, SystemClock};

use super::{Category, DataSource, Id, IdGenerator, UuidIdGenerator};

/// Direction of a transaction. Amounts are stored as magnitudes; direction
/// lives here and is never inferred from a sign.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    Income,
    Expense,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Income => "income",
            TransactionKind::Expense => "expense",
        }
    }
}

/// A single financial transaction, owned by one account and (denormalized)
/// one user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: Id,
    pub account_id: Id,
    pub user_id: Id,
    /// Non-negative magnitude; see [`TransactionKind`] for direction.
    pub amount: Decimal,
    pub kind: TransactionKind,
    pub category: Category,
    pub description: String,
    #[serde(default)]
    pub merchant: String,
    pub date: DateTime<Utc>,
    pub source: DataSource,
    /// True for illustrative records fabricated when a real source had no
    /// transaction history. These share the source's provenance tag so the
    /// dashboard badge stays accurate, but remain distinguishable here.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub synthetic: bool,
}

impl Transaction {
    pub fn new(
        account_id: Id,
        user_id: Id,
        kind: TransactionKind,
        amount: Decimal,
        description: impl Into<String>,
        source: DataSource,
    ) -> Self {
        Self::new_with_generator(
            &UuidIdGenerator,
            &SystemClock,
            account_id,
            user_id,
            kind,
            amount,
            description,
            source,
        )
    }

    #[allow(clippy::too_many_arguments)]
    pub fn new_with_generator(
        ids: &dyn IdGenerator,
        clock: &dyn Clock,
        account_id: Id,
        user_id: Id,
        kind: TransactionKind,
        amount: Decimal,
        description: impl Into<String>,
        source: DataSource,
    ) -> Self {
        Self {
            id: ids.new_id(),
            account_id,
            user_id,
            // Magnitude only; callers passing a signed value get it normalized.
            amount: amount.abs(),
            kind,
            category: Category::Other,
            description: description.into(),
            merchant: String::new(),
            date: clock.now(),
            source,
            synthetic: false,
        }
    }

    pub fn with_id(mut self, id: Id) -> Self {
        self.id = id;
        self
    }

    pub fn with_category(mut self, category: Category) -> Self {
        self.category = category;
        self
    }

    pub fn with_merchant(mut self, merchant: impl Into<String>) -> Self {
        self.merchant = merchant.into();
        self
    }

    pub fn with_date(mut self, date: DateTime<Utc>) -> Self {
        self.date = date;
        self
    }

    pub fn synthetic(mut self) -> Self {
        self.synthetic = true;
        self
    }

    /// Signed value for display purposes: expenses are negative.
    pub fn signed_amount(&self) -> Decimal {
        match self.kind {
            TransactionKind::Income => self.amount,
            TransactionKind::Expense => -self.amount,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::models::FixedIdGenerator;
    use chrono::TimeZone;

    #[test]
    fn new_with_generator_is_deterministic() {
        let ids = FixedIdGenerator::new(["tx-1"]);
        let clock = FixedClock::new(Utc.with_ymd_and_hms(2026, 8, 1, 12, 0, 0).unwrap());

        let tx = Transaction::new_with_generator(
            &ids,
            &clock,
            Id::from_string("acct-1"),
            Id::from_string("u1"),
            TransactionKind::Expense,
            Decimal::new(1250, 2),
            "Coffee",
            DataSource::Mock,
        );

        assert_eq!(tx.id.as_str(), "tx-1");
        assert_eq!(tx.date, clock.now());
        assert_eq!(tx.category, Category::Other);
    }

    #[test]
    fn amounts_are_stored_as_magnitudes() {
        let tx = Transaction::new(
            Id::from_string("acct-1"),
            Id::from_string("u1"),
            TransactionKind::Expense,
            Decimal::new(-999, 2),
            "Refund gone wrong",
            DataSource::Mock,
        );
        assert_eq!(tx.amount, Decimal::new(999, 2));
        assert_eq!(tx.signed_amount(), Decimal::new(-999, 2));
    }

    #[test]
    fn synthetic_flag_is_skipped_when_false() {
        let tx = Transaction::new(
            Id::from_string("acct-1"),
            Id::from_string("u1"),
            TransactionKind::Income,
            Decimal::new(100, 0),
            "Paycheck",
            DataSource::Nessie,
        );
        let json = serde_json::to_value(&tx).unwrap();
        assert!(json.get("synthetic").is_none());

        let json = serde_json::to_value(tx.synthetic()).unwrap();
        assert_eq!(json.get("synthetic"), Some(&serde_json::Value::Bool(true)));
    }
}
