use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::clock::{Clock, SystemClock};

use super::{DataSource, Id, IdGenerator, UuidIdGenerator};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountKind {
    Checking,
    Savings,
    CreditCard,
    Other,
}

impl AccountKind {
    /// Map a free-form provider account type onto the closed set.
    pub fn from_provider(raw: &str) -> Self {
        let value = raw.trim().to_lowercase();
        if value.contains("checking") {
            AccountKind::Checking
        } else if value.contains("saving") {
            AccountKind::Savings
        } else if value.contains("credit") {
            AccountKind::CreditCard
        } else {
            AccountKind::Other
        }
    }
}

/// A financial account belonging to exactly one user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: Id,
    pub user_id: Id,
    pub name: String,
    pub kind: AccountKind,
    pub balance: Decimal,
    pub active: bool,
    #[serde(default)]
    pub institution: String,
    pub source: DataSource,
    pub created_at: DateTime<Utc>,
}

impl Account {
    pub fn new(
        user_id: Id,
        name: impl Into<String>,
        kind: AccountKind,
        balance: Decimal,
        source: DataSource,
    ) -> Self {
        Self::new_with_generator(&UuidIdGenerator, &SystemClock, user_id, name, kind, balance, source)
    }

    pub fn new_with_generator(
        ids: &dyn IdGenerator,
        clock: &dyn Clock,
        user_id: Id,
        name: impl Into<String>,
        kind: AccountKind,
        balance: Decimal,
        source: DataSource,
    ) -> Self {
        Self {
            id: ids.new_id(),
            user_id,
            name: name.into(),
            kind,
            balance,
            active: true,
            institution: String::new(),
            source,
            created_at: clock.now(),
        }
    }

    pub fn with_id(mut self, id: Id) -> Self {
        self.id = id;
        self
    }

    pub fn with_institution(mut self, institution: impl Into<String>) -> Self {
        self.institution = institution.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_kind_mapping() {
        assert_eq!(AccountKind::from_provider("Checking"), AccountKind::Checking);
        assert_eq!(AccountKind::from_provider("savings"), AccountKind::Savings);
        assert_eq!(
            AccountKind::from_provider("Credit Card"),
            AccountKind::CreditCard
        );
        assert_eq!(AccountKind::from_provider("Brokerage"), AccountKind::Other);
    }
}
