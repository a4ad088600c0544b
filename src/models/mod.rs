mod account;
mod category;
mod data_source;
mod id;
mod profile;
mod transaction;

pub use account::{Account, AccountKind};
pub use category::{Category, CategoryRules};
pub use data_source::DataSource;
pub use id::{FixedIdGenerator, Id, IdError, IdGenerator, UuidIdGenerator};
pub use profile::{FinancialSummary, SyncState, UserInfo, UserProfile, DEFAULT_DISPLAY_NAME};
pub use transaction::{Transaction, TransactionKind};
