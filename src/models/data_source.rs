use serde::{Deserialize, Serialize};
use std::fmt;

/// Provenance tag: which source produced a record.
///
/// `Pending` only ever appears on a profile that has been created but not
/// yet seeded; accounts and transactions always carry a concrete source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataSource {
    Nessie,
    Sample,
    Mock,
    Pending,
}

impl DataSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataSource::Nessie => "nessie",
            DataSource::Sample => "sample",
            DataSource::Mock => "mock",
            DataSource::Pending => "pending",
        }
    }
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
