use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

/// Label grouping focused time. Currently the window title, optionally combined with the process
/// name (see [IdentityMode](crate::daemon::collection::resolver::IdentityMode)).
pub type WindowIdentity = Arc<str>;

/// Aggregated focus time of a single window identity.
#[derive(PartialEq, Eq, Debug, Serialize, Clone)]
pub struct ActivityRecord {
    pub identity: WindowIdentity,
    #[serde(with = "duration_ser")]
    pub cumulative: Duration,
    pub first_seen: DateTime<Utc>,
}

impl ActivityRecord {
    pub fn new(identity: WindowIdentity, first_seen: DateTime<Utc>) -> Self {
        Self {
            identity,
            cumulative: Duration::zero(),
            first_seen,
        }
    }
}

/// Point in time copy of the ledger. Records are ordered by first observation.
#[derive(PartialEq, Eq, Debug, Clone, Default)]
pub struct LedgerSnapshot {
    pub records: Vec<ActivityRecord>,
}

impl LedgerSnapshot {
    pub fn get(&self, identity: &str) -> Option<&ActivityRecord> {
        self.records.iter().find(|v| &*v.identity == identity)
    }

    /// Cumulative duration of an identity, zero when it was never observed.
    pub fn duration_of(&self, identity: &str) -> Duration {
        self.get(identity)
            .map(|v| v.cumulative)
            .unwrap_or_else(Duration::zero)
    }

    pub fn total(&self) -> Duration {
        self.records
            .iter()
            .fold(Duration::zero(), |acc, v| acc + v.cumulative)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

mod duration_ser {
    use chrono::Duration;
    use serde::Serializer;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_i64(duration.num_seconds())
    }
}
