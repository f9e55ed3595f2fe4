use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard},
};

use anyhow::{anyhow, Result};
use chrono::{DateTime, Duration, Utc};
use tracing::{debug, warn};

use super::entities::{ActivityRecord, LedgerSnapshot, WindowIdentity};

#[derive(Default)]
struct LedgerState {
    index: HashMap<WindowIdentity, usize>,
    records: Vec<ActivityRecord>,
}

impl LedgerState {
    fn record_mut(&mut self, identity: &WindowIdentity, first_seen: DateTime<Utc>) -> &mut ActivityRecord {
        let position = match self.index.get(identity).copied() {
            Some(position) => position,
            None => {
                debug!("First observation of {identity:?}");
                self.records
                    .push(ActivityRecord::new(identity.clone(), first_seen));
                self.index.insert(identity.clone(), self.records.len() - 1);
                self.records.len() - 1
            }
        };
        &mut self.records[position]
    }
}

/// Shared container of per-window focus time. Cloning produces another handle to the same state.
///
/// Every operation takes the lock for its own duration only, so handles can be used from several
/// tasks without losing updates. The lock is never held across an await point.
#[derive(Clone, Default)]
pub struct ActivityLedger {
    state: Arc<Mutex<LedgerState>>,
}

impl ActivityLedger {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, LedgerState>> {
        self.state
            .lock()
            .map_err(|_| anyhow!("Activity ledger lock was poisoned"))
    }

    /// Adds `elapsed` to the identity. Negative intervals (the wall clock was moved backwards)
    /// are clamped to zero. An unknown identity gets a record whose first observation is
    /// estimated as `now - elapsed`.
    pub fn accumulate(
        &self,
        identity: &WindowIdentity,
        elapsed: Duration,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let elapsed = if elapsed < Duration::zero() {
            warn!("Clamping negative interval {elapsed} for {identity:?}");
            Duration::zero()
        } else {
            elapsed
        };

        let mut state = self.lock()?;
        let record = state.record_mut(identity, now - elapsed);
        record.cumulative += elapsed;
        Ok(())
    }

    /// Creates the record with `timestamp` as its first observation. Existing records are left
    /// untouched.
    pub fn touch_first_seen(&self, identity: &WindowIdentity, timestamp: DateTime<Utc>) -> Result<()> {
        let mut state = self.lock()?;
        state.record_mut(identity, timestamp);
        Ok(())
    }

    pub fn snapshot(&self) -> Result<LedgerSnapshot> {
        let state = self.lock()?;
        Ok(LedgerSnapshot {
            records: state.records.clone(),
        })
    }

    /// Handle for consumers that must not modify the ledger.
    pub fn reader(&self) -> LedgerReader {
        LedgerReader {
            ledger: self.clone(),
        }
    }
}

/// Read-only view of an [ActivityLedger].
#[derive(Clone)]
pub struct LedgerReader {
    ledger: ActivityLedger,
}

impl LedgerReader {
    pub fn snapshot(&self) -> Result<LedgerSnapshot> {
        self.ledger.snapshot()
    }
}
