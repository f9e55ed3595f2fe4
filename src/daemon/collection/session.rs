use anyhow::Result;
use chrono::{DateTime, Utc};
use tracing::info;

use crate::daemon::storage::{entities::WindowIdentity, ledger::ActivityLedger};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FocusState {
    Idle,
    Tracking(WindowIdentity),
}

impl FocusState {
    pub fn identity(&self) -> Option<&WindowIdentity> {
        match self {
            FocusState::Idle => None,
            FocusState::Tracking(identity) => Some(identity),
        }
    }
}

/// What a sampler currently believes is focused and since when time hasn't been attributed.
///
/// Each sample closes the interval opened by the previous one and credits it to the identity that
/// was focused during it, so totals advance on every tick and a transition is attributed within
/// one sampling interval.
#[derive(Debug)]
pub struct FocusSession {
    state: FocusState,
    last_touch: DateTime<Utc>,
}

impl FocusSession {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            state: FocusState::Idle,
            last_touch: now,
        }
    }

    pub fn state(&self) -> &FocusState {
        &self.state
    }

    /// Applies a sample taken at `now`.
    pub fn advance(
        &mut self,
        observed: Option<WindowIdentity>,
        now: DateTime<Utc>,
        ledger: &ActivityLedger,
    ) -> Result<()> {
        self.accrue_open_interval(now, ledger)?;

        match observed {
            Some(identity) if self.state.identity() == Some(&identity) => {}
            Some(identity) => {
                ledger.touch_first_seen(&identity, now)?;
                info!(from = ?self.state.identity(), to = ?identity, "Focus changed");
                self.state = FocusState::Tracking(identity);
            }
            None => {
                if let FocusState::Tracking(previous) = &self.state {
                    info!(from = ?previous, "No trackable window in focus");
                }
                self.state = FocusState::Idle;
            }
        }
        Ok(())
    }

    /// Credits the interval still open at `now` and stops tracking. Used on shutdown.
    pub fn close(&mut self, now: DateTime<Utc>, ledger: &ActivityLedger) -> Result<()> {
        self.accrue_open_interval(now, ledger)?;
        self.state = FocusState::Idle;
        Ok(())
    }

    fn accrue_open_interval(&mut self, now: DateTime<Utc>, ledger: &ActivityLedger) -> Result<()> {
        if let FocusState::Tracking(current) = &self.state {
            ledger.accumulate(current, now - self.last_touch, now)?;
        }
        self.last_touch = now;
        Ok(())
    }
}
