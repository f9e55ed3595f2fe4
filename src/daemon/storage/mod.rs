//!  In-memory state of the tracker lives in [ledger::ActivityLedger].
//!  The basic idea is:
//!   - There is one [entities::ActivityRecord] per window identity ever observed.
//!   - Records only grow. Nothing is removed while the process runs.
//!   - Readers get [entities::LedgerSnapshot] copies, never the live records.

pub mod entities;
pub mod ledger;
