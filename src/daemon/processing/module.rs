use anyhow::Result;

use crate::daemon::storage::entities::LedgerSnapshot;

/// Represents a destination of ledger snapshots. This should realistically be able to abstract
/// over different options: local tables, remote server saving.
pub trait SnapshotExporter {
    /// Replaces whatever was exported before with `snapshot`.
    fn export(&mut self, snapshot: &LedgerSnapshot) -> impl std::future::Future<Output = Result<()>>;
}
