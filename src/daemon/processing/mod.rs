use std::time::Duration;

use anyhow::Result;
use module::SnapshotExporter;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::utils::clock::Clock;

use super::storage::ledger::LedgerReader;

pub mod local_save;
pub mod module;

/// Periodically hands ledger snapshots to an exporter. A failed export is only logged, the next
/// interval tries again with whatever the ledger holds then.
pub struct PersistenceModule<Exporter> {
    ledger: LedgerReader,
    exporter: Exporter,
    shutdown: CancellationToken,
    save_interval: Duration,
    time_provider: Box<dyn Clock>,
}

impl<E: SnapshotExporter> PersistenceModule<E> {
    pub fn new(
        ledger: LedgerReader,
        exporter: E,
        shutdown: CancellationToken,
        save_interval: Duration,
        time_provider: Box<dyn Clock>,
    ) -> Self {
        Self {
            ledger,
            exporter,
            shutdown,
            save_interval,
            time_provider,
        }
    }

    /// Saves on every interval until shutdown. The final save is left to the caller so it can
    /// happen after the sampler has stopped.
    pub async fn run(&mut self) {
        let mut save_point = self.time_provider.instant();
        loop {
            save_point += self.save_interval;

            let cancelled = tokio::select! {
                _ = self.shutdown.cancelled() => true,
                _ = self.time_provider.sleep_until(save_point) => false,
            };
            if cancelled {
                return;
            }

            debug!("Periodic save triggered");
            if let Err(e) = self.save().await {
                error!("Periodic save failed, retrying on next interval {e:?}")
            }
        }
    }

    pub async fn save(&mut self) -> Result<()> {
        let snapshot = self.ledger.snapshot()?;
        self.exporter.export(&snapshot).await?;
        info!("Saved {} window records", snapshot.len());
        Ok(())
    }
}
