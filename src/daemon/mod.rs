use std::{
    collections::HashSet,
    io::Stdout,
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use anyhow::Result;
use args::TrackArgs;
use collection::{
    collector::FocusSampler,
    resolver::{IdentityMode, WindowIdentityResolver, HISTORY_TITLE, TRACKER_TITLE},
};
use presentation::{LiveView, SnapshotView, TerminalView, ViewMode};
use processing::{
    local_save::{ExportFormat, TableExporter},
    module::SnapshotExporter,
    PersistenceModule,
};
use storage::{
    entities::{LedgerSnapshot, WindowIdentity},
    ledger::{ActivityLedger, LedgerReader},
};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::{
    utils::clock::{Clock, DefaultClock},
    window_api::{GenericWindowManager, WindowManager},
};

pub mod args;
pub mod collection;
pub mod presentation;
pub mod processing;
pub mod shutdown;
pub mod storage;

const DEFAULT_SAMPLING_INTERVAL: Duration = Duration::from_secs(1);
const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(1);
const DEFAULT_SAVE_INTERVAL: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct TrackerConfig {
    pub sampling_interval: Duration,
    pub refresh_interval: Duration,
    pub save_interval: Duration,
    pub excluded: HashSet<WindowIdentity>,
    pub identity_mode: IdentityMode,
    pub export_dir: PathBuf,
    pub format: ExportFormat,
    /// `None` runs headless.
    pub view: Option<ViewMode>,
}

impl TrackerConfig {
    pub fn new(app_dir: &Path) -> Self {
        Self {
            sampling_interval: DEFAULT_SAMPLING_INTERVAL,
            refresh_interval: DEFAULT_REFRESH_INTERVAL,
            save_interval: DEFAULT_SAVE_INTERVAL,
            excluded: HashSet::from([Arc::from(TRACKER_TITLE), Arc::from(HISTORY_TITLE)]),
            identity_mode: IdentityMode::default(),
            export_dir: app_dir.join("data"),
            format: ExportFormat::default(),
            view: None,
        }
    }

    pub fn from_args(args: &TrackArgs, app_dir: &Path) -> Self {
        Self {
            sampling_interval: Duration::from_millis(args.sample_interval_ms),
            refresh_interval: Duration::from_millis(args.refresh_interval_ms),
            save_interval: Duration::from_secs(args.save_interval_secs),
            excluded: args.exclude.iter().map(|v| Arc::from(v.as_str())).collect(),
            identity_mode: args.identity,
            format: args.format,
            ..Self::new(app_dir)
        }
    }
}

/// Owns the ledger and every task working with it. The sampler is the only writer, persistence
/// and the live view get read-only handles.
pub struct Tracker<E, V> {
    ledger: ActivityLedger,
    sampler: FocusSampler,
    persistence: PersistenceModule<E>,
    live_view: Option<LiveView<V>>,
    shutdown: CancellationToken,
}

impl<E: SnapshotExporter, V: SnapshotView> Tracker<E, V> {
    pub fn new(
        manager: Box<dyn WindowManager>,
        exporter: E,
        view: Option<V>,
        config: &TrackerConfig,
        clock: impl Clock + Clone,
    ) -> Self {
        let ledger = ActivityLedger::new();
        let shutdown = CancellationToken::new();

        let resolver =
            WindowIdentityResolver::new(manager, config.excluded.clone(), config.identity_mode);
        let sampler = FocusSampler::new(
            resolver,
            ledger.clone(),
            shutdown.clone(),
            config.sampling_interval,
            Box::new(clock.clone()),
        );
        let persistence = PersistenceModule::new(
            ledger.reader(),
            exporter,
            shutdown.clone(),
            config.save_interval,
            Box::new(clock.clone()),
        );
        let live_view = view.map(|view| {
            LiveView::new(
                ledger.reader(),
                view,
                shutdown.clone(),
                config.refresh_interval,
                Box::new(clock),
            )
        });

        Self {
            ledger,
            sampler,
            persistence,
            live_view,
            shutdown,
        }
    }

    /// Cancelling this token stops the tracker.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    pub fn ledger(&self) -> LedgerReader {
        self.ledger.reader()
    }

    /// Runs until the shutdown token is cancelled. Shutdown waits for the sampler to credit its
    /// last interval, saves once more and only then releases the view. Returns the final state.
    pub async fn run(self) -> Result<LedgerSnapshot> {
        let Self {
            ledger,
            sampler,
            mut persistence,
            live_view,
            shutdown: _,
        } = self;

        let sampler_task = tokio::spawn(sampler.run());

        let (_, view) = tokio::join!(persistence.run(), async move {
            match live_view {
                Some(live_view) => Some(live_view.run().await),
                None => None,
            }
        });

        match sampler_task.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => error!("Focus sampler finished with an error {e:?}"),
            Err(e) => error!("Focus sampler task failed {e:?}"),
        }

        if let Err(e) = persistence.save().await {
            error!("Final save failed {e:?}");
        }

        let snapshot = ledger.snapshot()?;
        drop(view);
        info!("Tracker stopped with {} window records", snapshot.len());
        Ok(snapshot)
    }
}

/// Represents the starting point for tracking on the current machine. Stops on interrupt or
/// terminate signals.
pub async fn start_tracker(config: TrackerConfig) -> Result<LedgerSnapshot> {
    let manager = GenericWindowManager::new()?;
    let exporter = TableExporter::new(config.export_dir.clone(), config.format)?;
    info!("Exporting into {:?}", config.export_dir);
    let view = config.view.map(TerminalView::stdout);

    let tracker: Tracker<TableExporter, TerminalView<Stdout>> =
        Tracker::new(Box::new(manager), exporter, view, &config, DefaultClock);
    tokio::spawn(shutdown::detect_shutdown(tracker.shutdown_token()));

    tracker.run().await
}
