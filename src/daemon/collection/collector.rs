use std::time::Duration;

use anyhow::Result;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::{
    daemon::storage::ledger::ActivityLedger,
    utils::clock::Clock,
};

use super::{resolver::WindowIdentityResolver, session::FocusSession};

/// The only writer of the [ActivityLedger]. Samples the foreground window on a fixed cadence and
/// attributes elapsed time through its own [FocusSession].
pub struct FocusSampler {
    resolver: WindowIdentityResolver,
    ledger: ActivityLedger,
    session: FocusSession,
    shutdown: CancellationToken,
    sampling_interval: Duration,
    time_provider: Box<dyn Clock>,
}

impl FocusSampler {
    pub fn new(
        resolver: WindowIdentityResolver,
        ledger: ActivityLedger,
        shutdown: CancellationToken,
        sampling_interval: Duration,
        time_provider: Box<dyn Clock>,
    ) -> Self {
        let session = FocusSession::new(time_provider.time());
        Self {
            resolver,
            ledger,
            session,
            shutdown,
            sampling_interval,
            time_provider,
        }
    }

    fn sample(&mut self) -> Result<()> {
        let observed = self.resolver.resolve();
        let now = self.time_provider.time();
        debug!("Sampled {observed:?}");
        self.session.advance(observed, now, &self.ledger)
    }

    /// Executes the sampler event loop. Returns once the shutdown token is cancelled, after
    /// crediting the interval that was still open.
    pub async fn run(mut self) -> Result<()> {
        let mut sampling_point = self.time_provider.instant();
        loop {
            sampling_point += self.sampling_interval;

            if let Err(e) = self.sample() {
                error!("Encountered an error during sampling {:?}", e)
            }

            tokio::select! {
                _ = self.shutdown.cancelled() => break,
                _ = self.time_provider.sleep_until(sampling_point) => ()
            }
        }

        let now = self.time_provider.time();
        self.session
            .close(now, &self.ledger)
            .inspect_err(|e| error!("Failed to close focus session {e:?}"))?;
        info!("Focus sampler stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::{
        collections::HashSet,
        sync::{
            atomic::{AtomicUsize, Ordering},
            Arc,
        },
        time::Duration,
    };

    use anyhow::{anyhow, Result};
    use chrono::{TimeZone, Utc};
    use tokio_util::sync::CancellationToken;

    use super::FocusSampler;
    use crate::{
        daemon::{
            collection::resolver::{IdentityMode, WindowIdentityResolver, TRACKER_TITLE, UNKNOWN_WINDOW},
            storage::{entities::LedgerSnapshot, ledger::ActivityLedger},
        },
        utils::{clock::TestClock, logging::TEST_LOGGING},
        window_api::{MockWindowManager, WindowHandle},
    };

    /// Mock whose n-th title query returns `trace[n]`, the last entry repeats. `None` makes the
    /// foreground query fail.
    fn scripted_manager(trace: Vec<Option<&'static str>>, calls: Arc<AtomicUsize>) -> MockWindowManager {
        let mut manager = MockWindowManager::new();
        let counter = calls.clone();
        let failing = trace.clone();
        manager.expect_foreground_window().returning(move || {
            let n = counter.load(Ordering::SeqCst);
            match failing[n.min(failing.len() - 1)] {
                Some(_) => Ok(WindowHandle(1)),
                None => {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err(anyhow!("foreground query failed"))
                }
            }
        });
        manager.expect_window_title().returning(move |_| {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            Ok(trace[n.min(trace.len() - 1)].unwrap_or_default().to_string())
        });
        manager.expect_owner_process_id().returning(|_| Ok(100));
        manager
            .expect_process_name()
            .returning(|_| Ok("process".to_string()));
        manager
    }

    async fn run_for(manager: MockWindowManager, duration: Duration) -> Result<LedgerSnapshot> {
        *TEST_LOGGING;
        let clock = TestClock::new(Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap());
        let ledger = ActivityLedger::new();
        let shutdown = CancellationToken::new();
        let resolver = WindowIdentityResolver::new(
            Box::new(manager),
            HashSet::from([Arc::from(TRACKER_TITLE)]),
            IdentityMode::Title,
        );
        let sampler = FocusSampler::new(
            resolver,
            ledger.clone(),
            shutdown.clone(),
            Duration::from_secs(1),
            Box::new(clock),
        );

        let (result, _) = tokio::join!(sampler.run(), async {
            tokio::time::sleep(duration).await;
            shutdown.cancel();
        });
        result?;
        ledger.snapshot()
    }

    fn assert_seconds(snapshot: &LedgerSnapshot, identity: &str, expected: f64) {
        let actual = snapshot.duration_of(identity).num_milliseconds() as f64 / 1000.;
        assert!(
            (actual - expected).abs() < 0.05,
            "{identity}: expected {expected}s, got {actual}s"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn single_window_gets_all_time() -> Result<()> {
        let calls = Arc::new(AtomicUsize::new(0));
        let snapshot = run_for(
            scripted_manager(vec![Some("Notepad")], calls),
            Duration::from_millis(7_300),
        )
        .await?;

        assert_eq!(snapshot.len(), 1);
        assert_seconds(&snapshot, "Notepad", 7.3);
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn transitions_follow_the_trace() -> Result<()> {
        let calls = Arc::new(AtomicUsize::new(0));
        let trace = vec![Some("A"), Some("A"), Some("B"), Some("B"), Some("A")];
        let snapshot = run_for(scripted_manager(trace, calls), Duration::from_millis(6_500)).await?;

        assert_seconds(&snapshot, "B", 2.);
        assert_seconds(&snapshot, "A", 4.5);
        assert!(snapshot.duration_of("A") >= snapshot.duration_of("B"));
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn own_window_time_is_not_tracked() -> Result<()> {
        let calls = Arc::new(AtomicUsize::new(0));
        let trace = vec![
            Some("A"),
            Some(TRACKER_TITLE),
            Some(TRACKER_TITLE),
            Some(TRACKER_TITLE),
            Some("A"),
        ];
        let snapshot = run_for(scripted_manager(trace, calls), Duration::from_millis(5_500)).await?;

        assert_eq!(snapshot.len(), 1);
        assert!(snapshot.get(TRACKER_TITLE).is_none());
        assert_seconds(&snapshot, "A", 2.5);
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn failed_sample_does_not_stop_the_loop() -> Result<()> {
        let calls = Arc::new(AtomicUsize::new(0));
        let trace = vec![Some("A"), Some("A"), None, Some("A")];
        let snapshot = run_for(
            scripted_manager(trace, calls.clone()),
            Duration::from_millis(6_500),
        )
        .await?;

        assert_eq!(calls.load(Ordering::SeqCst), 7);
        assert_seconds(&snapshot, UNKNOWN_WINDOW, 1.);
        assert_seconds(&snapshot, "A", 5.5);
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn stops_within_one_interval() -> Result<()> {
        let calls = Arc::new(AtomicUsize::new(0));
        let started = tokio::time::Instant::now();
        run_for(
            scripted_manager(vec![Some("A")], calls.clone()),
            Duration::from_millis(2_100),
        )
        .await?;

        assert!(started.elapsed() < Duration::from_millis(2_100) + Duration::from_secs(1));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        Ok(())
    }
}
