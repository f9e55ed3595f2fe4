//! Live terminal view of the ledger. The view only ever receives a [LedgerReader], all time
//! attribution happens in the sampler.

use std::{
    io::{self, Stdout, Write},
    time::Duration,
};

use ansi_term::{Colour, Style};
use anyhow::Result;
use chrono::Local;
use tokio_util::sync::CancellationToken;
use tracing::error;

use crate::utils::clock::Clock;

use super::{
    collection::resolver::{HISTORY_TITLE, TRACKER_TITLE},
    processing::local_save::{history_rows, totals_rows},
    storage::{entities::LedgerSnapshot, ledger::LedgerReader},
};

const MAX_WINDOW_COLUMN: usize = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewMode {
    Totals,
    History,
}

/// Consumer of ledger snapshots.
pub trait SnapshotView {
    fn render(&mut self, snapshot: &LedgerSnapshot) -> Result<()>;
}

/// Redraws the whole table on every render. The terminal title is set to one of the excluded
/// tracker titles so that looking at the view isn't counted as activity.
pub struct TerminalView<W> {
    out: W,
    mode: ViewMode,
}

impl TerminalView<Stdout> {
    pub fn stdout(mode: ViewMode) -> Self {
        Self::new(io::stdout(), mode)
    }
}

impl<W: Write> TerminalView<W> {
    pub fn new(out: W, mode: ViewMode) -> Self {
        Self { out, mode }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn title(&self) -> &'static str {
        match self.mode {
            ViewMode::Totals => TRACKER_TITLE,
            ViewMode::History => HISTORY_TITLE,
        }
    }

    fn table(&self, snapshot: &LedgerSnapshot) -> (Vec<&'static str>, Vec<Vec<String>>) {
        match self.mode {
            ViewMode::Totals => (
                vec!["Window Name", "Time Spent"],
                totals_rows(snapshot)
                    .into_iter()
                    .map(|v| vec![v.window.to_string(), v.time_spent])
                    .collect(),
            ),
            ViewMode::History => (
                vec!["Window Name", "Start Time", "Time Spent"],
                history_rows(snapshot, &Local)
                    .into_iter()
                    .map(|v| vec![v.window.to_string(), v.start_time, v.time_spent])
                    .collect(),
            ),
        }
    }
}

fn fit(value: &str, width: usize) -> String {
    if value.chars().count() <= width {
        format!("{value:<width$}")
    } else {
        let mut shortened = value.chars().take(width - 1).collect::<String>();
        shortened.push('…');
        shortened
    }
}

impl<W: Write> SnapshotView for TerminalView<W> {
    fn render(&mut self, snapshot: &LedgerSnapshot) -> Result<()> {
        let (headers, rows) = self.table(snapshot);
        let window_width = rows
            .iter()
            .map(|v| v[0].chars().count())
            .chain([headers[0].len()])
            .max()
            .unwrap_or_default()
            .min(MAX_WINDOW_COLUMN);

        let title = self.title();
        // Clear, home, set terminal title.
        write!(self.out, "\x1B[2J\x1B[H\x1B]0;{title}\x07")?;

        let heading = headers
            .iter()
            .enumerate()
            .map(|(i, v)| if i == 0 { fit(v, window_width) } else { format!("{v:<19}") })
            .collect::<Vec<_>>()
            .join("  ");
        writeln!(self.out, "{}", Style::new().bold().paint(heading))?;

        for row in rows {
            let line = row
                .iter()
                .enumerate()
                .map(|(i, v)| if i == 0 { fit(v, window_width) } else { format!("{v:<19}") })
                .collect::<Vec<_>>()
                .join("  ");
            writeln!(self.out, "{}", Colour::Cyan.paint(line))?;
        }
        self.out.flush()?;
        Ok(())
    }
}

/// Renders ledger snapshots on its own cadence until shutdown.
pub struct LiveView<V> {
    ledger: LedgerReader,
    view: V,
    shutdown: CancellationToken,
    refresh_interval: Duration,
    time_provider: Box<dyn Clock>,
}

impl<V: SnapshotView> LiveView<V> {
    pub fn new(
        ledger: LedgerReader,
        view: V,
        shutdown: CancellationToken,
        refresh_interval: Duration,
        time_provider: Box<dyn Clock>,
    ) -> Self {
        Self {
            ledger,
            view,
            shutdown,
            refresh_interval,
            time_provider,
        }
    }

    fn refresh(&mut self) -> Result<()> {
        let snapshot = self.ledger.snapshot()?;
        self.view.render(&snapshot)
    }

    pub async fn run(mut self) -> V {
        let mut refresh_point = self.time_provider.instant();
        loop {
            refresh_point += self.refresh_interval;

            if let Err(e) = self.refresh() {
                error!("Failed to refresh live view {e:?}")
            }

            tokio::select! {
                _ = self.shutdown.cancelled() => return self.view,
                _ = self.time_provider.sleep_until(refresh_point) => ()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::Duration};

    use anyhow::{anyhow, Result};
    use chrono::{TimeZone, Utc};
    use tokio_util::sync::CancellationToken;

    use super::{LiveView, SnapshotView, TerminalView, ViewMode};
    use crate::{
        daemon::{
            collection::resolver::TRACKER_TITLE,
            storage::{entities::LedgerSnapshot, ledger::ActivityLedger},
        },
        utils::clock::TestClock,
    };

    #[derive(Default)]
    struct RecordingView {
        rendered: Vec<LedgerSnapshot>,
        fail_first: bool,
    }

    impl SnapshotView for RecordingView {
        fn render(&mut self, snapshot: &LedgerSnapshot) -> Result<()> {
            if std::mem::take(&mut self.fail_first) {
                return Err(anyhow!("terminal went away"));
            }
            self.rendered.push(snapshot.clone());
            Ok(())
        }
    }

    fn ledger() -> Result<ActivityLedger> {
        let ledger = ActivityLedger::new();
        ledger.accumulate(&Arc::from("Notepad"), chrono::Duration::seconds(65), Utc::now())?;
        ledger.accumulate(&Arc::from("Browser"), chrono::Duration::seconds(130), Utc::now())?;
        Ok(ledger)
    }

    #[test]
    fn totals_view_lists_every_window() -> Result<()> {
        let mut view = TerminalView::new(Vec::new(), ViewMode::Totals);
        view.render(&ledger()?.snapshot()?)?;

        let output = String::from_utf8(view.into_inner())?;
        assert!(output.contains(TRACKER_TITLE));
        assert!(output.contains("Window Name"));
        assert!(output.contains("Notepad"));
        assert!(output.contains("0:02:10"));
        Ok(())
    }

    #[test]
    fn history_view_has_start_time_column() -> Result<()> {
        let mut view = TerminalView::new(Vec::new(), ViewMode::History);
        view.render(&ledger()?.snapshot()?)?;

        let output = String::from_utf8(view.into_inner())?;
        assert!(output.contains("Start Time"));
        assert!(output.contains("0:01:05"));
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn live_view_follows_the_ledger_and_survives_errors() -> Result<()> {
        let ledger = ledger()?;
        let shutdown = CancellationToken::new();
        let live = LiveView::new(
            ledger.reader(),
            RecordingView {
                fail_first: true,
                ..Default::default()
            },
            shutdown.clone(),
            Duration::from_secs(1),
            Box::new(TestClock::new(Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap())),
        );

        let (view, _) = tokio::join!(live.run(), async {
            tokio::time::sleep(Duration::from_millis(1_500)).await;
            ledger
                .accumulate(&Arc::from("Terminal"), chrono::Duration::seconds(1), Utc::now())
                .unwrap();
            tokio::time::sleep(Duration::from_secs(1)).await;
            shutdown.cancel();
        });

        assert_eq!(view.rendered.len(), 2);
        assert_eq!(view.rendered[0].len(), 2);
        assert_eq!(view.rendered[1].len(), 3);
        Ok(())
    }
}
