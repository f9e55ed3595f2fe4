use std::path::{Path, PathBuf};

use anyhow::Result;
use chrono::{Local, TimeZone};
use fs4::tokio::AsyncFileExt;
use serde::Serialize;
use tokio::{
    fs::File,
    io::{AsyncSeekExt, AsyncWriteExt},
};
use tracing::debug;

use crate::{
    daemon::storage::entities::{LedgerSnapshot, WindowIdentity},
    utils::time::{format_elapsed, format_timestamp},
};

use super::module::SnapshotExporter;

pub const TOTALS_FILE: &str = "window_tracking_data";
pub const HISTORY_FILE: &str = "app_history";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum ExportFormat {
    #[default]
    Csv,
    Json,
}

impl ExportFormat {
    fn extension(self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Json => "json",
        }
    }
}

/// A row of an exported table. Serde names double as column headers.
trait TableRow: Serialize {
    const HEADERS: &'static [&'static str];

    fn cells(&self) -> Vec<&str>;
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct TotalsRow {
    #[serde(rename = "Window")]
    pub window: WindowIdentity,
    #[serde(rename = "Time Spent")]
    pub time_spent: String,
}

impl TableRow for TotalsRow {
    const HEADERS: &'static [&'static str] = &["Window", "Time Spent"];

    fn cells(&self) -> Vec<&str> {
        vec![&*self.window, self.time_spent.as_str()]
    }
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct HistoryRow {
    #[serde(rename = "Window")]
    pub window: WindowIdentity,
    #[serde(rename = "Start Time")]
    pub start_time: String,
    #[serde(rename = "Time Spent")]
    pub time_spent: String,
}

impl TableRow for HistoryRow {
    const HEADERS: &'static [&'static str] = &["Window", "Start Time", "Time Spent"];

    fn cells(&self) -> Vec<&str> {
        vec![&*self.window, self.start_time.as_str(), self.time_spent.as_str()]
    }
}

pub fn totals_rows(snapshot: &LedgerSnapshot) -> Vec<TotalsRow> {
    snapshot
        .records
        .iter()
        .map(|v| TotalsRow {
            window: v.identity.clone(),
            time_spent: format_elapsed(v.cumulative),
        })
        .collect()
}

/// Session history with start times rendered in `timezone`.
pub fn history_rows<Tz: TimeZone>(snapshot: &LedgerSnapshot, timezone: &Tz) -> Vec<HistoryRow>
where
    Tz::Offset: std::fmt::Display,
{
    snapshot
        .records
        .iter()
        .map(|v| HistoryRow {
            window: v.identity.clone(),
            start_time: format_timestamp(v.first_seen, timezone),
            time_spent: format_elapsed(v.cumulative),
        })
        .collect()
}

fn csv_escape(s: &str) -> String {
    let needs_quote = s.contains(',') || s.contains('"') || s.contains('\n') || s.contains('\r');
    if !needs_quote {
        return s.to_string();
    }
    format!("\"{}\"", s.replace('"', "\"\""))
}

fn to_csv<R: TableRow>(rows: &[R]) -> String {
    let mut out = R::HEADERS.join(",");
    out.push('\n');
    for row in rows {
        let cells = row.cells().into_iter().map(csv_escape).collect::<Vec<_>>();
        out.push_str(&cells.join(","));
        out.push('\n');
    }
    out
}

fn encode<R: TableRow>(rows: &[R], format: ExportFormat) -> Result<Vec<u8>> {
    match format {
        ExportFormat::Csv => Ok(to_csv(rows).into_bytes()),
        ExportFormat::Json => Ok(serde_json::to_vec_pretty(rows)?),
    }
}

/// Writes totals and history tables into a directory, replacing the previous files.
pub struct TableExporter {
    export_dir: PathBuf,
    format: ExportFormat,
}

impl TableExporter {
    pub fn new(export_dir: PathBuf, format: ExportFormat) -> Result<Self, std::io::Error> {
        std::fs::create_dir_all(&export_dir)?;

        Ok(Self { export_dir, format })
    }

    pub fn totals_path(&self) -> PathBuf {
        self.table_path(TOTALS_FILE)
    }

    pub fn history_path(&self) -> PathBuf {
        self.table_path(HISTORY_FILE)
    }

    fn table_path(&self, name: &str) -> PathBuf {
        self.export_dir
            .join(name)
            .with_extension(self.format.extension())
    }

    async fn write_table(path: &Path, contents: &[u8]) -> Result<()> {
        debug!("Writing {path:?}");
        let mut file = File::options()
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)
            .await?;

        // Truncate only once the lock is held, readers never see another writer's partial table.
        file.lock_exclusive()?;
        let result = Self::overwrite(&mut file, contents).await;
        file.unlock_async().await?;
        result
    }

    async fn overwrite(file: &mut File, contents: &[u8]) -> Result<()> {
        file.set_len(0).await?;
        file.seek(std::io::SeekFrom::Start(0)).await?;
        file.write_all(contents).await?;
        file.flush().await?;
        Ok(())
    }
}

impl SnapshotExporter for TableExporter {
    async fn export(&mut self, snapshot: &LedgerSnapshot) -> Result<()> {
        // The directory might have been removed since startup.
        tokio::fs::create_dir_all(&self.export_dir).await?;

        let totals = encode(&totals_rows(snapshot), self.format)?;
        Self::write_table(&self.totals_path(), &totals).await?;

        let history = encode(&history_rows(snapshot, &Local), self.format)?;
        Self::write_table(&self.history_path(), &history).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use anyhow::Result;
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use tempfile::tempdir;

    use super::{history_rows, to_csv, totals_rows, ExportFormat, TableExporter};
    use crate::daemon::{
        processing::module::SnapshotExporter,
        storage::entities::{ActivityRecord, LedgerSnapshot},
    };

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap()
    }

    fn snapshot() -> LedgerSnapshot {
        LedgerSnapshot {
            records: vec![
                ActivityRecord {
                    identity: Arc::from("Notepad"),
                    cumulative: Duration::seconds(65),
                    first_seen: start(),
                },
                ActivityRecord {
                    identity: Arc::from("Browser"),
                    cumulative: Duration::seconds(130),
                    first_seen: start() + Duration::seconds(65),
                },
            ],
        }
    }

    #[test]
    fn totals_csv_has_one_row_per_window() {
        let csv = to_csv(&totals_rows(&snapshot()));
        let lines = csv.lines().collect::<Vec<_>>();

        assert_eq!(lines[0], "Window,Time Spent");
        assert_eq!(lines.len() - 1, 2);
        assert!(lines.contains(&"Browser,0:02:10"));
        assert!(lines.contains(&"Notepad,0:01:05"));
    }

    #[test]
    fn history_rows_carry_start_time() {
        let rows = history_rows(&snapshot(), &Utc);

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].start_time, "2024-05-01 09:01:05");
        assert_eq!(rows[1].time_spent, "0:02:10");
        assert_eq!(
            to_csv(&rows).lines().next(),
            Some("Window,Start Time,Time Spent")
        );
    }

    #[test]
    fn csv_fields_are_quoted_when_needed() {
        let snapshot = LedgerSnapshot {
            records: vec![ActivityRecord {
                identity: Arc::from("Report, \"final\" - Writer"),
                cumulative: Duration::seconds(1),
                first_seen: start(),
            }],
        };
        let csv = to_csv(&totals_rows(&snapshot));

        assert_eq!(
            csv.lines().nth(1),
            Some("\"Report, \"\"final\"\" - Writer\",0:00:01")
        );
    }

    #[tokio::test]
    async fn export_writes_both_tables() -> Result<()> {
        let dir = tempdir()?;
        let mut exporter = TableExporter::new(dir.path().join("data"), ExportFormat::Csv)?;

        exporter.export(&snapshot()).await?;

        let totals = std::fs::read_to_string(exporter.totals_path())?;
        assert_eq!(totals.lines().count(), 3);
        assert!(totals.contains("Browser,0:02:10"));

        let history = std::fs::read_to_string(exporter.history_path())?;
        assert_eq!(history.lines().count(), 3);
        assert!(history.starts_with("Window,Start Time,Time Spent\n"));
        Ok(())
    }

    #[tokio::test]
    async fn export_overwrites_previous_tables() -> Result<()> {
        let dir = tempdir()?;
        let mut exporter = TableExporter::new(dir.path().to_path_buf(), ExportFormat::Csv)?;

        exporter.export(&snapshot()).await?;
        let mut smaller = snapshot();
        smaller.records.truncate(1);
        exporter.export(&smaller).await?;

        let totals = std::fs::read_to_string(exporter.totals_path())?;
        assert_eq!(totals, "Window,Time Spent\nNotepad,0:01:05\n");
        Ok(())
    }

    #[tokio::test]
    async fn json_export_uses_column_names() -> Result<()> {
        let dir = tempdir()?;
        let mut exporter = TableExporter::new(dir.path().to_path_buf(), ExportFormat::Json)?;

        exporter.export(&snapshot()).await?;

        assert!(exporter.totals_path().ends_with("window_tracking_data.json"));
        let totals: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(exporter.totals_path())?)?;
        assert_eq!(totals[1]["Window"], "Browser");
        assert_eq!(totals[1]["Time Spent"], "0:02:10");

        let history: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(exporter.history_path())?)?;
        assert_eq!(history.as_array().map(Vec::len), Some(2));
        assert!(history[0]["Start Time"].is_string());
        Ok(())
    }

    #[tokio::test]
    async fn export_into_unwritable_location_fails() -> Result<()> {
        let dir = tempdir()?;
        let mut exporter = TableExporter::new(dir.path().join("data"), ExportFormat::Csv)?;
        std::fs::remove_dir_all(dir.path().join("data"))?;
        std::fs::write(dir.path().join("data"), "not a directory")?;

        assert!(exporter.export(&snapshot()).await.is_err());
        Ok(())
    }
}
