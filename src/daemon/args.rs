use std::path::PathBuf;

use clap::Parser;
use tracing::level_filters::LevelFilter;

use super::{
    collection::resolver::{IdentityMode, HISTORY_TITLE, TRACKER_TITLE},
    processing::local_save::ExportFormat,
};

/// Tracking options shared by `windowtime run` and the daemon.
#[derive(clap::Args, Debug, Clone)]
pub struct TrackArgs {
    #[arg(
        long,
        help = "Application directory. By default tries to save into $XDG_STATE_HOME or $HOME/.local/state"
    )]
    pub dir: Option<PathBuf>,
    #[arg(
        long = "sample-interval-ms",
        default_value_t = 1000,
        value_parser = clap::value_parser!(u64).range(1..),
        help = "How often the focused window is sampled"
    )]
    pub sample_interval_ms: u64,
    #[arg(
        long = "refresh-interval-ms",
        default_value_t = 1000,
        value_parser = clap::value_parser!(u64).range(1..),
        help = "How often the live view is redrawn"
    )]
    pub refresh_interval_ms: u64,
    #[arg(
        long = "save-interval-secs",
        default_value_t = 30,
        value_parser = clap::value_parser!(u64).range(1..),
        help = "How often the tables are exported"
    )]
    pub save_interval_secs: u64,
    #[arg(
        long = "exclude",
        default_values_t = [TRACKER_TITLE.to_string(), HISTORY_TITLE.to_string()],
        help = "Window title that is never tracked. Replaces the defaults when given"
    )]
    pub exclude: Vec<String>,
    #[arg(long, value_enum, default_value_t = IdentityMode::Title)]
    pub identity: IdentityMode,
    #[arg(long, value_enum, default_value_t = ExportFormat::Csv)]
    pub format: ExportFormat,
    /// This option is for debugging purposes only.
    #[arg(long = "log-console")]
    pub log_console: bool,
    #[arg(long = "log-filter")]
    pub log: Option<LevelFilter>,
}

#[derive(Parser)]
pub struct DaemonArgs {
    #[arg(long, help = "Stay attached to the current console")]
    pub force: bool,
    #[command(flatten)]
    pub track: TrackArgs,
}
