pub mod daemon_path;
pub mod process;

use std::{env, path::PathBuf};

use anyhow::Result;
use clap::{Parser, Subcommand};
use daemon_path::to_daemon_path;
use process::{kill_previous_servers, restart_server};

use crate::{
    daemon::{args::TrackArgs, presentation::ViewMode, start_tracker, TrackerConfig},
    utils::{
        dir::create_application_default_path,
        logging::{enable_logging, CLI_PREFIX},
        time::format_elapsed,
    },
};

#[derive(Parser, Debug)]
#[command(name = "Windowtime", version, long_about = None)]
#[command(about = "Tracks how long each application window holds focus", long_about = None)]
struct Args {
    #[command(subcommand)]
    commands: Commands,
}

#[derive(Subcommand, Debug)]
#[command(version, about, long_about = None)]
enum Commands {
    #[command(about = "Track in the current console until interrupted")]
    Run {
        #[command(flatten)]
        track: TrackArgs,
        #[arg(long, help = "Show live totals while tracking")]
        live: bool,
        #[arg(long, requires = "live", help = "Show first-seen times instead of totals")]
        history: bool,
    },
    #[command(about = "Starts a daemon for the application")]
    Start {
        #[arg(
            long,
            help = "Application directory. By default tries to save into $XDG_STATE_HOME or $HOME/.local/state"
        )]
        dir: Option<PathBuf>,
    },
    #[command(about = "Stop currently running daemon.")]
    Stop {},
}

pub async fn run_cli() -> Result<()> {
    let args = Args::parse();

    match args.commands {
        Commands::Run {
            track,
            live,
            history,
        } => run_in_console(track, live, history).await,
        Commands::Start { dir } => {
            let daemon = to_daemon_path(env::current_exe()?);
            restart_server(&daemon, dir.as_deref())
        }
        Commands::Stop {} => {
            let daemon = to_daemon_path(env::current_exe()?);
            let stopped = kill_previous_servers(&daemon)?;
            println!("Stopped {stopped} daemon(s)");
            Ok(())
        }
    }
}

async fn run_in_console(track: TrackArgs, live: bool, history: bool) -> Result<()> {
    let app_dir = track
        .dir
        .clone()
        .map_or_else(create_application_default_path, Ok)?;
    enable_logging(CLI_PREFIX, &app_dir.join("logs"), track.log, track.log_console)?;

    let view = match (live, history) {
        (false, _) => None,
        (true, false) => Some(ViewMode::Totals),
        (true, true) => Some(ViewMode::History),
    };
    let config = TrackerConfig {
        view,
        ..TrackerConfig::from_args(&track, &app_dir)
    };
    let export_dir = config.export_dir.clone();

    println!("Tracking started... Press Ctrl+C to stop.");
    let snapshot = start_tracker(config).await?;
    println!("\nTracking stopped.");
    println!(
        "Tracked {} across {} windows, saved into {}",
        format_elapsed(snapshot.total()),
        snapshot.len(),
        export_dir.display()
    );
    Ok(())
}
