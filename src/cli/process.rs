use std::path::Path;

use anyhow::{anyhow, Result};
use sysinfo::{get_current_pid, Signal, System};
use tracing::info;

/// Terminates every process running the executable at `name`. Daemons receive a terminate signal
/// first, so they get to write their final export.
pub fn kill_previous_servers(name: &Path) -> Result<usize> {
    let system = System::new_all();
    let current_id = get_current_pid().map_err(|e| anyhow!("Can't determine own pid {e}"))?;
    let mut killed = 0;
    for (pid, process) in system.processes().iter() {
        if *pid == current_id {
            continue;
        }
        if matches!(process.parent(), Some(p) if p == current_id) {
            continue;
        }

        if process
            .exe()
            .filter(|v| v.exists())
            .filter(|v| name == *v)
            .is_some()
        {
            info!("Stopping daemon {pid}");
            // This will forcefully terminate the process on Windows. Anything better will require a
            // lot more work.
            if process.kill_with(Signal::Term).is_none() {
                process.kill();
            }
            process.wait();
            killed += 1;
        }
    }
    Ok(killed)
}

/// Intended for shutting down previous daemon and starting new one. The daemon detaches itself, so
/// this only waits for the launcher half to exit.
pub fn restart_server(daemon: &Path, dir: Option<&Path>) -> Result<()> {
    kill_previous_servers(daemon)?;
    let mut command = std::process::Command::new(daemon);
    if let Some(dir) = dir {
        command.arg("--dir").arg(dir);
    }

    println!("Spawning");
    let status = command.status()?;
    if !status.success() {
        return Err(anyhow!("Daemon failed to start {status}"));
    }
    println!("Success");
    Ok(())
}
