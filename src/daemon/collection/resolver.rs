use std::{collections::HashSet, sync::Arc};

use anyhow::Result;
use tracing::{debug, error};

use crate::{daemon::storage::entities::WindowIdentity, window_api::WindowManager};

/// Identity reported when the platform can't tell what is focused.
pub const UNKNOWN_WINDOW: &str = "Unknown Window";
/// Title the live view gives to its terminal while showing totals.
pub const TRACKER_TITLE: &str = "Active Window Tracker";
/// Title the live view gives to its terminal while showing history.
pub const HISTORY_TITLE: &str = "App History";

/// How a focused window is turned into an identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum IdentityMode {
    /// Windows with equal titles share their time, whatever process owns them.
    #[default]
    Title,
    /// Time is split by owning process, e.g. `Inbox (thunderbird)`.
    TitleAndProcess,
}

/// Turns the current foreground window into a [WindowIdentity].
///
/// Platform failures never leave this type. They are logged and reported as [UNKNOWN_WINDOW].
pub struct WindowIdentityResolver {
    manager: Box<dyn WindowManager>,
    excluded: HashSet<WindowIdentity>,
    mode: IdentityMode,
    unknown: WindowIdentity,
}

impl WindowIdentityResolver {
    pub fn new(
        manager: Box<dyn WindowManager>,
        excluded: HashSet<WindowIdentity>,
        mode: IdentityMode,
    ) -> Self {
        Self {
            manager,
            excluded,
            mode,
            unknown: Arc::from(UNKNOWN_WINDOW),
        }
    }

    /// Returns `None` when nothing trackable is focused: the window belongs to an excluded
    /// surface or has no title.
    pub fn resolve(&mut self) -> Option<WindowIdentity> {
        match self.query() {
            Ok(identity) => identity,
            Err(e) => {
                error!("Failed to resolve foreground window {e:?}");
                Some(self.unknown.clone())
            }
        }
    }

    fn query(&mut self) -> Result<Option<WindowIdentity>> {
        let window = self.manager.foreground_window()?;
        let title = self.manager.window_title(window)?;

        if title.is_empty() || self.excluded.contains(title.as_str()) {
            debug!("Ignoring window {title:?}");
            return Ok(None);
        }

        let process_id = self.manager.owner_process_id(window)?;
        if process_id == 0 {
            debug!("Window {title:?} has no owning process");
            return Ok(Some(self.unknown.clone()));
        }
        let process_name = self.manager.process_name(process_id)?;

        Ok(Some(match self.mode {
            IdentityMode::Title => Arc::from(title),
            IdentityMode::TitleAndProcess => Arc::from(format!("{title} ({process_name})")),
        }))
    }
}
