//! Contains logic for querying the foreground window in different environments.
//! [GenericWindowManager] is the main artifact of this module that abstracts
//! the operations.

#[cfg(feature = "win")]
pub mod win;
#[cfg(feature = "x11")]
pub mod x11;

#[cfg(feature = "win")]
extern crate windows;

#[cfg(feature = "x11")]
extern crate xcb;

use anyhow::Result;

/// Platform specific window identifier. On Windows this is an `HWND`, on X11 a window resource id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowHandle(pub u64);

/// Intended to serve as a contract windows and linux systems must implement. Every call may fail,
/// callers decide how a failure is interpreted.
#[cfg_attr(test, mockall::automock)]
pub trait WindowManager: Send {
    /// Window currently receiving user input.
    fn foreground_window(&mut self) -> Result<WindowHandle>;

    /// Title of the window. For example 'bash in hello' or 'Document 1' or 'Vibing in YouTube -
    /// Chrome'
    fn window_title(&mut self, window: WindowHandle) -> Result<String>;

    /// Id of the process owning the window. `0` means the platform couldn't tell.
    fn owner_process_id(&mut self, window: WindowHandle) -> Result<u32>;

    /// Short executable name of a process, e.g. `firefox`.
    fn process_name(&mut self, process_id: u32) -> Result<String>;
}

/// Serves as a cross-compatible WindowManager implementation.
pub struct GenericWindowManager {
    inner: Box<dyn WindowManager>,
}

impl GenericWindowManager {
    pub fn new() -> Result<Self> {
        cfg_if::cfg_if! {
            if #[cfg(feature = "win")] {
                use win::WindowsWindowManager;
                Ok(Self {
                    inner: Box::new(WindowsWindowManager::new()),
                })
            }
            else if #[cfg(feature = "x11")] {
                use x11::LinuxWindowManager;
                Ok(Self {
                    inner: Box::new(LinuxWindowManager::new()?),
                })
            }
            else {
                // Keeps the crate buildable for tests. Starting the tracker without a platform
                // feature is a startup error.
                Err(anyhow::anyhow!(
                    "No window manager was compiled in, enable the `win` or `x11` feature"
                ))
            }
        }
    }
}

impl WindowManager for GenericWindowManager {
    fn foreground_window(&mut self) -> Result<WindowHandle> {
        self.inner.foreground_window()
    }

    fn window_title(&mut self, window: WindowHandle) -> Result<String> {
        self.inner.window_title(window)
    }

    fn owner_process_id(&mut self, window: WindowHandle) -> Result<u32> {
        self.inner.owner_process_id(window)
    }

    fn process_name(&mut self, process_id: u32) -> Result<String> {
        self.inner.process_name(process_id)
    }
}
