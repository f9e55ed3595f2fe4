use std::ffi::c_void;

use anyhow::{anyhow, Result};
use tracing::error;
use windows::{
    core::PWSTR,
    Win32::{
        Foundation::{CloseHandle, BOOL, HANDLE, HWND},
        System::Threading::{
            OpenProcess, QueryFullProcessImageNameW, PROCESS_NAME_WIN32,
            PROCESS_QUERY_LIMITED_INFORMATION,
        },
        UI::WindowsAndMessaging::{GetForegroundWindow, GetWindowTextW, GetWindowThreadProcessId},
    },
};

use super::{WindowHandle, WindowManager};

fn to_hwnd(window: WindowHandle) -> HWND {
    HWND(window.0 as usize as *mut c_void)
}

#[tracing::instrument]
pub fn get_foreground() -> Result<WindowHandle> {
    let window = unsafe { GetForegroundWindow() };

    if window.is_invalid() {
        return Err(anyhow!("Failed to get foreground window"));
    }
    Ok(WindowHandle(window.0 as usize as u64))
}

pub fn get_owner_process_id(window: WindowHandle) -> u32 {
    let mut id = 0u32;
    unsafe { GetWindowThreadProcessId(to_hwnd(window), Some(&mut id)) };
    id
}

pub fn get_window_title(window: WindowHandle) -> String {
    let mut text: [u16; 4096] = [0; 4096];
    let len = unsafe { GetWindowTextW(to_hwnd(window), &mut text) };
    String::from_utf16_lossy(&text[..len.max(0) as usize])
}

pub fn get_process_name(process_id: u32) -> Result<String> {
    let process_handle = unsafe {
        OpenProcess(PROCESS_QUERY_LIMITED_INFORMATION, BOOL::from(false), process_id)
    }
    .inspect_err(|e| error!("Failed to open process {e:?}"))?;

    let mut text: [u16; 4096] = [0; 4096];
    let path = unsafe { get_process_path(process_handle, &mut text) };

    unsafe { CloseHandle(process_handle) }
        .inspect_err(|e| error!("Failed to close handle {e:?}"))?;

    let path = path?;
    Ok(std::path::Path::new(&path)
        .file_name()
        .map(|v| v.to_string_lossy().to_string())
        .unwrap_or(path))
}

unsafe fn get_process_path(process_handle: HANDLE, text: &mut [u16]) -> Result<String> {
    unsafe {
        let mut length = text.len() as u32;
        QueryFullProcessImageNameW(
            process_handle,
            PROCESS_NAME_WIN32,
            PWSTR(text.as_mut_ptr()),
            &mut length,
        )?;
        Ok(String::from_utf16_lossy(&text[..length as usize]))
    }
}

pub struct WindowsWindowManager {}

impl WindowsWindowManager {
    pub fn new() -> Self {
        Self {}
    }
}

impl Default for WindowsWindowManager {
    fn default() -> Self {
        Self::new()
    }
}

impl WindowManager for WindowsWindowManager {
    fn foreground_window(&mut self) -> Result<WindowHandle> {
        get_foreground()
    }

    fn window_title(&mut self, window: WindowHandle) -> Result<String> {
        Ok(get_window_title(window))
    }

    fn owner_process_id(&mut self, window: WindowHandle) -> Result<u32> {
        Ok(get_owner_process_id(window))
    }

    fn process_name(&mut self, process_id: u32) -> Result<String> {
        get_process_name(process_id)
            .inspect_err(|e| error!("Failed to get process name of {process_id} {e:?}"))
    }
}
