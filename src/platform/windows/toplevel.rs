//! Enumeration of visible top-level windows

use anyhow::{Context, Result};
use windows::Win32::Foundation::{BOOL, HWND, LPARAM};
use windows::Win32::UI::WindowsAndMessaging::{
    EnumWindows, GetWindowTextLengthW, GetWindowTextW, IsWindowVisible,
};

/// Titles of visible top-level windows, in Z order. Untitled windows are
/// skipped.
pub fn list_top_level_windows() -> Result<Vec<String>> {
    let mut titles: Vec<String> = Vec::new();
    // SAFETY: the callback only runs during EnumWindows while `titles` is alive
    unsafe {
        EnumWindows(
            Some(collect_title),
            LPARAM(&mut titles as *mut Vec<String> as isize),
        )
    }
    .context("EnumWindows failed")?;
    Ok(titles)
}

unsafe extern "system" fn collect_title(hwnd: HWND, lparam: LPARAM) -> BOOL {
    let titles = unsafe { &mut *(lparam.0 as *mut Vec<String>) };

    if !unsafe { IsWindowVisible(hwnd) }.as_bool() {
        return BOOL(1);
    }
    let len = unsafe { GetWindowTextLengthW(hwnd) };
    if len <= 0 {
        return BOOL(1);
    }

    let mut buf = vec![0u16; len as usize + 1];
    let copied = unsafe { GetWindowTextW(hwnd, &mut buf) };
    if copied > 0 {
        titles.push(String::from_utf16_lossy(&buf[..copied as usize]));
    }
    BOOL(1)
}
