//! Windows process termination using ToolHelp snapshots and TerminateProcess

use anyhow::{Context, Result};
use windows::Win32::Foundation::{CloseHandle, HANDLE};
use windows::Win32::System::Diagnostics::ToolHelp::{
    CreateToolhelp32Snapshot, PROCESSENTRY32W, Process32FirstW, Process32NextW,
    TH32CS_SNAPPROCESS,
};
use windows::Win32::System::Threading::{OpenProcess, PROCESS_TERMINATE, TerminateProcess};

use crate::model::{KillOutcome, KillSummary};
use crate::monitor::ProcessKiller;
use crate::scan::image_name_matches;

const ERROR_ACCESS_DENIED: u32 = 5;
const ERROR_INVALID_PARAMETER: u32 = 87;
const ERROR_NOT_FOUND: u32 = 1168;

/// `ProcessKiller` backed by the live process table.
#[derive(Clone, Copy, Debug, Default)]
pub struct ToolhelpKiller;

impl ProcessKiller for ToolhelpKiller {
    fn terminate_by_image_name(&self, image_name: &str) -> Result<KillSummary> {
        terminate_by_image_name(image_name)
    }
}

/// Snapshot of `(pid, image name)` for every process on the system.
pub fn list_processes() -> Result<Vec<(u32, String)>> {
    let snapshot = unsafe { CreateToolhelp32Snapshot(TH32CS_SNAPPROCESS, 0) }
        .context("CreateToolhelp32Snapshot failed")?;
    let snapshot = OwnedHandle(snapshot);

    let mut entry = PROCESSENTRY32W {
        dwSize: std::mem::size_of::<PROCESSENTRY32W>() as u32,
        ..Default::default()
    };
    let mut processes = Vec::new();

    // SAFETY: the snapshot handle is valid and entry.dwSize is initialised
    if unsafe { Process32FirstW(snapshot.0, &mut entry) }.is_err() {
        return Ok(processes);
    }
    loop {
        processes.push((entry.th32ProcessID, exe_name(&entry)));
        if unsafe { Process32NextW(snapshot.0, &mut entry) }.is_err() {
            break;
        }
    }
    Ok(processes)
}

pub fn terminate_by_image_name(image_name: &str) -> Result<KillSummary> {
    let mut summary = KillSummary::default();
    for (pid, name) in list_processes()? {
        if !image_name_matches(&name, image_name) {
            continue;
        }
        let outcome = terminate_pid(pid);
        log::debug!("terminate {} (PID {}): {:?}", name, pid, outcome);
        summary.record(outcome);
    }
    Ok(summary)
}

pub fn terminate_pid(pid: u32) -> KillOutcome {
    // SAFETY: OpenProcess has no preconditions; the handle is closed below
    let handle = match unsafe { OpenProcess(PROCESS_TERMINATE, false, pid) } {
        Ok(h) => OwnedHandle(h),
        Err(e) => return outcome_for(win32_code(&e)),
    };

    match unsafe { TerminateProcess(handle.0, 1) } {
        Ok(()) => KillOutcome::Success,
        Err(e) => outcome_for(win32_code(&e)),
    }
}

fn outcome_for(code: u32) -> KillOutcome {
    match code {
        ERROR_ACCESS_DENIED => KillOutcome::PermissionDenied,
        // Process is gone between snapshot and open
        ERROR_INVALID_PARAMETER | ERROR_NOT_FOUND => KillOutcome::AlreadyExited,
        other => KillOutcome::Failed(other),
    }
}

/// Win32 error code carried in a FACILITY_WIN32 HRESULT.
pub(crate) fn win32_code(err: &windows::core::Error) -> u32 {
    (err.code().0 as u32) & 0xFFFF
}

fn exe_name(entry: &PROCESSENTRY32W) -> String {
    let len = entry
        .szExeFile
        .iter()
        .position(|&c| c == 0)
        .unwrap_or(entry.szExeFile.len());
    String::from_utf16_lossy(&entry.szExeFile[..len])
}

struct OwnedHandle(HANDLE);

impl Drop for OwnedHandle {
    fn drop(&mut self) {
        // SAFETY: the handle came from a successful Win32 call and is closed once
        let _ = unsafe { CloseHandle(self.0) };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_win32_codes() {
        assert_eq!(outcome_for(5), KillOutcome::PermissionDenied);
        assert_eq!(outcome_for(87), KillOutcome::AlreadyExited);
        assert_eq!(outcome_for(1168), KillOutcome::AlreadyExited);
        assert_eq!(outcome_for(31), KillOutcome::Failed(31));
    }

    #[test]
    fn snapshot_contains_this_process() {
        let me = std::process::id();
        let processes = list_processes().unwrap();
        assert!(processes.iter().any(|(pid, _)| *pid == me));
    }

    #[test]
    fn unknown_image_name_matches_nothing() {
        let summary = terminate_by_image_name("no-such-image-dieknow.exe").unwrap();
        assert_eq!(summary.matched(), 0);
    }
}
