//! Hardware and OS summary from the registry and Win32 queries

use anyhow::{Context, Result};
use windows::Win32::Graphics::Gdi::{DISPLAY_DEVICEW, EnumDisplayDevicesW};
use windows::Win32::System::SystemInformation::{GlobalMemoryStatusEx, MEMORYSTATUSEX};
use windows::core::PCWSTR;
use winreg::RegKey;
use winreg::enums::HKEY_LOCAL_MACHINE;

use crate::model::{SystemSummary, format_os_version};

const CPU_KEY: &str = r"HARDWARE\DESCRIPTION\System\CentralProcessor\0";
const VERSION_KEY: &str = r"SOFTWARE\Microsoft\Windows NT\CurrentVersion";
const ENVIRONMENT_KEY: &str = r"SYSTEM\CurrentControlSet\Control\Session Manager\Environment";
const UNKNOWN: &str = "Unknown";

pub fn query_system_summary() -> SystemSummary {
    SystemSummary {
        cpu: cpu_name().unwrap_or_else(|e| {
            log::debug!("CPU lookup failed: {:#}", e);
            UNKNOWN.to_string()
        }),
        gpu: gpu_name().unwrap_or_else(|| "Unknown GPU".to_string()),
        os: os_info().unwrap_or_else(|e| {
            log::debug!("OS version lookup failed: {:#}", e);
            UNKNOWN.to_string()
        }),
        free_ram_mb: available_ram_mb().unwrap_or(0),
    }
}

fn cpu_name() -> Result<String> {
    let key = RegKey::predef(HKEY_LOCAL_MACHINE)
        .open_subkey(CPU_KEY)
        .context("failed to open processor key")?;
    let name: String = key
        .get_value("ProcessorNameString")
        .context("ProcessorNameString missing")?;
    Ok(name.trim().to_string())
}

fn gpu_name() -> Option<String> {
    let mut device = DISPLAY_DEVICEW {
        cb: std::mem::size_of::<DISPLAY_DEVICEW>() as u32,
        ..Default::default()
    };
    // SAFETY: device.cb is set and the struct lives across the call
    let found = unsafe { EnumDisplayDevicesW(PCWSTR::null(), 0, &mut device, 0) };
    if !found.as_bool() {
        return None;
    }
    let raw = &device.DeviceString;
    let len = raw.iter().position(|&c| c == 0).unwrap_or(raw.len());
    Some(String::from_utf16_lossy(&raw[..len]))
}

fn os_info() -> Result<String> {
    let hklm = RegKey::predef(HKEY_LOCAL_MACHINE);
    let version = hklm
        .open_subkey(VERSION_KEY)
        .context("failed to open CurrentVersion key")?;
    let major: u32 = version.get_value("CurrentMajorVersionNumber").unwrap_or(0);
    let minor: u32 = version.get_value("CurrentMinorVersionNumber").unwrap_or(0);
    let build: String = version
        .get_value("CurrentBuildNumber")
        .context("CurrentBuildNumber missing")?;

    let arch: String = hklm
        .open_subkey(ENVIRONMENT_KEY)
        .and_then(|env| env.get_value("PROCESSOR_ARCHITECTURE"))
        .unwrap_or_default();

    Ok(format_os_version(major, minor, &build, &arch))
}

fn available_ram_mb() -> Option<u64> {
    let mut status = MEMORYSTATUSEX {
        dwLength: std::mem::size_of::<MEMORYSTATUSEX>() as u32,
        ..Default::default()
    };
    // SAFETY: dwLength is set as the API requires
    unsafe { GlobalMemoryStatusEx(&mut status) }.ok()?;
    Some(status.ullAvailPhys / (1024 * 1024))
}
