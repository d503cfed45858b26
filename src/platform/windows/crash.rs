//! Deliberate bugcheck through undocumented ntdll exports

use anyhow::{Context, Result, anyhow, bail};
use windows::Win32::System::LibraryLoader::{GetModuleHandleW, GetProcAddress};
use windows::core::{s, w};

const SE_SHUTDOWN_PRIVILEGE: u32 = 19;
const STATUS_ASSERTION_FAILURE: i32 = 0xC000_0420_u32 as i32;
const OPTION_SHUTDOWN_SYSTEM: u32 = 6;

type RtlAdjustPrivilege =
    unsafe extern "system" fn(privilege: u32, enable: u8, current_thread: u8, enabled: *mut u8) -> i32;
type NtRaiseHardError = unsafe extern "system" fn(
    status: i32,
    parameter_count: u32,
    unicode_mask: u32,
    parameters: *const usize,
    response_option: u32,
    response: *mut u32,
) -> i32;

/// Enables the shutdown privilege and raises a fatal hard error. Only returns
/// if the kernel refused.
pub fn crash_system() -> Result<()> {
    // SAFETY: ntdll is mapped into every process; the exports are looked up
    // by name and transmuted to their known signatures
    unsafe {
        let ntdll = GetModuleHandleW(w!("ntdll.dll")).context("ntdll.dll not loaded")?;

        let adjust = GetProcAddress(ntdll, s!("RtlAdjustPrivilege"))
            .ok_or_else(|| anyhow!("RtlAdjustPrivilege not exported"))?;
        let raise = GetProcAddress(ntdll, s!("NtRaiseHardError"))
            .ok_or_else(|| anyhow!("NtRaiseHardError not exported"))?;
        let adjust: RtlAdjustPrivilege = std::mem::transmute(adjust);
        let raise: NtRaiseHardError = std::mem::transmute(raise);

        let mut was_enabled = 0u8;
        let status = adjust(SE_SHUTDOWN_PRIVILEGE, 1, 0, &mut was_enabled);
        if status < 0 {
            bail!("RtlAdjustPrivilege failed: NTSTATUS {:#010x}", status as u32);
        }

        log::warn!("Raising fatal hard error");
        let mut response = 0u32;
        let status = raise(
            STATUS_ASSERTION_FAILURE,
            0,
            0,
            std::ptr::null(),
            OPTION_SHUTDOWN_SYSTEM,
            &mut response,
        );
        bail!("NtRaiseHardError returned NTSTATUS {:#010x}", status as u32)
    }
}
