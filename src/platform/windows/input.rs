//! Synthesized keyboard input via SendInput

use std::thread;
use std::time::Duration;

use anyhow::{Result, bail};
use windows::Win32::UI::Input::KeyboardAndMouse::{
    INPUT, INPUT_0, INPUT_KEYBOARD, KEYBD_EVENT_FLAGS, KEYBDINPUT, KEYEVENTF_KEYUP, SendInput,
    VIRTUAL_KEY,
};

use crate::keys::{KeyStep, network_toggle_sequence};

pub fn play(steps: &[KeyStep]) -> Result<()> {
    for step in steps {
        match *step {
            KeyStep::Press(vk) => send_key(vk, KEYBD_EVENT_FLAGS(0))?,
            KeyStep::Release(vk) => send_key(vk, KEYEVENTF_KEYUP)?,
            KeyStep::Pause(delay) => thread::sleep(delay),
        }
    }
    Ok(())
}

/// Flips network connectivity through the quick settings panel.
pub fn toggle_network(panel_delay: Duration) -> Result<()> {
    log::debug!("Toggling network via quick settings");
    play(&network_toggle_sequence(panel_delay))
}

fn send_key(vk: u16, flags: KEYBD_EVENT_FLAGS) -> Result<()> {
    let input = INPUT {
        r#type: INPUT_KEYBOARD,
        Anonymous: INPUT_0 {
            ki: KEYBDINPUT {
                wVk: VIRTUAL_KEY(vk),
                wScan: 0,
                dwFlags: flags,
                time: 0,
                dwExtraInfo: 0,
            },
        },
    };
    // SAFETY: one fully initialised INPUT with its correct size
    let sent = unsafe { SendInput(&[input], std::mem::size_of::<INPUT>() as i32) };
    if sent != 1 {
        bail!("SendInput rejected key {:#04x}", vk);
    }
    Ok(())
}
