//! Keystroke scripts replayed through the OS input queue.

use std::time::Duration;

pub const VK_LWIN: u16 = 0x5B;
pub const VK_A: u16 = 0x41;
pub const VK_SPACE: u16 = 0x20;
pub const VK_ESCAPE: u16 = 0x1B;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyStep {
    Press(u16),
    Release(u16),
    Pause(Duration),
}

/// Opens the quick settings panel (Win+A), waits for it to render, flips the
/// focused tile with Space and closes the panel with Escape.
pub fn network_toggle_sequence(panel_delay: Duration) -> Vec<KeyStep> {
    use KeyStep::*;

    vec![
        Press(VK_LWIN),
        Press(VK_A),
        Release(VK_A),
        Release(VK_LWIN),
        Pause(panel_delay),
        Press(VK_SPACE),
        Release(VK_SPACE),
        Press(VK_ESCAPE),
        Release(VK_ESCAPE),
    ]
}
