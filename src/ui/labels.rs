use std::time::{Duration, Instant};

use anyhow::Result;

use crate::interval::parse_interval_input;
use crate::model::{AppState, Feedback, FeedbackSeverity, KillSummary, MenuAction};

pub const INTERVAL_PRESETS: &[u64] = &[1, 2, 5, 10, 30, 60];
const MAX_WINDOW_ENTRIES: usize = 40;
pub const KILL_TOAST_MIN_GAP: Duration = Duration::from_secs(30);

pub const MENU_ID_TOGGLE: &str = "toggle_monitor";
pub const MENU_ID_EDIT_INTERVAL: &str = "edit_interval";
pub const MENU_ID_SHOW_WINDOWS: &str = "show_windows";
pub const MENU_ID_OPEN_FOLDER: &str = "open_folder";
pub const MENU_ID_SYSTEM_INFO: &str = "system_info";
pub const MENU_ID_CRASH: &str = "crash_system";
pub const MENU_ID_EDIT_CONFIG: &str = "edit_config";
pub const MENU_ID_QUIT: &str = "quit";
pub const MENU_ID_EMPTY: &str = "empty";
pub const MENU_ID_KILL_PREFIX: &str = "kill_";
pub const MENU_ID_INTERVAL_PREFIX: &str = "interval_";

pub fn kill_menu_id(name: &str) -> String {
    format!("{}{}", MENU_ID_KILL_PREFIX, name)
}

pub fn interval_menu_id(secs: u64) -> String {
    format!("{}{}", MENU_ID_INTERVAL_PREFIX, secs)
}

pub fn parse_menu_action(raw: &str) -> Option<MenuAction> {
    match raw {
        MENU_ID_TOGGLE => Some(MenuAction::ToggleMonitor),
        MENU_ID_EDIT_INTERVAL => Some(MenuAction::EditInterval),
        MENU_ID_SHOW_WINDOWS => Some(MenuAction::ShowWindows),
        MENU_ID_OPEN_FOLDER => Some(MenuAction::OpenFolder),
        MENU_ID_SYSTEM_INFO => Some(MenuAction::SystemInfo),
        MENU_ID_CRASH => Some(MenuAction::CrashSystem),
        MENU_ID_EDIT_CONFIG => Some(MenuAction::EditConfig),
        MENU_ID_QUIT => Some(MenuAction::Quit),
        _ => {
            if let Some(name) = raw.strip_prefix(MENU_ID_KILL_PREFIX) {
                image_name(name).map(|name| MenuAction::KillImage { name })
            } else if let Some(value) = raw.strip_prefix(MENU_ID_INTERVAL_PREFIX) {
                parse_interval_input(value).map(|secs| MenuAction::SetInterval { secs })
            } else {
                None
            }
        }
    }
}

/// Accepts a bare file name; anything that could address another path is
/// refused.
fn image_name(raw: &str) -> Option<String> {
    let name = raw.trim();
    if name.is_empty() || name.contains(['\\', '/', ':']) {
        return None;
    }
    Some(name.to_string())
}

pub fn toggle_label(running: bool) -> &'static str {
    if running {
        "Stop Monitoring"
    } else {
        "Start Monitoring"
    }
}

pub fn build_tooltip(state: &AppState) -> String {
    let mut lines = vec![
        format!(
            "DieKnow · {}",
            if state.running { "Running" } else { "Stopped" }
        ),
        format!("Executables terminated: {}", state.killed),
        format!("Interval: {}s", state.interval_secs),
    ];

    if let Some(feedback) = &state.last_feedback {
        let prefix = match feedback.severity {
            FeedbackSeverity::Info => "",
            FeedbackSeverity::Warning => "⚠️ ",
            FeedbackSeverity::Error => "⛔ ",
        };
        lines.push(format!("Last action: {}{}", prefix, feedback.message));
    }

    lines.join("\n")
}

pub fn kill_feedback(name: &str, result: &Result<KillSummary>) -> Feedback {
    let summary = match result {
        Ok(summary) => summary,
        Err(e) => {
            return Feedback::error(format!("Failed to enumerate processes for {}: {:#}", name, e));
        }
    };

    if summary.matched() == 0 {
        return Feedback::info(format!("{} is not running.", name));
    }

    let mut problems = Vec::new();
    if summary.already_exited > 0 {
        problems.push(format!("{} already stopped", summary.already_exited));
    }
    if summary.denied > 0 {
        problems.push(format!("{} permission denied", summary.denied));
    }
    if summary.failed > 0 {
        problems.push(format!("{} failed", summary.failed));
    }

    if problems.is_empty() {
        Feedback::info(format!(
            "Successfully closed {} ({} process{}).",
            name,
            summary.terminated,
            if summary.terminated == 1 { "" } else { "es" }
        ))
    } else {
        let severity = if summary.terminated > 0 {
            FeedbackSeverity::Warning
        } else {
            FeedbackSeverity::Error
        };
        Feedback::new(
            format!(
                "{}: terminated {}, {}.",
                name,
                summary.terminated,
                problems.join(", ")
            ),
            severity,
        )
    }
}

pub fn kill_toast_body(delta: u64, killed: u64) -> String {
    format!(
        "Terminated {} executable{} ({} total)",
        delta,
        if delta == 1 { "" } else { "s" },
        killed
    )
}

/// Folds kill-count growth into at most one toast per `KILL_TOAST_MIN_GAP`.
/// Kills seen inside the gap are summed into the next toast.
#[derive(Debug, Default)]
pub struct KillToastThrottle {
    last_shown: Option<Instant>,
    pending: u64,
}

impl KillToastThrottle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Call on every refresh tick, changed or not, so held-back kills are
    /// flushed once the gap has passed.
    pub fn observe(&mut self, prev_killed: u64, killed: u64, now: Instant) -> Option<String> {
        self.pending += killed.saturating_sub(prev_killed);
        if self.pending == 0 {
            return None;
        }
        if let Some(last) = self.last_shown
            && now.saturating_duration_since(last) < KILL_TOAST_MIN_GAP
        {
            return None;
        }
        let delta = std::mem::take(&mut self.pending);
        self.last_shown = Some(now);
        Some(kill_toast_body(delta, killed))
    }
}

pub fn window_list_text(titles: &[String]) -> String {
    if titles.is_empty() {
        return "No visible windows.".to_string();
    }
    let mut lines: Vec<String> = titles
        .iter()
        .take(MAX_WINDOW_ENTRIES)
        .map(|t| format!("• {}", t))
        .collect();
    if titles.len() > MAX_WINDOW_ENTRIES {
        lines.push(format!("…and {} more", titles.len() - MAX_WINDOW_ENTRIES));
    }
    lines.join("\n")
}
