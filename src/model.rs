use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Process-wide monitor state shared between the poll loop and the shell.
#[derive(Debug, Default)]
pub struct MonitorState {
    running: AtomicBool,
    killed: AtomicU64,
}

impl MonitorState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub fn killed_count(&self) -> u64 {
        self.killed.load(Ordering::Relaxed)
    }

    /// Flips `running` and reports whether the value actually changed.
    pub(crate) fn set_running(&self, running: bool) -> bool {
        self.running.swap(running, Ordering::AcqRel) != running
    }

    pub(crate) fn record_kills(&self, count: u64) {
        if count > 0 {
            self.killed.fetch_add(count, Ordering::Relaxed);
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KillOutcome {
    Success,
    AlreadyExited,
    PermissionDenied,
    Failed(u32),
}

/// Tally of one terminate-by-name pass over the process table.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct KillSummary {
    pub terminated: u64,
    pub already_exited: u64,
    pub denied: u64,
    pub failed: u64,
}

impl KillSummary {
    pub fn record(&mut self, outcome: KillOutcome) {
        match outcome {
            KillOutcome::Success => self.terminated += 1,
            KillOutcome::AlreadyExited => self.already_exited += 1,
            KillOutcome::PermissionDenied => self.denied += 1,
            KillOutcome::Failed(_) => self.failed += 1,
        }
    }

    pub fn matched(&self) -> u64 {
        self.terminated + self.already_exited + self.denied + self.failed
    }

    pub fn merge(&mut self, other: KillSummary) {
        self.terminated += other.terminated;
        self.already_exited += other.already_exited;
        self.denied += other.denied;
        self.failed += other.failed;
    }
}

#[derive(Clone, Debug)]
pub enum UserEvent {
    MenuAction(MenuAction),
    Feedback(Feedback),
    ConfigReloaded(crate::config::Config),
    ConfigReloadFailed(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MenuAction {
    ToggleMonitor,
    KillImage { name: String },
    SetInterval { secs: u64 },
    EditInterval,
    ShowWindows,
    OpenFolder,
    SystemInfo,
    CrashSystem,
    EditConfig,
    Quit,
}

#[derive(Clone, Debug)]
pub enum WorkerCommand {
    SwitchMonitor { start: bool },
    KillImage { name: String },
    CrashSystem,
}

#[derive(Clone, Debug)]
pub struct Feedback {
    pub message: String,
    pub severity: FeedbackSeverity,
    /// Also shown in a message box, for results of explicit user actions.
    pub show_dialog: bool,
}

impl Feedback {
    pub fn new(message: String, severity: FeedbackSeverity) -> Self {
        Self {
            message,
            severity,
            show_dialog: false,
        }
    }

    pub fn info(message: String) -> Self {
        Self::new(message, FeedbackSeverity::Info)
    }

    pub fn warning(message: String) -> Self {
        Self::new(message, FeedbackSeverity::Warning)
    }

    pub fn error(message: String) -> Self {
        Self::new(message, FeedbackSeverity::Error)
    }

    pub fn with_dialog(mut self) -> Self {
        self.show_dialog = true;
        self
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FeedbackSeverity {
    Info,
    Warning,
    Error,
}

/// Snapshot the shell renders into its menu and tooltip.
#[derive(Clone, Debug, Default)]
pub struct AppState {
    pub running: bool,
    pub killed: u64,
    pub interval_secs: u64,
    pub executables: Vec<String>,
    pub last_feedback: Option<Feedback>,
    pub config: crate::config::Config,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SystemSummary {
    pub cpu: String,
    pub gpu: String,
    pub os: String,
    pub free_ram_mb: u64,
}

impl fmt::Display for SystemSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "SYSTEM INFORMATION")?;
        writeln!(f, "==================")?;
        writeln!(f, "CPU: {}", self.cpu)?;
        writeln!(f, "GPU: {}", self.gpu)?;
        writeln!(f, "Operating system: {}", self.os)?;
        write!(f, "Free RAM: {} MB available", self.free_ram_mb)
    }
}

/// `Windows 10.0 (Build 22631), 64-bit` from registry version fields.
pub fn format_os_version(major: u32, minor: u32, build: &str, arch: &str) -> String {
    let bits = match arch.to_ascii_uppercase().as_str() {
        "AMD64" | "ARM64" | "IA64" => "64-bit",
        _ => "32-bit",
    };
    format!("Windows {}.{} (Build {}), {}", major, minor, build.trim(), bits)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn running_flag_reports_transitions() {
        let state = MonitorState::new();
        assert!(!state.is_running());
        assert!(state.set_running(true));
        assert!(!state.set_running(true));
        assert!(state.set_running(false));
        assert!(!state.set_running(false));
    }

    #[test]
    fn killed_count_only_grows() {
        let state = MonitorState::new();
        state.record_kills(2);
        state.record_kills(0);
        state.record_kills(3);
        assert_eq!(state.killed_count(), 5);
    }

    #[test]
    fn summary_tallies_outcomes() {
        let mut summary = KillSummary::default();
        summary.record(KillOutcome::Success);
        summary.record(KillOutcome::Success);
        summary.record(KillOutcome::PermissionDenied);
        summary.record(KillOutcome::Failed(31));
        assert_eq!(summary.terminated, 2);
        assert_eq!(summary.matched(), 4);

        let mut total = KillSummary::default();
        total.merge(summary);
        total.merge(summary);
        assert_eq!(total.terminated, 4);
        assert_eq!(total.failed, 2);
    }

    #[test]
    fn feedback_stays_in_tooltip_unless_asked() {
        let fb = Feedback::warning("partial".into());
        assert!(!fb.show_dialog);
        let fb = fb.with_dialog();
        assert!(fb.show_dialog);
        assert_eq!(fb.severity, FeedbackSeverity::Warning);
        assert_eq!(fb.message, "partial");
    }

    #[test]
    fn system_summary_report() {
        let summary = SystemSummary {
            cpu: "Intel(R) Core(TM) i5".into(),
            gpu: "Intel(R) UHD Graphics".into(),
            os: "Windows 10.0 (Build 22631), 64-bit".into(),
            free_ram_mb: 2048,
        };
        let text = summary.to_string();
        assert!(text.starts_with("SYSTEM INFORMATION\n==================\n"));
        assert!(text.contains("CPU: Intel(R) Core(TM) i5\n"));
        assert!(text.contains("Operating system: Windows 10.0 (Build 22631), 64-bit\n"));
        assert!(text.ends_with("Free RAM: 2048 MB available"));
    }

    #[test]
    fn os_version_reports_bitness() {
        assert_eq!(
            format_os_version(10, 0, "22631", "AMD64"),
            "Windows 10.0 (Build 22631), 64-bit"
        );
        assert_eq!(
            format_os_version(6, 1, " 7601 ", "x86"),
            "Windows 6.1 (Build 7601), 32-bit"
        );
        assert!(format_os_version(10, 0, "26100", "arm64").ends_with("64-bit"));
    }
}
