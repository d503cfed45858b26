//! Background loop that keeps the monitored executables from running.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};

use anyhow::{Context, Result};
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};

use crate::interval::IntervalStore;
use crate::model::{KillSummary, MonitorState};
use crate::scan::list_executables;

/// Terminates running processes by executable image name.
pub trait ProcessKiller: Send + Sync + 'static {
    /// Ends every process whose image name matches `image_name`. An error
    /// means the process table could not be read at all.
    fn terminate_by_image_name(&self, image_name: &str) -> Result<KillSummary>;
}

#[derive(Clone, Debug)]
pub struct LoopSettings {
    pub extension: String,
    pub interval: IntervalStore,
}

pub struct Monitor<K: ProcessKiller> {
    state: Arc<MonitorState>,
    killer: Arc<K>,
    settings: Mutex<LoopSettings>,
    stop_tx: Mutex<Option<Sender<()>>>,
    handles: Mutex<Vec<JoinHandle<()>>>,
}

impl<K: ProcessKiller> Monitor<K> {
    pub fn new(killer: K, settings: LoopSettings) -> Self {
        Self {
            state: Arc::new(MonitorState::new()),
            killer: Arc::new(killer),
            settings: Mutex::new(settings),
            stop_tx: Mutex::new(None),
            handles: Mutex::new(Vec::new()),
        }
    }

    pub fn state(&self) -> Arc<MonitorState> {
        self.state.clone()
    }

    pub fn is_running(&self) -> bool {
        self.state.is_running()
    }

    pub fn killed_count(&self) -> u64 {
        self.state.killed_count()
    }

    /// Applies new settings; a loop already running keeps its old ones until
    /// it is restarted.
    pub fn configure(&self, settings: LoopSettings) {
        if let Ok(mut current) = self.settings.lock() {
            *current = settings;
        }
    }

    /// Spawns the poll loop over `folder`. Returns `false` without doing
    /// anything if a loop is already active.
    pub fn start(&self, folder: &Path) -> Result<bool> {
        // The slot lock is held across the flag flip so `running` and the
        // stored sender always change together.
        let mut slot = self.stop_slot();
        if !self.state.set_running(true) {
            return Ok(false);
        }

        let settings = match self.settings.lock() {
            Ok(s) => s.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        };

        let (tx, rx) = crossbeam_channel::bounded(1);
        let state = self.state.clone();
        let killer = self.killer.clone();
        let folder = folder.to_path_buf();

        let spawned = thread::Builder::new()
            .name("dieknow-monitor".into())
            .spawn(move || run_loop(state, killer, settings, folder, rx));
        let handle = match spawned.context("failed to spawn monitor thread") {
            Ok(h) => h,
            Err(e) => {
                self.state.set_running(false);
                return Err(e);
            }
        };

        *slot = Some(tx);
        drop(slot);

        self.track(handle);
        log::info!("Monitoring started");
        Ok(true)
    }

    /// Asks the loop to exit after its current sweep. Does not wait for it.
    /// Returns `false` if nothing was running.
    pub fn stop(&self) -> bool {
        let mut slot = self.stop_slot();
        if !self.state.set_running(false) {
            return false;
        }
        if let Some(tx) = slot.take() {
            let _ = tx.try_send(());
        }
        log::info!("Monitoring stopped");
        true
    }

    /// Stops the loop and joins every monitor thread spawned so far.
    pub fn shutdown(&self) {
        {
            let mut slot = self.stop_slot();
            if self.state.set_running(false) {
                log::info!("Monitoring stopped");
            }
            // Dropping the sender disconnects any loop still holding a receiver
            slot.take();
        }

        let handles = match self.handles.lock() {
            Ok(mut handles) => std::mem::take(&mut *handles),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        };
        for handle in handles {
            if handle.join().is_err() {
                log::error!("Monitor thread panicked");
            }
        }
    }

    /// Terminates one image name right away, outside the poll loop.
    pub fn terminate_now(&self, image_name: &str) -> Result<KillSummary> {
        let summary = self.killer.terminate_by_image_name(image_name)?;
        self.state.record_kills(summary.terminated);
        Ok(summary)
    }
}

impl<K: ProcessKiller> Monitor<K> {
    fn stop_slot(&self) -> MutexGuard<'_, Option<Sender<()>>> {
        match self.stop_tx.lock() {
            Ok(slot) => slot,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn track(&self, handle: JoinHandle<()>) {
        let mut handles = match self.handles.lock() {
            Ok(handles) => handles,
            Err(poisoned) => poisoned.into_inner(),
        };
        handles.retain(|h| !h.is_finished());
        handles.push(handle);
    }
}

impl<K: ProcessKiller> Drop for Monitor<K> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// One pass: list the folder and terminate everything it names. Failures are
/// logged and skipped.
pub fn sweep<K: ProcessKiller + ?Sized>(killer: &K, folder: &Path, extension: &str) -> KillSummary {
    let mut total = KillSummary::default();

    let names = match list_executables(folder, extension) {
        Ok(names) => names,
        Err(e) => {
            log::debug!("Skipping sweep, cannot list {}: {}", folder.display(), e);
            return total;
        }
    };

    for name in &names {
        match killer.terminate_by_image_name(name) {
            Ok(summary) => {
                if summary.terminated > 0 {
                    log::info!("Terminated {} instance(s) of {}", summary.terminated, name);
                }
                total.merge(summary);
            }
            Err(e) => log::debug!("Process snapshot failed for {}: {:#}", name, e),
        }
    }
    total
}

fn run_loop<K: ProcessKiller>(
    state: Arc<MonitorState>,
    killer: Arc<K>,
    settings: LoopSettings,
    folder: PathBuf,
    stop_rx: Receiver<()>,
) {
    log::debug!("Monitor loop started for {:?}", folder);
    loop {
        let summary = sweep(&*killer, &folder, &settings.extension);
        state.record_kills(summary.terminated);

        let interval = settings.interval.read();
        log::trace!("Sweep done ({:?}), sleeping {}s", summary, interval.as_secs());

        // A stop message or a dropped sender both end the loop
        match stop_rx.recv_timeout(interval) {
            Err(RecvTimeoutError::Timeout) => continue,
            Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
        }
    }
    log::debug!("Monitor loop exited for {:?}", folder);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::{Duration, Instant};

    use crate::model::KillOutcome;
    use crate::scan::image_name_matches;

    #[derive(Default)]
    struct FakeKiller {
        running: Mutex<Vec<String>>,
        calls: AtomicUsize,
    }

    impl FakeKiller {
        fn with(names: &[&str]) -> Self {
            Self {
                running: Mutex::new(names.iter().map(|n| n.to_string()).collect()),
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl ProcessKiller for FakeKiller {
        fn terminate_by_image_name(&self, image_name: &str) -> Result<KillSummary> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut running = self.running.lock().unwrap();
            let mut summary = KillSummary::default();
            running.retain(|p| {
                if image_name_matches(p, image_name) {
                    summary.record(KillOutcome::Success);
                    false
                } else {
                    true
                }
            });
            Ok(summary)
        }
    }

    struct Fixture {
        dir: tempfile::TempDir,
        interval: IntervalStore,
    }

    fn fixture(files: &[&str]) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("target");
        fs::create_dir(&target).unwrap();
        for name in files {
            fs::write(target.join(name), b"").unwrap();
        }
        let interval = IntervalStore::new(dir.path().join("interval.txt"));
        Fixture { dir, interval }
    }

    impl Fixture {
        fn target(&self) -> PathBuf {
            self.dir.path().join("target")
        }

        fn settings(&self) -> LoopSettings {
            LoopSettings {
                extension: "exe".into(),
                interval: self.interval.clone(),
            }
        }
    }

    fn wait_until(timeout: Duration, mut done: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if done() {
                return true;
            }
            thread::sleep(Duration::from_millis(10));
        }
        done()
    }

    #[test]
    fn sweep_kills_listed_executables_only() {
        let fx = fixture(&["a.exe", "b.txt"]);
        let killer = FakeKiller::with(&["A.EXE", "a.exe", "b.txt", "notepad.exe"]);

        let summary = sweep(&killer, &fx.target(), "exe");

        assert_eq!(summary.terminated, 2);
        assert_eq!(
            *killer.running.lock().unwrap(),
            vec!["b.txt".to_string(), "notepad.exe".to_string()]
        );
    }

    #[test]
    fn sweep_of_missing_folder_does_nothing() {
        let fx = fixture(&[]);
        let killer = FakeKiller::with(&["a.exe"]);
        let summary = sweep(&killer, &fx.target().join("missing"), "exe");
        assert_eq!(summary, KillSummary::default());
        assert_eq!(killer.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn loop_counts_kills_and_stops() {
        let fx = fixture(&["a.exe"]);
        let monitor = Monitor::new(FakeKiller::with(&["a.exe", "A.exe"]), fx.settings());

        assert!(monitor.start(&fx.target()).unwrap());
        assert!(monitor.is_running());
        assert!(wait_until(Duration::from_secs(2), || monitor.killed_count() == 2));

        assert!(monitor.stop());
        assert!(!monitor.is_running());
        monitor.shutdown();
        assert_eq!(monitor.killed_count(), 2);
    }

    #[test]
    fn start_and_stop_are_idempotent() {
        let fx = fixture(&["a.exe"]);
        fx.interval.write_secs(60).unwrap();
        let monitor = Monitor::new(FakeKiller::default(), fx.settings());

        assert!(!monitor.stop());
        assert!(monitor.start(&fx.target()).unwrap());
        assert!(!monitor.start(&fx.target()).unwrap());
        assert_eq!(monitor.handles.lock().unwrap().len(), 1);

        assert!(monitor.stop());
        assert!(!monitor.stop());
        monitor.shutdown();
    }

    #[test]
    fn interval_spaces_out_sweeps() {
        let fx = fixture(&["a.exe"]);
        fx.interval.write_secs(5).unwrap();
        let monitor = Monitor::new(FakeKiller::default(), fx.settings());

        monitor.start(&fx.target()).unwrap();
        assert!(wait_until(Duration::from_secs(2), || {
            monitor.killer.calls.load(Ordering::SeqCst) >= 1
        }));
        thread::sleep(Duration::from_millis(300));
        assert_eq!(monitor.killer.calls.load(Ordering::SeqCst), 1);

        // Stopping cuts the pending sleep short
        let started = Instant::now();
        monitor.shutdown();
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[test]
    fn zero_interval_spins() {
        let fx = fixture(&["a.exe"]);
        let monitor = Monitor::new(FakeKiller::default(), fx.settings());

        monitor.start(&fx.target()).unwrap();
        assert!(wait_until(Duration::from_secs(2), || {
            monitor.killer.calls.load(Ordering::SeqCst) >= 5
        }));
        monitor.shutdown();
    }

    #[test]
    fn restart_after_stop_spawns_new_loop() {
        let fx = fixture(&["a.exe"]);
        fx.interval.write_secs(60).unwrap();
        let monitor = Monitor::new(FakeKiller::default(), fx.settings());

        monitor.start(&fx.target()).unwrap();
        monitor.stop();
        assert!(monitor.start(&fx.target()).unwrap());
        assert!(monitor.is_running());
        monitor.shutdown();
        assert!(monitor.handles.lock().unwrap().is_empty());
    }

    #[test]
    fn racing_start_and_stop_never_orphans_a_loop() {
        let fx = fixture(&["a.exe"]);
        fx.interval.write_secs(60).unwrap();
        let monitor = Arc::new(Monitor::new(FakeKiller::default(), fx.settings()));

        let starter = {
            let monitor = monitor.clone();
            let folder = fx.target();
            thread::spawn(move || {
                for _ in 0..500 {
                    monitor.start(&folder).unwrap();
                }
            })
        };
        let stopper = {
            let monitor = monitor.clone();
            thread::spawn(move || {
                for _ in 0..500 {
                    monitor.stop();
                }
            })
        };
        starter.join().unwrap();
        stopper.join().unwrap();

        // A sender is parked exactly when the flag says a loop is active
        assert_eq!(
            monitor.is_running(),
            monitor.stop_tx.lock().unwrap().is_some()
        );

        let (done_tx, done_rx) = crossbeam_channel::bounded(1);
        let joiner = {
            let monitor = monitor.clone();
            thread::spawn(move || {
                monitor.shutdown();
                let _ = done_tx.send(());
            })
        };
        assert!(done_rx.recv_timeout(Duration::from_secs(5)).is_ok());
        joiner.join().unwrap();

        assert!(!monitor.is_running());
        assert!(monitor.handles.lock().unwrap().is_empty());
    }

    #[test]
    fn shutdown_disconnects_a_loop_whose_flag_was_cleared() {
        let fx = fixture(&["a.exe"]);
        fx.interval.write_secs(60).unwrap();
        let monitor = Monitor::new(FakeKiller::default(), fx.settings());

        monitor.start(&fx.target()).unwrap();
        monitor.state.set_running(false);

        let started = Instant::now();
        monitor.shutdown();
        assert!(started.elapsed() < Duration::from_secs(2));
        assert!(monitor.stop_tx.lock().unwrap().is_none());
    }

    #[test]
    fn manual_kill_counts_toward_total() {
        let fx = fixture(&[]);
        let monitor = Monitor::new(FakeKiller::with(&["Student.exe", "student.EXE"]), fx.settings());

        let summary = monitor.terminate_now("STUDENT.exe").unwrap();
        assert_eq!(summary.terminated, 2);
        assert_eq!(monitor.killed_count(), 2);

        let summary = monitor.terminate_now("STUDENT.exe").unwrap();
        assert_eq!(summary.matched(), 0);
        assert_eq!(monitor.killed_count(), 2);
    }
}
