use std::sync::{Arc, RwLock};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use crossbeam_channel::{Receiver, Sender};
use log::{error, warn};
use notify::{Event as NotifyEvent, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tray_icon::menu::MenuEvent;
use tray_icon::{TrayIcon, TrayIconBuilder};
use winit::event::{Event, StartCause};
use winit::event_loop::{ControlFlow, EventLoop, EventLoopProxy};

use crate::config::{
    Config, get_config_path, load_and_validate_config, load_or_create_config,
    validate_target_folder,
};
use crate::interval::{IntervalStore, apply_edited_interval};
use crate::model::*;
use crate::monitor::{LoopSettings, Monitor};
use crate::notify::{maybe_notify_kills, notify_monitor_switched};
use crate::platform::current::crash::crash_system;
use crate::platform::current::dialog::{confirm, show_error, show_info};
use crate::platform::current::input::toggle_network;
use crate::platform::current::sysinfo::query_system_summary;
use crate::platform::current::toplevel::list_top_level_windows;
use crate::process::ToolhelpKiller;
use crate::scan::list_executables;
use crate::ui::icon::{IconVariant, create_tray_icon};
use crate::ui::labels::{
    KillToastThrottle, build_tooltip, kill_feedback, parse_menu_action, window_list_text,
};
use crate::ui::menu::build_menu_with_context;
use crate::utils::hidden_command;

const MENU_POLL_INTERVAL: Duration = Duration::from_millis(100);
const REFRESH_INTERVAL: Duration = Duration::from_millis(200);
const CONFIG_DEBOUNCE_DURATION: Duration = Duration::from_millis(500);

type SharedMonitor = Arc<Monitor<ToolhelpKiller>>;

pub fn run() -> Result<()> {
    let config = load_or_create_config().context("failed to load configuration")?;

    if let Err(e) = validate_target_folder(&config.monitoring.target_folder) {
        error!("{}", e);
        show_error("FATAL ERROR", &e.to_string());
        std::process::exit(1);
    }

    let shared_config = Arc::new(RwLock::new(config.clone()));
    let monitor: SharedMonitor = Arc::new(Monitor::new(ToolhelpKiller, loop_settings(&config)));

    let mut state = AppState {
        config: config.clone(),
        ..Default::default()
    };
    refresh_snapshot(&mut state, &monitor);

    let event_loop = EventLoop::<UserEvent>::with_user_event()
        .build()
        .context("failed to create event loop")?;
    let proxy = event_loop.create_proxy();
    let (worker_tx, worker_rx) = crossbeam_channel::unbounded();

    let _config_watcher = spawn_config_watcher(proxy.clone(), shared_config.clone());
    let worker = spawn_worker(
        worker_rx,
        proxy.clone(),
        monitor.clone(),
        shared_config.clone(),
    );
    let menu_receiver = MenuEvent::receiver().clone();

    let icon = create_tray_icon(IconVariant::for_running(state.running))
        .context("failed to create tray icon image")?;
    let initial_menu = build_menu_with_context(&state).context("failed to build initial menu")?;
    let tray_icon = TrayIconBuilder::new()
        .with_icon(icon)
        .with_menu(Box::new(initial_menu))
        .with_tooltip(build_tooltip(&state))
        .build()
        .context("failed to create tray icon")?;
    tray_icon
        .set_visible(true)
        .context("failed to show tray icon")?;

    let mut worker_sender: Option<Sender<WorkerCommand>> = Some(worker_tx);
    let mut worker = Some(worker);
    let mut last_refresh = Instant::now();
    let mut toast_throttle = KillToastThrottle::new();

    #[allow(deprecated)]
    let run_result = event_loop.run(move |event, event_loop| match event {
        Event::NewEvents(StartCause::Init) => {
            event_loop
                .set_control_flow(ControlFlow::WaitUntil(Instant::now() + MENU_POLL_INTERVAL));
        }
        Event::NewEvents(StartCause::ResumeTimeReached { .. }) => {
            while let Ok(event) = menu_receiver.try_recv() {
                if let Some(action) = parse_menu_action(event.id().as_ref()) {
                    let _ = proxy.send_event(UserEvent::MenuAction(action));
                }
            }

            if last_refresh.elapsed() >= REFRESH_INTERVAL {
                last_refresh = Instant::now();
                let prev_killed = state.killed;
                let changed = refresh_snapshot(&mut state, &monitor);
                maybe_notify_kills(&state.config, &mut toast_throttle, prev_killed, state.killed);
                if changed {
                    sync_menu_with_context(&tray_icon, &state);
                    update_tray_display(&tray_icon, &state);
                }
            }

            event_loop
                .set_control_flow(ControlFlow::WaitUntil(Instant::now() + MENU_POLL_INTERVAL));
        }
        Event::UserEvent(user_event) => match user_event {
            UserEvent::MenuAction(action) => match action {
                MenuAction::ToggleMonitor => {
                    let start = !monitor.is_running();
                    dispatch(
                        &mut worker_sender,
                        &mut state,
                        WorkerCommand::SwitchMonitor { start },
                    );
                    update_tray_display(&tray_icon, &state);
                }
                MenuAction::KillImage { name } => {
                    dispatch(&mut worker_sender, &mut state, WorkerCommand::KillImage { name });
                    update_tray_display(&tray_icon, &state);
                }
                MenuAction::SetInterval { secs } => {
                    let store = IntervalStore::new(state.config.monitoring.interval_path());
                    match store.write_secs(secs) {
                        Ok(()) => {
                            state.last_feedback = Some(Feedback::info(format!(
                                "Successfully set interval to {}s",
                                secs
                            )));
                        }
                        Err(e) => {
                            show_error("Error", &format!("{:#}", e));
                            state.last_feedback = Some(Feedback::error(format!("{:#}", e)));
                        }
                    }
                    refresh_snapshot(&mut state, &monitor);
                    sync_menu_with_context(&tray_icon, &state);
                    update_tray_display(&tray_icon, &state);
                }
                MenuAction::EditInterval => {
                    let store = IntervalStore::new(state.config.monitoring.interval_path());
                    state.last_feedback = Some(
                        match spawn_interval_editor(store, state.interval_secs, proxy.clone()) {
                            Ok(path) => Feedback::info(format!("Editing interval file: {}", path)),
                            Err(e) => Feedback::error(format!("{:#}", e)),
                        },
                    );
                    update_tray_display(&tray_icon, &state);
                }
                MenuAction::ShowWindows => match list_top_level_windows() {
                    Ok(titles) => show_info("Window Shower", &window_list_text(&titles)),
                    Err(e) => {
                        state.last_feedback =
                            Some(Feedback::error(format!("Window listing failed: {:#}", e)));
                        update_tray_display(&tray_icon, &state);
                    }
                },
                MenuAction::OpenFolder => {
                    let folder = &state.config.monitoring.target_folder;
                    if let Err(e) = hidden_command("explorer").arg(folder).spawn() {
                        state.last_feedback = Some(Feedback::error(format!(
                            "Failed to open {}: {}",
                            folder.display(),
                            e
                        )));
                        update_tray_display(&tray_icon, &state);
                    }
                }
                MenuAction::SystemInfo => {
                    let summary = query_system_summary();
                    show_info("System Information", &summary.to_string());
                }
                MenuAction::CrashSystem => {
                    if confirm(
                        "Crash System",
                        "This will immediately crash Windows with a blue screen.\n\
                         Unsaved work in every application will be lost.\n\nContinue?",
                    ) {
                        dispatch(&mut worker_sender, &mut state, WorkerCommand::CrashSystem);
                        update_tray_display(&tray_icon, &state);
                    }
                }
                MenuAction::EditConfig => {
                    let config_path = get_config_path();
                    let path_str = config_path.to_string_lossy().to_string();
                    let _ = hidden_command("notepad").arg(&path_str).spawn();
                    state.last_feedback =
                        Some(Feedback::info(format!("Opened config file: {}", path_str)));
                    update_tray_display(&tray_icon, &state);
                }
                MenuAction::Quit => {
                    event_loop.exit();
                }
            },
            UserEvent::Feedback(feedback) => {
                if feedback.show_dialog {
                    match feedback.severity {
                        FeedbackSeverity::Info => show_info("DieKnow", &feedback.message),
                        FeedbackSeverity::Warning | FeedbackSeverity::Error => {
                            show_error("DieKnow", &feedback.message)
                        }
                    }
                }
                state.last_feedback = Some(feedback);
                refresh_snapshot(&mut state, &monitor);
                sync_menu_with_context(&tray_icon, &state);
                update_tray_display(&tray_icon, &state);
            }
            UserEvent::ConfigReloaded(new_config) => {
                monitor.configure(loop_settings(&new_config));
                state.config = new_config;
                state.last_feedback = Some(Feedback::info("Configuration reloaded".to_string()));
                refresh_snapshot(&mut state, &monitor);
                sync_menu_with_context(&tray_icon, &state);
                update_tray_display(&tray_icon, &state);
            }
            UserEvent::ConfigReloadFailed(message) => {
                state.last_feedback = Some(Feedback::error(message));
                update_tray_display(&tray_icon, &state);
            }
        },
        Event::LoopExiting => {
            // Closing the channel ends the worker once its current command is done
            worker_sender.take();
            if let Some(handle) = worker.take()
                && handle.join().is_err()
            {
                error!("Worker thread panicked");
            }
            monitor.shutdown();
        }
        _ => {}
    });

    run_result.context("event loop terminated with error")?;
    Ok(())
}

fn loop_settings(config: &Config) -> LoopSettings {
    LoopSettings {
        extension: config.monitoring.extension.clone(),
        interval: IntervalStore::new(config.monitoring.interval_path()),
    }
}

fn dispatch(
    worker_sender: &mut Option<Sender<WorkerCommand>>,
    state: &mut AppState,
    command: WorkerCommand,
) {
    let Some(sender) = worker_sender.as_ref() else {
        state.last_feedback = Some(Feedback::error("Worker unavailable.".to_string()));
        return;
    };
    if let Err(err) = sender.send(command) {
        state.last_feedback = Some(Feedback::error(format!(
            "Unable to dispatch command: {}",
            err
        )));
        *worker_sender = None;
    }
}

/// Re-reads everything the tray shows. Returns `true` when any of it changed.
fn refresh_snapshot(state: &mut AppState, monitor: &SharedMonitor) -> bool {
    let executables = list_executables(
        &state.config.monitoring.target_folder,
        &state.config.monitoring.extension,
    )
    .unwrap_or_default();
    let running = monitor.is_running();
    let killed = monitor.killed_count();
    let interval_secs = IntervalStore::new(state.config.monitoring.interval_path()).read_secs();

    let changed = executables != state.executables
        || running != state.running
        || killed != state.killed
        || interval_secs != state.interval_secs;

    state.executables = executables;
    state.running = running;
    state.killed = killed;
    state.interval_secs = interval_secs;
    changed
}

/// Opens the interval file in Notepad and validates it once Notepad exits.
/// Returns the path being edited.
fn spawn_interval_editor(
    store: IntervalStore,
    previous: u64,
    proxy: EventLoopProxy<UserEvent>,
) -> Result<String> {
    if !store.path().exists() {
        store.write_secs(previous)?;
    }
    let path_str = store.path().to_string_lossy().to_string();
    let mut child = hidden_command("notepad")
        .arg(&path_str)
        .spawn()
        .context("failed to open Notepad")?;

    thread::Builder::new()
        .name("dieknow-interval-editor".into())
        .spawn(move || {
            if let Err(e) = child.wait() {
                warn!("Lost track of Notepad: {}", e);
                return;
            }
            let feedback = match apply_edited_interval(&store, previous) {
                Ok(secs) => Feedback::info(format!("Successfully set interval to {}s", secs)),
                Err(e) => Feedback::error(format!("{:#}", e)).with_dialog(),
            };
            let _ = proxy.send_event(UserEvent::Feedback(feedback));
        })
        .context("failed to spawn interval editor thread")?;
    Ok(path_str)
}

fn spawn_config_watcher(
    proxy: EventLoopProxy<UserEvent>,
    shared_config: Arc<RwLock<Config>>,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let config_path = get_config_path();
        let (tx, rx) = std::sync::mpsc::channel();

        let mut watcher: RecommendedWatcher = match Watcher::new(
            move |res: Result<NotifyEvent, notify::Error>| {
                let _ = tx.send(res);
            },
            notify::Config::default(),
        ) {
            Ok(w) => w,
            Err(e) => {
                log::error!("Failed to create config watcher: {}", e);
                return;
            }
        };

        if let Err(e) = watcher.watch(&config_path, RecursiveMode::NonRecursive) {
            log::error!("Failed to watch config file: {}", e);
            return;
        }

        log::debug!("Config watcher started for {:?}", config_path);

        let mut last_reload = Instant::now() - CONFIG_DEBOUNCE_DURATION;

        for result in rx {
            match result {
                Ok(event) => {
                    if !matches!(event.kind, EventKind::Modify(_) | EventKind::Create(_)) {
                        continue;
                    }
                    // Editors may write in several operations
                    if last_reload.elapsed() < CONFIG_DEBOUNCE_DURATION {
                        continue;
                    }
                    last_reload = Instant::now();

                    match load_and_validate_config() {
                        Ok(new_config) => {
                            if let Ok(mut cfg) = shared_config.write() {
                                *cfg = new_config.clone();
                            }
                            if proxy
                                .send_event(UserEvent::ConfigReloaded(new_config))
                                .is_err()
                            {
                                break;
                            }
                        }
                        Err(e) => {
                            let msg = format!("Config reload failed: {:#}", e);
                            log::warn!("{}", msg);
                            if proxy.send_event(UserEvent::ConfigReloadFailed(msg)).is_err() {
                                break;
                            }
                        }
                    }
                }
                Err(e) => {
                    log::error!("Config watch error: {}", e);
                }
            }
        }
    })
}

fn spawn_worker(
    rx: Receiver<WorkerCommand>,
    proxy: EventLoopProxy<UserEvent>,
    monitor: SharedMonitor,
    shared_config: Arc<RwLock<Config>>,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        for command in rx.iter() {
            let feedback = match command {
                WorkerCommand::SwitchMonitor { start } => {
                    let config = match shared_config.read() {
                        Ok(cfg) => cfg.clone(),
                        Err(poisoned) => poisoned.into_inner().clone(),
                    };
                    switch_monitor(&monitor, &config, start)
                }
                WorkerCommand::KillImage { name } => {
                    let result = monitor.terminate_now(&name);
                    kill_feedback(&name, &result).with_dialog()
                }
                WorkerCommand::CrashSystem => match crash_system() {
                    Ok(()) => Feedback::warning("Crash request returned".to_string()),
                    Err(e) => Feedback::error(format!("Crash request failed: {:#}", e)),
                },
            };
            if proxy.send_event(UserEvent::Feedback(feedback)).is_err() {
                break;
            }
        }
    })
}

/// Starts or stops the monitor, bracketed by network toggles when enabled.
fn switch_monitor(monitor: &SharedMonitor, config: &Config, start: bool) -> Feedback {
    let toggle = || {
        if !config.network.toggle_on_switch {
            return;
        }
        if let Err(e) = toggle_network(Duration::from_millis(config.network.panel_delay_ms)) {
            warn!("Network toggle failed: {:#}", e);
        }
    };

    toggle();
    let result = if start {
        monitor.configure(loop_settings(config));
        monitor.start(&config.monitoring.target_folder)
    } else {
        Ok(monitor.stop())
    };
    toggle();

    match result {
        Ok(true) => {
            notify_monitor_switched(config, start);
            Feedback::info(if start {
                "Monitoring started".to_string()
            } else {
                "Monitoring stopped".to_string()
            })
        }
        Ok(false) => Feedback::info(if start {
            "Monitoring is already running".to_string()
        } else {
            "Monitoring is not running".to_string()
        }),
        Err(e) => Feedback::error(format!("Failed to start monitoring: {:#}", e)),
    }
}

fn sync_menu_with_context(tray_icon: &TrayIcon, state: &AppState) {
    match build_menu_with_context(state) {
        Ok(menu) => tray_icon.set_menu(Some(Box::new(menu))),
        Err(err) => error!("Failed to rebuild menu: {}", err),
    }
}

fn update_tray_display(tray_icon: &TrayIcon, state: &AppState) {
    if let Ok(icon) = create_tray_icon(IconVariant::for_running(state.running)) {
        let _ = tray_icon.set_icon(Some(icon));
    }

    let tooltip = build_tooltip(state);
    if let Err(err) = tray_icon.set_tooltip(Some(tooltip.as_str())) {
        error!("Failed to update tooltip: {}", err);
    }
}
