use anyhow::Result;
use tray_icon::menu::{Menu, MenuItem, PredefinedMenuItem, Submenu};

use crate::model::AppState;
use crate::ui::labels::*;

pub fn build_menu_with_context(state: &AppState) -> Result<Menu> {
    let menu = Menu::new();

    let status = MenuItem::with_id(
        "header_status",
        format!(
            "{} · {} terminated",
            if state.running { "Running" } else { "Stopped" },
            state.killed
        ),
        false,
        None,
    );
    menu.append(&status)?;
    let toggle = MenuItem::with_id(MENU_ID_TOGGLE, toggle_label(state.running), true, None);
    menu.append(&toggle)?;

    menu.append(&PredefinedMenuItem::separator())?;

    // === EXECUTABLES SECTION ===
    if state.executables.is_empty() {
        let item = MenuItem::with_id(MENU_ID_EMPTY, "No executables found", false, None);
        menu.append(&item)?;
    } else {
        let header = MenuItem::with_id(
            "header_executables",
            format!("Executables · {}", state.executables.len()),
            false,
            None,
        );
        menu.append(&header)?;

        // Clicking an entry terminates every running instance of it
        for name in &state.executables {
            let item = MenuItem::with_id(kill_menu_id(name), name, true, None);
            menu.append(&item)?;
        }
    }
    let open_folder = MenuItem::with_id(MENU_ID_OPEN_FOLDER, "Open in Explorer", true, None);
    menu.append(&open_folder)?;

    menu.append(&PredefinedMenuItem::separator())?;

    // === INTERVAL SECTION ===
    let interval_menu = Submenu::new(format!("Interval · {}s", state.interval_secs), true);
    for &secs in INTERVAL_PRESETS {
        let label = if secs == state.interval_secs {
            format!("✓ {}s", secs)
        } else {
            format!("{}s", secs)
        };
        let item = MenuItem::with_id(interval_menu_id(secs), label, true, None);
        interval_menu.append(&item)?;
    }
    interval_menu.append(&PredefinedMenuItem::separator())?;
    let edit_interval =
        MenuItem::with_id(MENU_ID_EDIT_INTERVAL, "Edit Interval File...", true, None);
    interval_menu.append(&edit_interval)?;
    menu.append(&interval_menu)?;

    // === SYSTEM SECTION ===
    let show_windows = MenuItem::with_id(MENU_ID_SHOW_WINDOWS, "Window Shower...", true, None);
    menu.append(&show_windows)?;
    let system_info =
        MenuItem::with_id(MENU_ID_SYSTEM_INFO, "System Information...", true, None);
    menu.append(&system_info)?;
    let crash = MenuItem::with_id(MENU_ID_CRASH, "Crash System...", true, None);
    menu.append(&crash)?;

    menu.append(&PredefinedMenuItem::separator())?;
    let edit_config_item =
        MenuItem::with_id(MENU_ID_EDIT_CONFIG, "Edit Configuration...", true, None);
    menu.append(&edit_config_item)?;

    let quit_item = MenuItem::with_id(MENU_ID_QUIT, "Quit and Exit", true, None);
    menu.append(&quit_item)?;
    Ok(menu)
}
