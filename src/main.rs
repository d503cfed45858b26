#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

#[cfg(target_os = "windows")]
fn main() -> anyhow::Result<()> {
    env_logger::init();
    dieknow::run()
}

#[cfg(not(target_os = "windows"))]
fn main() {
    env_logger::init();
    log::error!("DieKnow only runs on Windows");
    std::process::exit(1);
}
