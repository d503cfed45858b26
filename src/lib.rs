#[cfg(target_os = "windows")]
pub mod app;
#[cfg(target_os = "windows")]
pub use app::run;

pub mod config;
pub mod interval;
pub mod keys;
pub mod model;
pub mod monitor;
pub mod scan;
#[cfg(target_os = "windows")]
pub mod utils;

// Platform abstraction layer
pub mod platform;

pub mod ui {
    pub mod labels;

    #[cfg(target_os = "windows")]
    pub mod icon;
    #[cfg(target_os = "windows")]
    pub mod menu;
}

// Re-export platform-specific implementations through unified interface
#[cfg(target_os = "windows")]
pub mod process {
    pub use crate::platform::current::kill::*;
}

#[cfg(target_os = "windows")]
pub mod notify {
    pub use crate::platform::current::notify::*;
}
