//! Platform abstraction layer
//!
//! This module provides platform-specific implementations for:
//! - Process enumeration and termination
//! - Synthesized keyboard input
//! - Dialogs, toast notifications
//! - System information and top-level window queries

#[cfg(target_os = "windows")]
pub mod windows;

// Re-export the current platform's modules
#[cfg(target_os = "windows")]
pub use windows as current;
