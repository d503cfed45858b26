pub mod crash;
pub mod dialog;
pub mod input;
pub mod kill;
pub mod notify;
pub mod sysinfo;
pub mod toplevel;
