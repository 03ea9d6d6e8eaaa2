mod filters;
mod fixed;
mod foreground;
mod process;
mod types;
#[cfg(target_os = "windows")]
mod windows;

pub use filters::{clean_snapshot, is_blacklisted, looks_like_ours};
pub use fixed::StaticWindowSource;
pub use foreground::ForegroundCache;
pub use process::ProcessWindowSource;
pub use types::{WindowInfo, WindowKey, WindowSource};
#[cfg(target_os = "windows")]
pub use windows::WindowsWindowSource;

#[cfg(target_os = "windows")]
pub type NativeWindowSource = WindowsWindowSource;
#[cfg(not(target_os = "windows"))]
pub type NativeWindowSource = ProcessWindowSource;
