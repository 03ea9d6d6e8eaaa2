use std::sync::{
    atomic::{AtomicBool, AtomicUsize, Ordering},
    Mutex,
};

use anyhow::{bail, Result};

use super::{filters::clean_snapshot, ForegroundCache, WindowInfo, WindowSource};

/// Window source fed by the caller. Used for headless runs and tests.
#[derive(Default)]
pub struct StaticWindowSource {
    windows: Mutex<Vec<WindowInfo>>,
    failing: AtomicBool,
    snapshots: AtomicUsize,
    foreground: ForegroundCache,
}

impl StaticWindowSource {
    pub fn new(windows: Vec<WindowInfo>) -> Self {
        Self {
            windows: Mutex::new(windows),
            ..Self::default()
        }
    }

    pub fn set_windows(&self, windows: Vec<WindowInfo>) {
        *self.windows.lock().unwrap_or_else(|p| p.into_inner()) = windows;
    }

    /// While failing, every snapshot returns an error.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Number of `list_running_windows` calls so far.
    pub fn snapshots_taken(&self) -> usize {
        self.snapshots.load(Ordering::SeqCst)
    }

    fn current(&self) -> Vec<WindowInfo> {
        self.windows.lock().unwrap_or_else(|p| p.into_inner()).clone()
    }
}

impl WindowSource for StaticWindowSource {
    fn list_running_windows(&self) -> Result<Vec<WindowInfo>> {
        self.snapshots.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            bail!("window snapshot unavailable");
        }
        Ok(clean_snapshot(self.current()))
    }

    fn cache_foreground_window(&self) {
        let current = self.current().into_iter().find(|w| w.is_foreground);
        self.foreground.store(current);
    }

    fn last_foreground_window(&self) -> Option<WindowInfo> {
        self.foreground.get()
    }

    fn clear_foreground_window(&self) {
        self.foreground.clear();
    }
}
