use std::sync::Mutex;

use super::WindowInfo;

/// Last known foreground window, shared between the show path (writer) and
/// the poll loop (reader).
#[derive(Default)]
pub struct ForegroundCache {
    slot: Mutex<Option<WindowInfo>>,
}

impl ForegroundCache {
    pub fn store(&self, window: Option<WindowInfo>) {
        if window.is_none() {
            return;
        }
        *self.slot.lock().unwrap_or_else(|p| p.into_inner()) = window;
    }

    pub fn clear(&self) {
        *self.slot.lock().unwrap_or_else(|p| p.into_inner()) = None;
    }

    pub fn get(&self) -> Option<WindowInfo> {
        self.slot.lock().unwrap_or_else(|p| p.into_inner()).clone()
    }
}
