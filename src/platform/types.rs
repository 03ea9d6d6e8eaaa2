use std::fmt;

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// One OS window with the metadata of the process that owns it.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct WindowInfo {
    pub process_id: u32,
    pub title: String,
    pub process_name: String,
    /// Empty when the process path could not be read.
    pub executable_path: String,
    pub is_foreground: bool,
}

impl WindowInfo {
    pub fn key(&self) -> WindowKey {
        WindowKey {
            process_id: self.process_id,
            title: self.title.clone(),
        }
    }

    pub fn has_key(&self, key: &WindowKey) -> bool {
        self.process_id == key.process_id && self.title == key.title
    }
}

/// Identity of a window across polls. A process may own several titled
/// windows, so the pid alone is not enough.
#[derive(Debug, Clone, Hash, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct WindowKey {
    pub process_id: u32,
    pub title: String,
}

impl fmt::Display for WindowKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.process_id, self.title)
    }
}

/// Platform window enumeration. Calls may block; callers run them on a
/// blocking thread.
pub trait WindowSource: Send + Sync {
    fn list_running_windows(&self) -> Result<Vec<WindowInfo>>;

    /// Remember the current foreground window. Called right before the
    /// overlay is shown, while the game still owns the foreground.
    fn cache_foreground_window(&self);

    fn last_foreground_window(&self) -> Option<WindowInfo>;

    /// Drop the cached window once the overlay is hidden so a later show
    /// does not fall back to a window from an earlier session.
    fn clear_foreground_window(&self);
}
