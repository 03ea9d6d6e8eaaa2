//! Process-table window source for platforms without window enumeration.
//! Each running executable becomes one pseudo-window titled after its
//! process name.

use std::{collections::HashSet, sync::Mutex};

use anyhow::Result;
use sysinfo::{ProcessRefreshKind, ProcessesToUpdate, System};

use super::{filters::clean_snapshot, ForegroundCache, WindowInfo, WindowSource};

/// One row of the process table, reduced to what the pseudo-window needs.
#[derive(Debug, Clone)]
pub(crate) struct ProcessEntry {
    pub pid: u32,
    pub name: String,
    pub exe: Option<String>,
    /// Linux lists threads next to processes.
    pub is_thread: bool,
}

/// Threads and pathless processes are dropped. Processes sharing both
/// executable and name collapse into the lowest pid, so forked workers show
/// once while different games behind one loader binary stay apart.
pub(crate) fn pseudo_windows(mut entries: Vec<ProcessEntry>) -> Vec<WindowInfo> {
    entries.sort_by_key(|entry| entry.pid);

    let mut seen = HashSet::new();
    let mut windows = Vec::new();
    for entry in entries {
        if entry.is_thread {
            continue;
        }
        let Some(executable_path) = entry.exe.filter(|exe| !exe.is_empty()) else {
            continue;
        };
        if !seen.insert((executable_path.clone(), entry.name.clone())) {
            continue;
        }

        windows.push(WindowInfo {
            process_id: entry.pid,
            title: entry.name.clone(),
            process_name: entry.name,
            executable_path,
            is_foreground: false,
        });
    }
    windows
}

pub struct ProcessWindowSource {
    system: Mutex<System>,
    foreground: ForegroundCache,
}

impl ProcessWindowSource {
    pub fn new() -> Self {
        Self {
            system: Mutex::new(System::new()),
            foreground: ForegroundCache::default(),
        }
    }
}

impl Default for ProcessWindowSource {
    fn default() -> Self {
        Self::new()
    }
}

impl WindowSource for ProcessWindowSource {
    fn list_running_windows(&self) -> Result<Vec<WindowInfo>> {
        let mut system = self.system.lock().unwrap_or_else(|p| p.into_inner());
        system.refresh_processes_specifics(ProcessesToUpdate::All, ProcessRefreshKind::everything());

        let own_pid = std::process::id();
        let entries = system
            .processes()
            .iter()
            .filter(|(pid, _)| pid.as_u32() != own_pid)
            .map(|(pid, process)| ProcessEntry {
                pid: pid.as_u32(),
                name: process.name().to_string_lossy().to_string(),
                exe: process.exe().map(|path| path.to_string_lossy().to_string()),
                is_thread: process.thread_kind().is_some(),
            })
            .collect();

        Ok(clean_snapshot(pseudo_windows(entries)))
    }

    fn cache_foreground_window(&self) {
        // No foreground notion in a process table; keep whatever was cached.
    }

    fn last_foreground_window(&self) -> Option<WindowInfo> {
        self.foreground.get()
    }

    fn clear_foreground_window(&self) {
        self.foreground.clear();
    }
}
