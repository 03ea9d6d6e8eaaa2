//! Top-level window enumeration through the Win32 API.

use std::{collections::HashMap, sync::Mutex};

use anyhow::Result;
use log::debug;
use sysinfo::{Pid, ProcessesToUpdate, System};
use windows_sys::Win32::Foundation::{BOOL, HWND, LPARAM};
use windows_sys::Win32::UI::WindowsAndMessaging::{
    EnumWindows, GetForegroundWindow, GetWindowTextLengthW, GetWindowTextW,
    GetWindowThreadProcessId, IsWindowVisible,
};

use super::{filters::clean_snapshot, ForegroundCache, WindowInfo, WindowSource};

struct EnumContext {
    windows: Vec<(u32, String)>,
}

unsafe extern "system" fn collect_window(hwnd: HWND, lparam: LPARAM) -> BOOL {
    if unsafe { IsWindowVisible(hwnd) } == 0 {
        return 1;
    }

    let length = unsafe { GetWindowTextLengthW(hwnd) };
    if length <= 0 {
        return 1;
    }

    let mut buf = vec![0u16; length as usize + 1];
    let copied = unsafe { GetWindowTextW(hwnd, buf.as_mut_ptr(), length + 1) };
    if copied <= 0 {
        return 1;
    }

    let title = String::from_utf16_lossy(&buf[..copied as usize])
        .trim()
        .to_string();
    if title.is_empty() || title.eq_ignore_ascii_case("program manager") {
        return 1;
    }

    let mut pid: u32 = 0;
    unsafe { GetWindowThreadProcessId(hwnd, &mut pid) };
    if pid == 0 {
        return 1;
    }

    let context = lparam as *mut EnumContext;
    if !context.is_null() {
        unsafe { (*context).windows.push((pid, title)) };
    }
    1
}

fn visible_windows() -> Vec<(u32, String)> {
    let mut context = EnumContext {
        windows: Vec::new(),
    };
    unsafe {
        EnumWindows(
            Some(collect_window),
            &mut context as *mut EnumContext as LPARAM,
        );
    }
    context.windows
}

fn foreground_pid() -> Option<u32> {
    let hwnd = unsafe { GetForegroundWindow() };
    if hwnd.is_null() {
        return None;
    }
    let mut pid: u32 = 0;
    unsafe { GetWindowThreadProcessId(hwnd, &mut pid) };
    (pid != 0).then_some(pid)
}

pub struct WindowsWindowSource {
    system: Mutex<System>,
    foreground: ForegroundCache,
}

impl WindowsWindowSource {
    pub fn new() -> Self {
        Self {
            system: Mutex::new(System::new()),
            foreground: ForegroundCache::default(),
        }
    }
}

impl Default for WindowsWindowSource {
    fn default() -> Self {
        Self::new()
    }
}

impl WindowSource for WindowsWindowSource {
    fn list_running_windows(&self) -> Result<Vec<WindowInfo>> {
        let raw = visible_windows();
        let foreground = foreground_pid();

        let mut system = self.system.lock().unwrap_or_else(|p| p.into_inner());
        system.refresh_processes(ProcessesToUpdate::All);

        let own_pid = std::process::id();
        let mut names: HashMap<u32, (String, String)> = HashMap::new();
        let mut windows = Vec::with_capacity(raw.len());
        for (pid, title) in raw {
            if pid == own_pid {
                continue;
            }
            let (process_name, executable_path) = names
                .entry(pid)
                .or_insert_with(|| match system.process(Pid::from_u32(pid)) {
                    Some(process) => (
                        process.name().to_string_lossy().to_string(),
                        process
                            .exe()
                            .map(|path| path.to_string_lossy().to_string())
                            .unwrap_or_default(),
                    ),
                    None => (String::new(), String::new()),
                })
                .clone();

            windows.push(WindowInfo {
                process_id: pid,
                title,
                process_name,
                executable_path,
                is_foreground: foreground == Some(pid),
            });
        }

        Ok(clean_snapshot(windows))
    }

    fn cache_foreground_window(&self) {
        match self.list_running_windows() {
            Ok(windows) => {
                let current = windows.iter().find(|w| w.is_foreground).cloned();
                if let Some(window) = &current {
                    debug!("Cached foreground window {}", window.key());
                }
                self.foreground.store(current);
            }
            Err(err) => debug!("Foreground snapshot failed: {err:?}"),
        }
    }

    fn last_foreground_window(&self) -> Option<WindowInfo> {
        self.foreground.get()
    }

    fn clear_foreground_window(&self) {
        self.foreground.clear();
    }
}
