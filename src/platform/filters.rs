//! Snapshot hygiene shared by every window source: drop our own windows and
//! well-known non-game processes, dedupe, and order foreground first.

use std::collections::HashSet;

use super::WindowInfo;

const OWN_MARKERS: &[&str] = &["gamevault"];

/// Shells, browsers, editors, chat and media apps, OS services, vendor
/// utilities and installers. Compared against the lowercased file name.
const BLACKLISTED_PROCESSES: &[&str] = &[
    // shells and terminals
    "cmd.exe", "powershell.exe", "pwsh.exe", "conhost.exe", "windowsterminal.exe", "wt.exe",
    "mintty.exe", "bash", "zsh", "fish", "sh", "bash.exe", "gnome-terminal-server", "konsole",
    "alacritty", "kitty", "wezterm-gui", "terminal",
    // runtimes and dev tools
    "python.exe", "pythonw.exe", "py.exe", "python3", "node.exe", "node", "bun", "deno",
    "git.exe", "ssh.exe", "cargo.exe", "cargo", "rustc", "java.exe", "dotnet.exe", "docker.exe",
    "wsl.exe",
    // editors and IDEs
    "code.exe", "code", "devenv.exe", "rider64.exe", "idea64.exe", "sublime_text.exe",
    "notepad.exe", "notepad++.exe", "zed.exe", "zed", "vim", "nvim", "emacs",
    // browsers
    "chrome.exe", "chrome", "firefox.exe", "firefox", "msedge.exe", "opera.exe", "brave.exe",
    "vivaldi.exe", "chromium", "safari",
    // communication and media
    "discord.exe", "discord", "slack.exe", "slack", "teams.exe", "zoom.exe", "telegram.exe",
    "spotify.exe", "spotify", "vlc.exe", "vlc", "mpv.exe", "mpv",
    // operating system
    "explorer.exe", "taskmgr.exe", "systemsettings.exe", "searchhost.exe",
    "startmenuexperiencehost.exe", "shellexperiencehost.exe", "applicationframehost.exe",
    "textinputhost.exe", "runtimebroker.exe", "svchost.exe", "csrss.exe", "dwm.exe",
    "lsass.exe", "winlogon.exe", "services.exe", "sihost.exe", "ctfmon.exe", "dllhost.exe",
    "systemd", "dbus-daemon", "gnome-shell", "plasmashell", "xorg", "xwayland", "pipewire",
    "pulseaudio", "finder", "dock", "windowserver",
    // vendor utilities
    "armourycrate.exe", "lghub.exe", "icue.exe", "razersynapse.exe", "nvcontainer.exe",
    "amdrsserv.exe", "msmpeng.exe",
    // installers
    "msiexec.exe", "setup.exe", "installer.exe",
];

/// Executables under these directories are never games. Separators are
/// normalized to `\` before comparing.
const BLACKLISTED_DIRS: &[&str] = &[
    "\\windows\\system32\\",
    "\\windows\\syswow64\\",
    "\\windowsapps\\",
    "\\microsoft vs code\\",
    "\\usr\\libexec\\",
    "\\usr\\lib\\systemd\\",
    "\\usr\\sbin\\",
    "\\system\\library\\",
];

pub fn looks_like_ours(window: &WindowInfo) -> bool {
    let process_name = window.process_name.to_lowercase();
    let exe_path = window.executable_path.to_lowercase();
    let title = window.title.to_lowercase();

    OWN_MARKERS.iter().any(|marker| {
        process_name.contains(marker) || exe_path.contains(marker) || title.contains(marker)
    })
}

pub fn is_blacklisted(window: &WindowInfo) -> bool {
    let process_name = window.process_name.to_lowercase();
    let file_name = process_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(&process_name);

    if BLACKLISTED_PROCESSES
        .iter()
        .any(|&name| file_name == name || process_name == name)
    {
        return true;
    }

    let exe_path = window.executable_path.to_lowercase().replace('/', "\\");
    BLACKLISTED_DIRS.iter().any(|dir| exe_path.contains(dir))
}

/// Filter, dedupe by (pid, exe, title) and sort: foreground first, then by
/// process name and title.
pub fn clean_snapshot(windows: Vec<WindowInfo>) -> Vec<WindowInfo> {
    let mut seen = HashSet::new();
    let mut items: Vec<WindowInfo> = windows
        .into_iter()
        .filter(|w| !looks_like_ours(w) && !is_blacklisted(w))
        .filter(|w| {
            seen.insert((w.process_id, w.executable_path.clone(), w.title.clone()))
        })
        .collect();

    items.sort_by(|a, b| {
        b.is_foreground
            .cmp(&a.is_foreground)
            .then_with(|| a.process_name.cmp(&b.process_name))
            .then_with(|| a.title.cmp(&b.title))
    });
    items
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window(pid: u32, title: &str, process: &str, exe: &str) -> WindowInfo {
        WindowInfo {
            process_id: pid,
            title: title.into(),
            process_name: process.into(),
            executable_path: exe.into(),
            is_foreground: false,
        }
    }

    #[test]
    fn test_own_and_blacklisted_windows_removed() {
        let windows = vec![
            window(1, "GameVault", "gamevault.exe", "C:\\Apps\\GameVault\\gamevault.exe"),
            window(2, "Discord", "Discord.exe", "C:\\Users\\me\\Discord\\Discord.exe"),
            window(3, "Settings", "foo.exe", "C:\\Windows\\System32\\foo.exe"),
            window(4, "Hades", "Hades.exe", "D:\\Steam\\Hades\\Hades.exe"),
        ];

        let cleaned = clean_snapshot(windows);

        assert_eq!(cleaned.len(), 1);
        assert_eq!(cleaned[0].title, "Hades");
    }

    #[test]
    fn test_unix_system_paths_blacklisted() {
        assert!(is_blacklisted(&window(9, "x", "gvfsd", "/usr/libexec/gvfsd")));
        assert!(!is_blacklisted(&window(
            9,
            "Celeste",
            "Celeste",
            "/home/me/.steam/steamapps/common/Celeste/Celeste"
        )));
    }

    #[test]
    fn test_duplicates_dropped_and_foreground_first() {
        let mut fg = window(7, "Stardew Valley", "Stardew Valley.exe", "D:\\SV\\Stardew Valley.exe");
        fg.is_foreground = true;
        let windows = vec![
            window(5, "Celeste", "Celeste.exe", "D:\\Celeste\\Celeste.exe"),
            window(5, "Celeste", "Celeste.exe", "D:\\Celeste\\Celeste.exe"),
            fg,
            window(6, "Balatro", "Balatro.exe", "D:\\Balatro\\Balatro.exe"),
        ];

        let cleaned = clean_snapshot(windows);

        let titles: Vec<&str> = cleaned.iter().map(|w| w.title.as_str()).collect();
        assert_eq!(titles, ["Stardew Valley", "Balatro", "Celeste"]);
    }
}
