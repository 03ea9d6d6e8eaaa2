/// Trimmed, lowercased, `/` unified to `\`.
pub fn normalize_path(path: &str) -> String {
    path.trim().to_lowercase().replace('/', "\\")
}

/// Lowercased base file name without a trailing `.exe`. Falls back to the
/// process name when the path is empty.
pub fn exe_stem(executable_path: &str, process_name: &str) -> String {
    let normalized = normalize_path(executable_path);
    let source = if normalized.is_empty() {
        process_name.trim().to_lowercase()
    } else {
        normalized
    };

    let base = source.rsplit(['\\', '/']).next().unwrap_or(&source);
    base.strip_suffix(".exe").unwrap_or(base).to_string()
}

/// Lowercased process file name without a trailing `.exe`.
pub fn process_stem(process_name: &str) -> String {
    exe_stem("", process_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_path() {
        assert_eq!(
            normalize_path("  C:/Games/EldenRing/ELDENRING.exe "),
            "c:\\games\\eldenring\\eldenring.exe"
        );
        assert_eq!(normalize_path("   "), "");
    }

    #[test]
    fn test_exe_stem() {
        assert_eq!(exe_stem("D:\\Steam\\Hades\\Hades.exe", ""), "hades");
        assert_eq!(exe_stem("/opt/games/Celeste", "ignored"), "celeste");
        assert_eq!(exe_stem("", "Balatro.exe"), "balatro");
        assert_eq!(exe_stem("", ""), "");
        assert_eq!(process_stem("EldenRing.exe"), "eldenring");
    }
}
