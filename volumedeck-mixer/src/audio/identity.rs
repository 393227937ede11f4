//! Executable identity helpers.

/// Name reported for the session that has no owning process.
pub const SYSTEM_EXECUTABLE_NAME: &str = "system";

/// Lowercase basename of a path or bare file name.
///
/// Both `/` and `\` are treated as separators, so
/// `C:\Apps\Chrome.EXE` and `chrome.exe` produce the same name.
pub fn basename_lower(path_or_name: &str) -> String {
    let base = path_or_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(path_or_name);
    base.to_lowercase()
}

/// Display name for a session's owning executable.
///
/// Falls back to `system` for pid 0 and to `pid_<n>` when the path could
/// not be resolved.
pub fn executable_name(pid: u32, executable_path: &str) -> String {
    if !executable_path.is_empty() {
        let name = basename_lower(executable_path);
        if !name.is_empty() {
            return name;
        }
    }

    if pid == 0 {
        SYSTEM_EXECUTABLE_NAME.to_string()
    } else {
        format!("pid_{}", pid)
    }
}

/// True if two executable names refer to the same basename.
pub fn same_executable(a: &str, b: &str) -> bool {
    basename_lower(a) == basename_lower(b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basename_normalizes_separators_and_case() {
        assert_eq!(basename_lower(r"C:\Apps\Chrome.EXE"), "chrome.exe");
        assert_eq!(basename_lower("C:/Apps/Chrome.EXE"), "chrome.exe");
        assert_eq!(basename_lower(r"C:\Apps/mixed\Spotify.exe"), "spotify.exe");
        assert_eq!(basename_lower("chrome.exe"), "chrome.exe");
        assert_eq!(basename_lower(""), "");
    }

    #[test]
    fn executable_name_fallbacks() {
        assert_eq!(executable_name(0, ""), "system");
        assert_eq!(executable_name(1234, ""), "pid_1234");
        assert_eq!(
            executable_name(1234, r"C:\Program Files\Discord\Discord.exe"),
            "discord.exe"
        );
        // A path ending in a separator has no usable basename
        assert_eq!(executable_name(77, r"C:\broken\"), "pid_77");
    }

    #[test]
    fn same_executable_ignores_path_and_case() {
        assert!(same_executable(r"C:\Apps\Chrome.EXE", "chrome.exe"));
        assert!(!same_executable("chrome.exe", "firefox.exe"));
    }
}
