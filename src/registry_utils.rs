/// Child path under `parent`; the hive root is the empty path.
pub fn join_path(parent: &str, child: &str) -> String {
    if parent.is_empty() {
        child.to_string()
    } else {
        format!("{}\\{}", parent, child)
    }
}

/// Splits `path` into its parent path and leaf name.
pub fn split_parent(path: &str) -> (&str, &str) {
    path.rsplit_once('\\').unwrap_or(("", path))
}

pub fn path_segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('\\').filter(|s| !s.is_empty())
}

/// Trims stray separators so `\Software\App\` and `Software\App` address the same key.
pub fn normalize_path(path: &str) -> String {
    path_segments(path).collect::<Vec<_>>().join("\\")
}

/// Interprets an interactive answer; anything but an explicit yes is a no.
pub fn is_affirmative(answer: &str) -> bool {
    matches!(
        answer.trim().to_ascii_lowercase().as_str(),
        "1" | "y" | "yes" | "true"
    )
}
