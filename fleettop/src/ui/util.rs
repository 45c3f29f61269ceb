//! Small UI helpers: width-aware truncation and wrapping.

/// Shortens to at most `max` chars, keeping both ends (hostnames differ at
/// either end).
pub fn truncate_middle(s: &str, max: usize) -> String {
    let len = s.chars().count();
    if len <= max { return s.to_string(); }
    if max <= 3 { return ".".repeat(max); }
    let keep = max - 3;
    let left = keep / 2;
    let right = keep - left;
    let head: String = s.chars().take(left).collect();
    let tail: String = s.chars().skip(len - right).collect();
    format!("{head}...{tail}")
}

/// Hard-wraps on char boundaries; good enough for one-line error banners.
pub fn wrap_chars(s: &str, width: usize) -> Vec<String> {
    if width == 0 { return Vec::new(); }
    let chars: Vec<char> = s.chars().collect();
    if chars.is_empty() { return vec![String::new()]; }
    chars.chunks(width).map(|c| c.iter().collect()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncation_keeps_ends() {
        assert_eq!(truncate_middle("jira-app-01.example.net", 12), "jira...e.net");
        assert_eq!(truncate_middle("short", 12), "short");
        assert_eq!(truncate_middle("anything", 2), "..");
    }

    #[test]
    fn wraps_by_width() {
        assert_eq!(wrap_chars("abcdef", 4), vec!["abcd".to_string(), "ef".to_string()]);
        assert_eq!(wrap_chars("", 4), vec![String::new()]);
    }
}
