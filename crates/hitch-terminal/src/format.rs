//! Placeholder formats used for alias echo and launch history lines.

use std::sync::LazyLock;

use hitch_platform::AppInfo;
use regex::{Captures, Regex};

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"%([A-Za-z])").expect("valid regex"));

/// Replace `%x` placeholders in `format` (case-insensitive).
///
/// `%n` is always a newline. Unknown placeholders are left as written.
/// Substituted text is never rescanned.
pub fn expand_placeholders(format: &str, values: &[(char, &str)]) -> String {
    PLACEHOLDER
        .replace_all(format, |caps: &Captures<'_>| {
            let key = caps[1]
                .chars()
                .next()
                .map(|c| c.to_ascii_lowercase())
                .unwrap_or_default();
            if key == 'n' {
                return "\n".to_string();
            }
            values
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| (*v).to_string())
                .unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

/// Launch history line: `%l` label, `%p` identifier.
pub fn launch_line(format: &str, app: &AppInfo) -> String {
    expand_placeholders(format, &[('l', &app.label), ('p', &app.identifier)])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholders_are_case_insensitive() {
        let out = expand_placeholders("%A=%v%N", &[('a', "ll"), ('v', "ls -la")]);
        assert_eq!(out, "ll=ls -la\n");
    }

    #[test]
    fn unknown_placeholder_kept() {
        assert_eq!(expand_placeholders("%q %a", &[('a', "x")]), "%q x");
    }

    #[test]
    fn substituted_text_not_rescanned() {
        assert_eq!(expand_placeholders("%a", &[('a', "%a%n")]), "%a%n");
    }

    #[test]
    fn launch_line_fields() {
        let app = AppInfo {
            label: "Clock".to_string(),
            identifier: "org.clock".to_string(),
            launch_count: 0,
            last_update_ms: 0,
        };
        assert_eq!(launch_line("--> %l (%p)", &app), "--> Clock (org.clock)");
    }
}
