//! Splitting an input line into independently resolved segments.

use std::sync::LazyLock;

use hitch_types::color::{Rgb, parse_hex_color};
use regex::Regex;

static COLOR_MARKUP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(#[0-9a-fA-F]{6})\[(.*)\]$").expect("valid regex"));

/// One sub-command of an input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub text: String,
    /// Display color from `#RRGGBB[...]` markup.
    pub color: Option<Rgb>,
}

/// Split `line` on `separator` (empty means no splitting).
///
/// Each piece is trimmed with internal whitespace runs collapsed, and a
/// whole-segment `#RRGGBB[payload]` wrapper becomes the segment color.
/// Pieces that end up empty are dropped.
pub fn split_segments(line: &str, separator: &str) -> Vec<Segment> {
    let pieces: Vec<&str> = if separator.is_empty() {
        vec![line]
    } else {
        line.split(separator).collect()
    };
    pieces.into_iter().filter_map(parse_segment).collect()
}

fn parse_segment(piece: &str) -> Option<Segment> {
    let text = collapse_whitespace(piece);
    let (text, color) = match COLOR_MARKUP.captures(&text) {
        Some(caps) => (collapse_whitespace(&caps[2]), parse_hex_color(&caps[1])),
        None => (text, None),
    };
    if text.is_empty() {
        return None;
    }
    Some(Segment { text, color })
}

/// Trim and collapse whitespace runs to a single space.
pub fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(segments: &[Segment]) -> Vec<&str> {
        segments.iter().map(|s| s.text.as_str()).collect()
    }

    #[test]
    fn splits_and_normalizes() {
        let segs = split_segments("  ls   -la ;  echo  hi  ", ";");
        assert_eq!(texts(&segs), vec!["ls -la", "echo hi"]);
        assert!(segs.iter().all(|s| s.color.is_none()));
    }

    #[test]
    fn empty_separator_keeps_line_whole() {
        let segs = split_segments("a ; b", "");
        assert_eq!(texts(&segs), vec!["a ; b"]);
    }

    #[test]
    fn empty_segments_are_skipped() {
        let segs = split_segments(";; a ;   ; b;", ";");
        assert_eq!(texts(&segs), vec!["a", "b"]);
    }

    #[test]
    fn multi_char_separator() {
        let segs = split_segments("a && b", "&&");
        assert_eq!(texts(&segs), vec!["a", "b"]);
    }

    #[test]
    fn color_markup_is_stripped() {
        let segs = split_segments("#FF0000[echo  red] ; #00ff00[ls]", ";");
        assert_eq!(texts(&segs), vec!["echo red", "ls"]);
        assert_eq!(segs[0].color, Some(Rgb::new(255, 0, 0)));
        assert_eq!(segs[1].color, Some(Rgb::new(0, 255, 0)));
    }

    #[test]
    fn malformed_markup_is_plain_text() {
        let segs = split_segments("#FF00[x]", ";");
        assert_eq!(segs[0].text, "#FF00[x]");
        assert_eq!(segs[0].color, None);

        let segs = split_segments("say #FF0000[x]", ";");
        assert_eq!(segs[0].color, None);
    }

    #[test]
    fn markup_with_empty_payload_is_dropped() {
        assert!(split_segments("#FFFFFF[  ]", ";").is_empty());
    }
}
