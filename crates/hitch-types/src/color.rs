//! RGB colors for output overrides.

use std::fmt;

/// An opaque 24-bit color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

/// Parse a `#RRGGBB` hex color (case-insensitive).
pub fn parse_hex_color(s: &str) -> Option<Rgb> {
    let s = s.strip_prefix('#')?;
    if s.len() != 6 || !s.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    let r = u8::from_str_radix(&s[0..2], 16).ok()?;
    let g = u8::from_str_radix(&s[2..4], 16).ok()?;
    let b = u8::from_str_radix(&s[4..6], 16).ok()?;
    Some(Rgb::new(r, g, b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_hex_colors() {
        assert_eq!(parse_hex_color("#FF0000"), Some(Rgb::new(255, 0, 0)));
        assert_eq!(parse_hex_color("#00ff7f"), Some(Rgb::new(0, 255, 127)));
    }

    #[test]
    fn rejects_malformed() {
        assert_eq!(parse_hex_color("FF0000"), None);
        assert_eq!(parse_hex_color("#FF00"), None);
        assert_eq!(parse_hex_color("#GG0000"), None);
        assert_eq!(parse_hex_color("#ÿÿÿ"), None);
    }

    #[test]
    fn display_round_trips() {
        let c = Rgb::new(29, 233, 182);
        assert_eq!(c.to_string(), "#1DE9B6");
        assert_eq!(parse_hex_color(&c.to_string()), Some(c));
    }
}
