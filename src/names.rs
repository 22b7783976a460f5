//! Name sanitization for file and directory names.
//!
//! Two flavours exist: [`sanitize_name`] is the strict, cross-platform
//! sanitizer used for build output names, while [`path_segment`] is the
//! lenient one used for the per-object files written by `split`.

use once_cell::sync::Lazy;
use regex::Regex;
use unicode_normalization::UnicodeNormalization;

/// Maximum length (in characters) of a sanitized name.
pub const MAX_NAME_LEN: usize = 50;

static CONTROL_CHARS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\x00-\x1F\x7F]").unwrap());

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

static DISALLOWED: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\p{L}\p{N}_\-.]").unwrap());

static REPEATED_UNDERSCORES: Lazy<Regex> = Lazy::new(|| Regex::new(r"_+").unwrap());

static REPEATED_DOTS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\.{2,}").unwrap());

static RESERVED_DEVICE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(con|prn|aux|nul|com[1-9]|lpt[1-9])$").unwrap());

/// Sanitizes `input` into a file-name-safe string.
///
/// Never fails: when nothing usable is left, `fallback` is returned.
pub fn sanitize_name(input: &str, fallback: &str) -> String {
    let normalized: String = input.nfc().collect();
    let s = CONTROL_CHARS.replace_all(&normalized, "");
    let s = WHITESPACE.replace_all(&s, "_");
    let s = DISALLOWED.replace_all(&s, "_");
    let s = REPEATED_UNDERSCORES.replace_all(&s, "_");
    let s = REPEATED_DOTS.replace_all(&s, ".");

    let trimmed = s.trim_matches(|c: char| c.is_whitespace() || c == '.' || c == '_');

    let mut out = if trimmed.is_empty() || trimmed == "." || trimmed == ".." {
        fallback.to_string()
    } else {
        trimmed.to_string()
    };

    if RESERVED_DEVICE.is_match(&out) {
        out.insert(0, '_');
    }

    let out = truncate_chars(&out, MAX_NAME_LEN);
    if out.is_empty() {
        fallback.to_string()
    } else {
        out
    }
}

/// Lenient sanitizer for a single path segment.
///
/// Replaces anything outside letters, digits, `_`, `-` and `.` with `_` and
/// truncates. Absent or empty input becomes `unnamed`.
pub fn path_segment(input: Option<&str>) -> String {
    let raw = match input {
        Some(s) if !s.is_empty() => s,
        _ => "unnamed",
    };
    truncate_chars(&DISALLOWED.replace_all(raw, "_"), MAX_NAME_LEN)
}

/// Formats a zero-based sibling index as a 1-based, zero-padded file prefix.
pub fn pad_index(index: usize) -> String {
    format!("{:03}", index + 1)
}

fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_clean(s: &str) -> bool {
        s.chars()
            .all(|c| c.is_alphanumeric() || c == '_' || c == '-' || c == '.')
    }

    #[test]
    fn test_sanitize_path_separators() {
        let out = sanitize_name("My/Cool:Card*2", "fallback");
        assert_eq!(out, "My_Cool_Card_2");
        assert!(is_clean(&out));
        assert!(!out.contains('/'));
        assert!(out.chars().count() <= MAX_NAME_LEN);
    }

    #[test]
    fn test_sanitize_fallback() {
        assert_eq!(sanitize_name("", "TTS_Save"), "TTS_Save");
        assert_eq!(sanitize_name("..", "TTS_Save"), "TTS_Save");
        assert_eq!(sanitize_name(".", "TTS_Save"), "TTS_Save");
        assert_eq!(sanitize_name("  __ ", "dev"), "dev");
    }

    #[test]
    fn test_sanitize_reserved_names() {
        assert_eq!(sanitize_name("con", "x"), "_con");
        assert_eq!(sanitize_name("LPT1", "x"), "_LPT1");
        assert_eq!(sanitize_name("console", "x"), "console");
    }

    #[test]
    fn test_sanitize_collapses_runs() {
        assert_eq!(sanitize_name("a   b", "x"), "a_b");
        assert_eq!(sanitize_name("a__**b", "x"), "a_b");
        assert_eq!(sanitize_name("v1...2", "x"), "v1.2");
        assert_eq!(sanitize_name("__lead.trail._", "x"), "lead.trail");
    }

    #[test]
    fn test_sanitize_control_chars_and_unicode() {
        assert_eq!(sanitize_name("a\u{0007}b", "x"), "ab");
        assert_eq!(sanitize_name("Überkarte", "x"), "Überkarte");
        // Decomposed u + combining diaeresis composes to a single letter.
        assert_eq!(sanitize_name("U\u{0308}ber", "x"), "Über");
    }

    #[test]
    fn test_sanitize_truncates() {
        let long = "a".repeat(80);
        assert_eq!(sanitize_name(&long, "x").len(), MAX_NAME_LEN);
    }

    #[test]
    fn test_path_segment() {
        assert_eq!(path_segment(Some("Deck of Cards")), "Deck_of_Cards");
        assert_eq!(path_segment(None), "unnamed");
        assert_eq!(path_segment(Some("")), "unnamed");
        assert_eq!(path_segment(Some("a/b")), "a_b");
        assert_eq!(path_segment(Some(&"x".repeat(60))).len(), MAX_NAME_LEN);
    }

    #[test]
    fn test_pad_index() {
        assert_eq!(pad_index(0), "001");
        assert_eq!(pad_index(41), "042");
        assert_eq!(pad_index(1234), "1235");
    }
}
