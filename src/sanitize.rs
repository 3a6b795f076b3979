//! Character-level sanitization for model output and user input.
//!
//! Model runtimes can emit terminal escapes (spinners, colors) and stray
//! control bytes. None of that may reach a report, a terminal or the audit log.

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::Regex;

/// ANSI CSI sequences (`ESC [ ... final`) and OSC sequences (`ESC ] ... BEL|ST`).
static ANSI_ESCAPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\x1b\[[0-?]*[ -/]*[@-~]|\x1b\][^\x07\x1b]*(?:\x07|\x1b\\)|\x1b[@-_]")
        .expect("ansi escape pattern should compile")
});

/// Unicode bidirectional embedding, override and isolate characters.
fn is_bidi_control(c: char) -> bool {
    matches!(c, '\u{202A}'..='\u{202E}' | '\u{2066}'..='\u{2069}' | '\u{200E}' | '\u{200F}')
}

/// Characters that must never survive sanitization.
pub fn is_forbidden(c: char) -> bool {
    (c.is_control() && c != '\n' && c != '\t') || is_bidi_control(c)
}

/// Check whether a string contains no forbidden characters.
pub fn is_clean(s: &str) -> bool {
    !s.chars().any(is_forbidden)
}

/// Strip control characters, normalizing line endings to `\n`.
fn strip_controls(s: &str) -> String {
    let normalized = s.replace("\r\n", "\n").replace('\r', "\n");
    normalized.chars().filter(|c| !is_forbidden(*c)).collect()
}

/// Sanitize text produced by the model or an external API.
///
/// Escape sequences are removed as a whole first so their printable tails
/// (`[31m`) do not leak into the result.
pub fn sanitize_output(s: &str) -> String {
    let without_escapes: Cow<'_, str> = ANSI_ESCAPE.replace_all(s, "");
    strip_controls(&without_escapes)
}

/// Sanitize document text before it is analyzed.
pub fn sanitize_input(s: &str) -> String {
    strip_controls(s)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_ansi_sequences() {
        let raw = "\x1b[?25l\x1b[2K\x1b[1GThe case \x1b[31mdoes not\x1b[0m exist";
        assert_eq!(sanitize_output(raw), "The case does not exist");
    }

    #[test]
    fn test_strips_osc_sequence() {
        let raw = "\x1b]0;title\x07body";
        assert_eq!(sanitize_output(raw), "body");
    }

    #[test]
    fn test_keeps_newlines_and_tabs() {
        let raw = "line one\r\nline\ttwo\rline three";
        assert_eq!(sanitize_output(raw), "line one\nline\ttwo\nline three");
    }

    #[test]
    fn test_removes_control_and_bidi_characters() {
        let raw = "a\u{0000}b\u{0007}c\u{007f}d\u{0085}e\u{202E}f\u{2066}g";
        let clean = sanitize_output(raw);
        assert_eq!(clean, "abcdefg");
        assert!(is_clean(&clean));
    }

    #[test]
    fn test_is_clean() {
        assert!(is_clean("Brown v. Board of Education\n\t347 U.S. 483"));
        assert!(!is_clean("bell\u{0007}"));
        assert!(!is_clean("\x1b[0m"));
    }

    #[test]
    fn test_preserves_unicode_text() {
        let raw = "Señor v. Müller — § 1983 “claims”";
        assert_eq!(sanitize_output(raw), raw);
        assert_eq!(sanitize_input(raw), raw);
    }
}
