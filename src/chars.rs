//! Character classes shared by the scanner and the emitter.
//!
//! The reader appends a `'\0'` sentinel once the stream is exhausted, so the
//! end of input is an ordinary character here.

pub(crate) const SENTINEL: char = '\0';

/// Anchor and alias names: alphanumeric plus `_` and `-`.
pub(crate) fn is_anchor_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '_' || ch == '-'
}

pub(crate) fn is_z(ch: char) -> bool {
    ch == SENTINEL
}

pub(crate) fn is_space(ch: char) -> bool {
    ch == ' '
}

pub(crate) fn is_tab(ch: char) -> bool {
    ch == '\t'
}

pub(crate) fn is_blank(ch: char) -> bool {
    is_space(ch) || is_tab(ch)
}

pub(crate) fn is_break(ch: char) -> bool {
    matches!(ch, '\r' | '\n' | '\u{0085}' | '\u{2028}' | '\u{2029}')
}

pub(crate) fn is_breakz(ch: char) -> bool {
    is_break(ch) || is_z(ch)
}

pub(crate) fn is_blankz(ch: char) -> bool {
    is_blank(ch) || is_breakz(ch)
}

/// The YAML 1.1 printable subset enforced by the reader.
pub(crate) fn is_printable(ch: char) -> bool {
    matches!(ch,
        '\t' | '\n' | '\r' | '\u{0085}'
        | '\u{0020}'..='\u{007E}'
        | '\u{00A0}'..='\u{D7FF}'
        | '\u{E000}'..='\u{FFFD}')
}

/// Characters that may appear unescaped in emitted tag URIs.
pub(crate) fn is_uri_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric()
        || matches!(
            ch,
            '-' | ';'
                | '/'
                | '?'
                | ':'
                | '@'
                | '&'
                | '='
                | '+'
                | '$'
                | ','
                | '_'
                | '.'
                | '!'
                | '~'
                | '*'
                | '\''
                | '('
                | ')'
                | '['
                | ']'
                | '%'
        )
}

/// Flow indicators terminate plain scalars inside flow collections.
pub(crate) fn is_flow_indicator(ch: char) -> bool {
    matches!(ch, ',' | '[' | ']' | '{' | '}')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn breaks() {
        assert!(is_break('\n'));
        assert!(is_break('\u{2028}'));
        assert!(!is_break(' '));
        assert!(is_breakz(SENTINEL));
        assert!(!is_blank(SENTINEL));
    }

    #[test]
    fn printable_bounds() {
        assert!(is_printable('\t'));
        assert!(is_printable('~'));
        assert!(is_printable('\u{D7FF}'));
        assert!(!is_printable('\u{0007}'));
        assert!(!is_printable('\u{FFFE}'));
        // Astral characters are outside the YAML 1.1 printable subset.
        assert!(!is_printable('\u{1F600}'));
    }
}
