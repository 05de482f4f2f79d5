use fancy_regex::{Captures, Regex};
use lazy_static::lazy_static;

/// Backslash followed by any ASCII punctuation character.
pub(crate) const ESCAPED_CHAR: &str = r##"\\[!"#$%&'()*+,./:;<=>?@\[\\\]^_`{|}~-]"##;

const TAG_NAME: &str = r"[a-zA-Z][a-zA-Z0-9-]*";
const ATTRIBUTE_NAME: &str = r"[a-zA-Z_:][a-zA-Z0-9_.:-]*";
const UNQUOTED_VALUE: &str = r#"[^\s"'=<>`]+"#;
const SINGLE_QUOTED_VALUE: &str = r"'[^']*'";
const DOUBLE_QUOTED_VALUE: &str = r#""[^"]*""#;

lazy_static! {
    /// An HTML open tag, such as `<a href="x">` or `<br/>`.
    pub(crate) static ref OPEN_TAG: String = {
        let value = format!("(?:{UNQUOTED_VALUE}|{SINGLE_QUOTED_VALUE}|{DOUBLE_QUOTED_VALUE})");
        let attribute = format!(r"(?:\s+{ATTRIBUTE_NAME}(?:\s*=\s*{value})?)");
        format!(r"<{TAG_NAME}{attribute}*\s*/?>")
    };

    /// An HTML closing tag, such as `</a>`.
    pub(crate) static ref CLOSE_TAG: String = format!(r"</{TAG_NAME}\s*>");

    static ref UNICODE_PUNCTUATION: Pattern = Pattern::new(r"^\p{P}");
}

/// A compiled regular expression.
///
/// Engine failures (like hitting the backtracking limit) are reported as "no match".
#[derive(Debug, Clone)]
pub struct Pattern(Regex);

impl Pattern {
    /// Compiles a pattern.
    ///
    /// Patterns are fixed strings in code, so an invalid one is a bug: this panics.
    pub fn new(re: &str) -> Self {
        Self(Regex::new(re).expect("internal error: invalid pattern"))
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.0.is_match(text).unwrap_or(false)
    }

    pub fn captures<'t>(&self, text: &'t str) -> Option<Captures<'t>> {
        self.0.captures(text).ok().flatten()
    }

    /// The end (in bytes) of this pattern's leftmost match in `text`. For a pattern anchored with `^`, that's the
    /// match's length.
    pub fn match_len(&self, text: &str) -> Option<usize> {
        self.0.find(text).ok().flatten().map(|m| m.end())
    }
}

/// Whether the char counts as punctuation for delimiter-run flanking.
pub(crate) fn is_punctuation(ch: char) -> bool {
    if ch.is_ascii() {
        return ch.is_ascii_punctuation();
    }
    let mut buf = [0u8; 4];
    UNICODE_PUNCTUATION.is_match(ch.encode_utf8(&mut buf))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escaped_char() {
        let pattern = Pattern::new(&format!("^{ESCAPED_CHAR}"));
        assert!(pattern.is_match(r"\*"));
        assert!(pattern.is_match(r"\\"));
        assert!(pattern.is_match(r"\]"));
        assert!(!pattern.is_match(r"\a"));
        assert!(!pattern.is_match(r"\ "));
    }

    #[test]
    fn tags() {
        let open = Pattern::new(&format!("^{}$", *OPEN_TAG));
        assert!(open.is_match("<a>"));
        assert!(open.is_match(r#"<a href="x" title='y' data-z=1>"#));
        assert!(open.is_match("<br/>"));
        assert!(!open.is_match("<33>"));
        assert!(!open.is_match("<a h*#ref=\"hi\">"));

        let close = Pattern::new(&format!("^{}$", *CLOSE_TAG));
        assert!(close.is_match("</div >"));
        assert!(!close.is_match("</div foo>"));
    }

    #[test]
    fn punctuation() {
        assert!(is_punctuation('*'));
        assert!(is_punctuation('$'));
        assert!(is_punctuation('¡'));
        assert!(is_punctuation('。'));
        assert!(!is_punctuation('a'));
        assert!(!is_punctuation(' '));
        assert!(!is_punctuation('€'));
    }

    #[test]
    fn match_len() {
        let pattern = Pattern::new("^a+");
        assert_eq!(pattern.match_len("aaab"), Some(3));
        assert_eq!(pattern.match_len("baa"), None);
    }
}
