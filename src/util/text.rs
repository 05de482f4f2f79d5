use crate::util::patterns::Pattern;
use std::borrow::Cow;

const TAB_STOP: usize = 4;

/// Expands tabs in a line's leading whitespace, including whitespace around any container markers.
///
/// `markers` are regex fragments for the container markers (`>`, list bullets, ...) that may precede the content,
/// outermost first. Tabs are expanded to a 4-column tab stop measured from the start of the line.
pub(crate) fn expand_leading_tabs<'a>(line: &'a str, markers: &[&str]) -> Cow<'a, str> {
    if memchr::memchr(b'\t', line.as_bytes()).is_none() {
        return Cow::Borrowed(line);
    }
    let mut prefix_re = String::from(r"^\s*");
    prefix_re.push_str(&markers.join(r"\s*"));
    prefix_re.push_str(r"\s*");
    let Some(prefix_len) = Pattern::new(&prefix_re).match_len(line) else {
        return Cow::Borrowed(line);
    };
    let (prefix, rest) = line.split_at(prefix_len);
    if !prefix.contains('\t') {
        return Cow::Borrowed(line);
    }
    let mut expanded = String::with_capacity(line.len() + TAB_STOP * 2);
    let mut column = 0;
    for ch in prefix.chars() {
        match ch {
            '\t' => {
                let spaces = TAB_STOP - (column % TAB_STOP);
                expanded.extend(std::iter::repeat(' ').take(spaces));
                column += spaces;
            }
            '\n' | '\r' => {
                expanded.push(ch);
                column = 0;
            }
            _ => {
                expanded.push(ch);
                column += 1;
            }
        }
    }
    expanded.push_str(rest);
    Cow::Owned(expanded)
}

/// Removes backslashes that escape ASCII punctuation.
pub(crate) fn unescape(text: &str) -> Cow<str> {
    if memchr::memchr(b'\\', text.as_bytes()).is_none() {
        return Cow::Borrowed(text);
    }
    let mut result = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch == '\\' {
            if let Some(&next) = chars.peek() {
                if next.is_ascii_punctuation() {
                    result.push(next);
                    chars.next();
                    continue;
                }
            }
        }
        result.push(ch);
    }
    Cow::Owned(result)
}

/// Collapses each run of whitespace into a single space, and trims both ends.
pub(crate) fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Normalizes a link label for matching: whitespace is collapsed, and the text is case-folded.
pub(crate) fn normalize_label(label: &str) -> String {
    collapse_whitespace(label).to_lowercase().replace('ß', "ss")
}

pub(crate) fn is_blank(line: &str) -> bool {
    line.trim().is_empty()
}

/// Drops the first `count` chars of `text`, or everything if it is shorter than that.
pub(crate) fn drop_chars(text: &str, count: usize) -> &str {
    match text.char_indices().nth(count) {
        Some((idx, _)) => &text[idx..],
        None => "",
    }
}

/// Collapses a run of trailing newlines into one.
pub(crate) fn collapse_trailing_newlines(text: &mut String) {
    if !text.ends_with('\n') {
        return;
    }
    let trimmed_len = text.trim_end_matches('\n').len();
    text.truncate(trimmed_len);
    text.push('\n');
}
