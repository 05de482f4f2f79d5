use crate::util::patterns::Pattern;
use lazy_static::lazy_static;
use std::borrow::Cow;

lazy_static! {
    /// A named entity, or a decimal or hexadecimal numeric character reference.
    pub(crate) static ref ENTITY: Pattern = Pattern::new(r"^&(?:\w{1,32}|#[0-9]{1,7}|#[xX][0-9A-Fa-f]{1,6});");
}

/// Decodes a single `&...;` reference.
///
/// Numeric references to invalid code points (zero, surrogates, or out of range) decode to U+FFFD. Unknown named
/// entities are returned as-is.
pub(crate) fn decode_entity(entity: &str) -> Cow<str> {
    let Some(body) = entity.strip_prefix('&').and_then(|s| s.strip_suffix(';')) else {
        return Cow::Borrowed(entity);
    };
    if let Some(numeric) = body.strip_prefix('#') {
        let code = match numeric.strip_prefix(|c: char| c == 'x' || c == 'X') {
            Some(hex) => u32::from_str_radix(hex, 16),
            None => numeric.parse::<u32>(),
        };
        let ch = code
            .ok()
            .filter(|&c| c != 0)
            .and_then(char::from_u32)
            .unwrap_or(char::REPLACEMENT_CHARACTER);
        return Cow::Owned(ch.to_string());
    }
    let decoded = html_escape::decode_html_entities(entity);
    if decoded == entity {
        Cow::Borrowed(entity)
    } else {
        Cow::Owned(decoded.into_owned())
    }
}

/// Decodes every entity and numeric character reference in `text`.
pub(crate) fn decode_entities(text: &str) -> Cow<str> {
    let bytes = text.as_bytes();
    let Some(first) = memchr::memchr(b'&', bytes) else {
        return Cow::Borrowed(text);
    };
    let mut result = String::with_capacity(text.len());
    result.push_str(&text[..first]);
    let mut pos = first;
    while pos < text.len() {
        // `pos` is always at an '&' here
        let rest = &text[pos..];
        match ENTITY.match_len(rest) {
            Some(len) => {
                result.push_str(&decode_entity(&rest[..len]));
                pos += len;
            }
            None => {
                result.push('&');
                pos += 1;
            }
        }
        let next = memchr::memchr(b'&', &bytes[pos..]).map_or(text.len(), |i| pos + i);
        result.push_str(&text[pos..next]);
        pos = next;
    }
    Cow::Owned(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn named() {
        assert_eq!(decode_entity("&amp;"), "&");
        assert_eq!(decode_entity("&copy;"), "©");
        assert_eq!(decode_entity("&nosuchentity;"), "&nosuchentity;");
    }

    #[test]
    fn numeric() {
        assert_eq!(decode_entity("&#35;"), "#");
        assert_eq!(decode_entity("&#X22;"), "\"");
        assert_eq!(decode_entity("&#xcab;"), "\u{cab}");
        assert_eq!(decode_entity("&#0;"), "\u{fffd}");
        assert_eq!(decode_entity("&#xD800;"), "\u{fffd}");
        assert_eq!(decode_entity("&#9999999;"), "\u{fffd}");
    }

    #[test]
    fn numeric_digit_limits() {
        assert_eq!(decode_entities("&#9999999; &#x10FFFF;"), "\u{fffd} \u{10ffff}");
        assert_eq!(decode_entities("&#87654321;"), "&#87654321;");
        assert_eq!(decode_entities("&#xabcdef0;"), "&#xabcdef0;");
        assert!(!ENTITY.is_match("&#12345678;"));
    }

    #[test]
    fn in_text() {
        assert_eq!(decode_entities("a &amp; b &#35; &bogus; &"), "a & b # &bogus; &");
        assert_eq!(decode_entities("no entities"), "no entities");
    }
}
