/// Characters left as-is when re-encoding a URI (besides ASCII alphanumerics).
const URI_SAFE: &str = ":?#/-._~!$&'()*+,;=@";

/// Normalizes a link destination: percent-escapes are decoded, and then everything outside of the URI-safe set is
/// percent-encoded as UTF-8.
pub(crate) fn normalize_uri(uri: &str) -> String {
    let decoded_bytes = urlencoding::decode_binary(uri.as_bytes());
    let decoded = String::from_utf8_lossy(&decoded_bytes);
    let mut result = String::with_capacity(decoded.len());
    let mut buf = [0u8; 4];
    for ch in decoded.chars() {
        if ch.is_ascii_alphanumeric() || URI_SAFE.contains(ch) {
            result.push(ch);
        } else {
            result.push_str(&urlencoding::encode(ch.encode_utf8(&mut buf)));
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn safe_chars_untouched() {
        assert_eq!(normalize_uri("https://example.com/a?b=c&d#e"), "https://example.com/a?b=c&d#e");
    }

    #[test]
    fn unsafe_chars_encoded() {
        assert_eq!(normalize_uri("/foo bar"), "/foo%20bar");
        assert_eq!(normalize_uri("/föö"), "/f%C3%B6%C3%B6");
        assert_eq!(normalize_uri(r"/a\b"), "/a%5Cb");
    }

    #[test]
    fn existing_escapes_kept() {
        assert_eq!(normalize_uri("/foo%20bar"), "/foo%20bar");
        assert_eq!(normalize_uri("/100%"), "/100%25");
    }
}
