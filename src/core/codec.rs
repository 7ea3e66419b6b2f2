//! Percent codec for path segments.
//!
//! Arbitrary Unicode segments map to filesystem-safe names: every UTF-8
//! byte outside the safe set becomes `%XX` (uppercase hex), and a leading
//! `.` is rewritten to `%2E` so an encoded name never collides with the
//! hidden-file namespace. Decoding is strict: a `%` not followed by two hex
//! digits rejects the whole segment, and callers skip the artifact.

use std::fmt::Write as _;

use super::error::CoreError;

/// Bytes that pass through unencoded.
fn is_safe_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.' | b'~')
}

/// Encode one path segment to its on-disk name.
pub fn encode_segment(segment: &str) -> String {
    let mut out = String::with_capacity(segment.len());
    for &b in segment.as_bytes() {
        if is_safe_byte(b) {
            out.push(b as char);
        } else {
            let _ = write!(out, "%{b:02X}");
        }
    }
    if out.starts_with('.') {
        out.replace_range(..1, "%2E");
    }
    out
}

/// Decode an on-disk name back to its path segment.
pub fn decode_segment(segment: &str) -> Result<String, CoreError> {
    let bytes = segment.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let (hi, lo) = match bytes.get(i + 1..i + 3) {
                Some(&[hi, lo]) => (hex_value(hi), hex_value(lo)),
                _ => (None, None),
            };
            let (Some(hi), Some(lo)) = (hi, lo) else {
                return Err(invalid(segment, "`%` not followed by two hex digits"));
            };
            out.push(hi << 4 | lo);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(out).map_err(|_| invalid(segment, "decoded bytes are not valid UTF-8"))
}

fn hex_value(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'A'..=b'F' => Some(b - b'A' + 10),
        b'a'..=b'f' => Some(b - b'a' + 10),
        _ => None,
    }
}

fn invalid(raw: &str, reason: &str) -> CoreError {
    CoreError::InvalidSegment {
        raw: raw.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn safe_characters_pass_through() {
        assert_eq!(encode_segment("contacts"), "contacts");
        assert_eq!(encode_segment("a-b_c.d~e"), "a-b_c.d~e");
        assert_eq!(encode_segment("AZaz09"), "AZaz09");
    }

    #[test]
    fn unsafe_bytes_become_uppercase_hex() {
        assert_eq!(encode_segment("a b/c"), "a%20b%2Fc");
        assert_eq!(encode_segment("50%"), "50%25");
        assert_eq!(encode_segment("héllo"), "h%C3%A9llo");
    }

    #[test]
    fn leading_dot_is_rewritten() {
        assert_eq!(encode_segment(".hidden"), "%2Ehidden");
        assert_eq!(encode_segment("."), "%2E");
        // only the first character is special
        assert_eq!(encode_segment("a.b"), "a.b");
    }

    #[test]
    fn decode_inverts_encode() {
        for segment in [
            "contacts",
            ".hidden",
            "a b/c",
            "héllo wörld",
            "日本語",
            "100%~done",
            "",
        ] {
            let encoded = encode_segment(segment);
            assert!(!encoded.starts_with('.'));
            assert_eq!(decode_segment(&encoded).unwrap(), segment);
        }
    }

    #[test]
    fn decode_accepts_lowercase_hex() {
        assert_eq!(decode_segment("a%20b").unwrap(), "a b");
        assert_eq!(decode_segment("a%2fb").unwrap(), "a/b");
    }

    #[test]
    fn decode_rejects_truncated_escapes() {
        assert!(decode_segment("%").is_err());
        assert!(decode_segment("%2").is_err());
        assert!(decode_segment("abc%G0").is_err());
        assert!(decode_segment("%%20").is_err());
    }

    #[test]
    fn decode_rejects_invalid_utf8() {
        assert!(decode_segment("%FF%FE").is_err());
    }
}
