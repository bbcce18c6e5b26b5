//! Content transcoding for the repository contents API.
//!
//! File contents travel inside JSON as standard base64 over the UTF-8
//! bytes of the text. Encoding always goes text → UTF-8 bytes → base64,
//! and decoding reverses it with an explicit UTF-8 validation step, so
//! multi-byte text (CJK, emoji, accented Latin) survives the round trip.
//!
//! There is no lossy fallback: a payload that is not valid base64, or
//! whose bytes are not valid UTF-8, is a [`DecodeError`].

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use thiserror::Error;

/// Transcoding errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    /// The payload is not valid base64.
    #[error("invalid base64 content: {0}")]
    Base64(String),

    /// The decoded bytes are not UTF-8 text.
    #[error("content is not valid UTF-8 (at byte {valid_up_to})")]
    Utf8 {
        /// Length of the longest valid UTF-8 prefix.
        valid_up_to: usize,
    },
}

/// Encode text for the contents API.
pub fn encode(text: &str) -> String {
    STANDARD.encode(text.as_bytes())
}

/// Decode a contents API payload back to text.
///
/// ASCII whitespace is ignored; the remote wraps base64 bodies at a fixed
/// line width.
pub fn decode(token: &str) -> Result<String, DecodeError> {
    let compact: String = token
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();
    let bytes = STANDARD
        .decode(compact.as_bytes())
        .map_err(|e| DecodeError::Base64(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| DecodeError::Utf8 {
        valid_up_to: e.utf8_error().valid_up_to(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn roundtrip(s: &str) {
        assert_eq!(decode(&encode(s)).unwrap(), s, "round trip failed for {:?}", s);
    }

    #[test]
    fn ascii_roundtrip() {
        roundtrip("");
        roundtrip("# Title\n\nSome *markdown*.\n");
    }

    #[test]
    fn multibyte_roundtrip() {
        roundtrip("中文内容测试");
        roundtrip("日本語のテキスト");
        roundtrip("café naïve façade Ångström");
        roundtrip("emoji 🎉🚀 and ZWJ 👩‍💻");
        roundtrip("mixed: Привет, 世界! مرحبا 🌍\r\n\ttabs");
    }

    #[test]
    fn encodes_utf8_bytes_not_code_points() {
        // "é" is U+00E9, two bytes in UTF-8: C3 A9.
        assert_eq!(encode("é"), "w6k=");
        assert_eq!(encode("中"), "5Lit");
    }

    #[test]
    fn decode_ignores_line_wrapping() {
        let wrapped = "5Lit5paH\n5YaF5a65\n";
        assert_eq!(decode(wrapped).unwrap(), "中文内容");
    }

    #[test]
    fn invalid_base64_is_an_error() {
        assert!(matches!(decode("not base64!!"), Err(DecodeError::Base64(_))));
    }

    proptest! {
        #[test]
        fn any_string_roundtrips(s in any::<String>()) {
            prop_assert_eq!(decode(&encode(&s)).unwrap(), s);
        }

        #[test]
        fn wrapped_encoding_roundtrips(s in "\\PC{0,200}", width in 1usize..80) {
            let encoded = encode(&s);
            let wrapped: Vec<String> = encoded
                .as_bytes()
                .chunks(width)
                .map(|c| std::str::from_utf8(c).unwrap().to_string())
                .collect();
            prop_assert_eq!(decode(&wrapped.join("\n")).unwrap(), s);
        }
    }

    #[test]
    fn non_utf8_bytes_are_an_error() {
        // 0xFF 0xFE is never valid UTF-8.
        let token = STANDARD.encode([0x61, 0xFF, 0xFE]);
        assert_eq!(decode(&token), Err(DecodeError::Utf8 { valid_up_to: 1 }));
    }
}
