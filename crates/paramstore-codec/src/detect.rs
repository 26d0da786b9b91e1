//! Best-effort mode detection
//!
//! Files carry no mode tag, so reading a file of unknown mode means trying
//! the candidates in order and accepting the first non-empty result.

use crate::aes_cbc::aes_decrypt;
use crate::error::{CodecError, CodecResult};
use crate::mode::ObfuscationMode;
use crate::xor::xor_decode;
use crate::DEFAULT_XOR_KEY;

/// Cheap shape check for Base64 text.
///
/// Length must be a multiple of four and every character alphanumeric,
/// `+`, `/` or `=`. A heuristic only; passing it says nothing about whether
/// the text actually decodes.
pub fn looks_like_base64(s: &str) -> bool {
    let s = s.trim();
    if s.is_empty() || s.len() % 4 != 0 {
        return false;
    }
    s.chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '+' || c == '/' || c == '=')
}

/// Decode `encoded` without knowing its mode.
///
/// AES is tried first when a non-empty passphrase is given, then XOR with
/// the default key if the input looks like Base64. Returns the plaintext
/// together with the mode that produced it, or [`CodecError::Undetected`].
pub fn decode_auto(
    encoded: &str,
    passphrase: Option<&str>,
) -> CodecResult<(String, ObfuscationMode)> {
    if encoded.trim().is_empty() {
        return Err(CodecError::Undetected);
    }

    if let Some(pass) = passphrase.filter(|p| !p.is_empty()) {
        if let Ok(text) = aes_decrypt(encoded, pass) {
            if !text.is_empty() {
                return Ok((text, ObfuscationMode::AesPbkdf2Cbc));
            }
        }
    }

    if looks_like_base64(encoded) {
        if let Ok(text) = xor_decode(encoded, DEFAULT_XOR_KEY) {
            if !text.is_empty() {
                return Ok((text, ObfuscationMode::XorBase64));
            }
        }
    }

    Err(CodecError::Undetected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aes_cbc::aes_encrypt;
    use crate::xor::xor_encode;

    #[test]
    fn test_looks_like_base64() {
        assert!(looks_like_base64("Gw=="));
        assert!(looks_like_base64("abcd+/=="));
        assert!(looks_like_base64("QUJD\n"));
        assert!(!looks_like_base64(""));
        assert!(!looks_like_base64("abc"));
        assert!(!looks_like_base64(r#"{"a":1}"#));
        assert!(!looks_like_base64("ab-_"));
    }

    #[test]
    fn test_auto_aes() {
        let encoded = aes_encrypt(r#"{"a":1}"#, "pw");
        let (text, mode) = decode_auto(&encoded, Some("pw")).unwrap();
        assert_eq!(text, r#"{"a":1}"#);
        assert_eq!(mode, ObfuscationMode::AesPbkdf2Cbc);
    }

    #[test]
    fn test_auto_xor_without_passphrase() {
        let encoded = xor_encode(r#"{"a":1}"#, DEFAULT_XOR_KEY);
        let (text, mode) = decode_auto(&encoded, None).unwrap();
        assert_eq!(text, r#"{"a":1}"#);
        assert_eq!(mode, ObfuscationMode::XorBase64);
    }

    #[test]
    fn test_auto_xor_falls_through_aes() {
        // 41 raw bytes leave a 9-byte ciphertext, not a whole AES block
        let encoded = xor_encode("a modest amount of plaintext for the test", DEFAULT_XOR_KEY);
        let (text, mode) = decode_auto(&encoded, Some("pw")).unwrap();
        assert_eq!(text, "a modest amount of plaintext for the test");
        assert_eq!(mode, ObfuscationMode::XorBase64);
    }

    #[test]
    fn test_auto_plain_json_is_undetected() {
        let result = decode_auto(r#"{"a":1}"#, None);
        assert!(matches!(result, Err(CodecError::Undetected)));
    }

    #[test]
    fn test_auto_empty_passphrase_skips_aes() {
        let encoded = aes_encrypt("secret", "pw");
        // Without the passphrase only the XOR path is tried, which yields garbage or fails
        match decode_auto(&encoded, Some("")) {
            Ok((_, mode)) => assert_eq!(mode, ObfuscationMode::XorBase64),
            Err(e) => assert!(matches!(e, CodecError::Undetected)),
        }
    }
}
