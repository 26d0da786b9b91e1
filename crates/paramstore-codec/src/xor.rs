//! XOR + Base64 obfuscation

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

use crate::error::CodecResult;

/// Mask every UTF-8 byte of `text` with `key`, then Base64-encode.
///
/// Empty input encodes to an empty string.
pub fn xor_encode(text: &str, key: u8) -> String {
    if text.is_empty() {
        return String::new();
    }
    let masked: Vec<u8> = text.bytes().map(|b| b ^ key).collect();
    STANDARD.encode(masked)
}

/// Reverse [`xor_encode`].
///
/// Surrounding whitespace is ignored. Empty input decodes to `Ok("")`.
pub fn xor_decode(encoded: &str, key: u8) -> CodecResult<String> {
    let encoded = encoded.trim();
    if encoded.is_empty() {
        return Ok(String::new());
    }
    let mut bytes = STANDARD.decode(encoded)?;
    for b in bytes.iter_mut() {
        *b ^= key;
    }
    Ok(String::from_utf8(bytes)?)
}
