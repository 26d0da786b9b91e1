//! HMAC-SHA256 integrity tags
//!
//! Independent of the obfuscation modes. Used to tag a saved file so that
//! hand edits can be detected at load time.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Compute `Base64(HMAC-SHA256(key, utf8(message)))`.
pub fn compute_hmac(message: &str, key: &[u8]) -> String {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC accepts keys of any length");
    mac.update(message.as_bytes());
    STANDARD.encode(mac.finalize().into_bytes())
}

/// Check `mac` against the tag computed for `message`.
///
/// Empty tags never verify.
pub fn verify_hmac(message: &str, mac: &str, key: &[u8]) -> bool {
    let mac = mac.trim();
    if mac.is_empty() {
        return false;
    }
    let expected = compute_hmac(message, key);
    constant_time_eq(expected.as_bytes(), mac.as_bytes())
}

/// Length-gated comparison that touches every byte regardless of where the
/// first difference is.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let diff = a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y));
    diff == 0
}
