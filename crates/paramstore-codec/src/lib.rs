//! Paramstore Codec
//!
//! Reversible transforms between plaintext UTF-8 and the on-disk text of a
//! parameter file. Three modes exist:
//!
//! - `Plain`: identity
//! - `XorBase64`: single-byte XOR mask, then Base64
//! - `AesPbkdf2Cbc`: AES-256-CBC keyed by PBKDF2-HMAC-SHA256, laid out as
//!   `Base64(salt[16] || iv[16] || ciphertext)`
//!
//! The bytes carry no mode tag. [`decode_auto`] is a heuristic for files
//! whose mode is not known up front.
//!
//! This is tamper deterrence for a local save file, not a security boundary.

pub mod aes_cbc;
pub mod detect;
pub mod error;
pub mod integrity;
pub mod mode;
pub mod xor;

pub use aes_cbc::{aes_decrypt, aes_encrypt};
pub use detect::{decode_auto, looks_like_base64};
pub use error::{CodecError, CodecResult};
pub use integrity::{compute_hmac, verify_hmac};
pub use mode::{Codec, ObfuscationMode};
pub use xor::{xor_decode, xor_encode};

/// XOR key byte used when none is configured.
pub const DEFAULT_XOR_KEY: u8 = 0x5A;

/// PBKDF2 salt length in bytes.
pub const SALT_LEN: usize = 16;

/// AES-CBC initialization vector length in bytes.
pub const IV_LEN: usize = 16;

/// Derived AES-256 key length in bytes.
pub const KEY_LEN: usize = 32;

/// PBKDF2-HMAC-SHA256 iteration count.
pub const PBKDF2_ITERATIONS: u32 = 10_000;
