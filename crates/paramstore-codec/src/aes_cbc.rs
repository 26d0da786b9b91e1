//! AES-256-CBC with PBKDF2-HMAC-SHA256 key derivation
//!
//! Output layout: `Base64(salt[16] || iv[16] || ciphertext)`, PKCS7 padded.
//! A fresh salt and IV are drawn for every encryption.

use aes::Aes256;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use cbc::cipher::block_padding::Pkcs7;
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::Sha256;

use crate::error::{CodecError, CodecResult};
use crate::{IV_LEN, KEY_LEN, PBKDF2_ITERATIONS, SALT_LEN};

type Aes256CbcEnc = cbc::Encryptor<Aes256>;
type Aes256CbcDec = cbc::Decryptor<Aes256>;

/// Derive the AES key from a passphrase and salt.
fn derive_key(passphrase: &str, salt: &[u8]) -> [u8; KEY_LEN] {
    let mut key = [0u8; KEY_LEN];
    pbkdf2::pbkdf2_hmac::<Sha256>(passphrase.as_bytes(), salt, PBKDF2_ITERATIONS, &mut key);
    key
}

/// Encrypt `plaintext` under `passphrase`.
///
/// Empty plaintext encrypts to an empty string.
pub fn aes_encrypt(plaintext: &str, passphrase: &str) -> String {
    if plaintext.is_empty() {
        return String::new();
    }

    let mut salt = [0u8; SALT_LEN];
    let mut iv = [0u8; IV_LEN];
    OsRng.fill_bytes(&mut salt);
    OsRng.fill_bytes(&mut iv);

    let key = derive_key(passphrase, &salt);
    let ciphertext = Aes256CbcEnc::new(&key.into(), &iv.into())
        .encrypt_padded_vec_mut::<Pkcs7>(plaintext.as_bytes());

    let mut raw = Vec::with_capacity(SALT_LEN + IV_LEN + ciphertext.len());
    raw.extend_from_slice(&salt);
    raw.extend_from_slice(&iv);
    raw.extend_from_slice(&ciphertext);
    STANDARD.encode(raw)
}

/// Decrypt the output of [`aes_encrypt`].
///
/// A wrong passphrase surfaces as [`CodecError::Decrypt`] (padding check
/// failed) or [`CodecError::Utf8`] (padding happened to validate but the
/// plaintext is garbage). Nothing here panics on hostile input.
pub fn aes_decrypt(encoded: &str, passphrase: &str) -> CodecResult<String> {
    let encoded = encoded.trim();
    if encoded.is_empty() {
        return Ok(String::new());
    }

    let raw = STANDARD.decode(encoded)?;
    let min = SALT_LEN + IV_LEN;
    if raw.len() < min {
        return Err(CodecError::TooShort { len: raw.len(), min });
    }

    let (salt, rest) = raw.split_at(SALT_LEN);
    let (iv, ciphertext) = rest.split_at(IV_LEN);
    if ciphertext.is_empty() {
        return Err(CodecError::Decrypt);
    }

    let key = derive_key(passphrase, salt);
    let decryptor =
        Aes256CbcDec::new_from_slices(&key, iv).map_err(|_| CodecError::Decrypt)?;
    let plaintext = decryptor
        .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
        .map_err(|_| CodecError::Decrypt)?;

    Ok(String::from_utf8(plaintext)?)
}
