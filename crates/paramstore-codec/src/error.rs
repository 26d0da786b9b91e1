//! Codec errors

use thiserror::Error;

/// Errors from decode/encode operations.
///
/// An empty plaintext is a valid result, so failure is never signalled by
/// returning an empty string.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("base64 decode error: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("payload too short: {len} bytes, need at least {min}")]
    TooShort { len: usize, min: usize },

    #[error("decryption failed (wrong passphrase or corrupted data)")]
    Decrypt,

    #[error("decoded bytes are not valid UTF-8")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("AES mode requires a passphrase")]
    MissingPassphrase,

    #[error("could not detect encoding of input")]
    Undetected,
}

/// Result type for codec operations
pub type CodecResult<T> = Result<T, CodecError>;
