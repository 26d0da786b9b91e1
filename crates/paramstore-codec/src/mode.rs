//! Mode selection

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::aes_cbc::{aes_decrypt, aes_encrypt};
use crate::error::{CodecError, CodecResult};
use crate::xor::{xor_decode, xor_encode};
use crate::DEFAULT_XOR_KEY;

/// How a parameter file is transformed for storage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObfuscationMode {
    /// Stored as-is
    #[serde(alias = "none")]
    Plain,
    /// Single-byte XOR, then Base64
    #[default]
    #[serde(rename = "xor", alias = "simple")]
    XorBase64,
    /// AES-256-CBC with a PBKDF2-derived key
    #[serde(rename = "aes")]
    AesPbkdf2Cbc,
}

impl ObfuscationMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ObfuscationMode::Plain => "plain",
            ObfuscationMode::XorBase64 => "xor",
            ObfuscationMode::AesPbkdf2Cbc => "aes",
        }
    }
}

impl fmt::Display for ObfuscationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ObfuscationMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "plain" | "none" => Ok(ObfuscationMode::Plain),
            "xor" | "simple" => Ok(ObfuscationMode::XorBase64),
            "aes" => Ok(ObfuscationMode::AesPbkdf2Cbc),
            other => Err(format!("unknown obfuscation mode: {}", other)),
        }
    }
}

/// A mode bundled with the key material it needs.
#[derive(Clone, PartialEq, Eq)]
pub struct Codec {
    pub mode: ObfuscationMode,
    pub passphrase: Option<String>,
    pub xor_key: u8,
}

impl fmt::Debug for Codec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Codec")
            .field("mode", &self.mode)
            .field("passphrase", &self.passphrase.as_ref().map(|_| "[REDACTED]"))
            .field("xor_key", &format_args!("{:#04x}", self.xor_key))
            .finish()
    }
}

impl Default for Codec {
    fn default() -> Self {
        Self::new(ObfuscationMode::default())
    }
}

impl Codec {
    pub fn new(mode: ObfuscationMode) -> Self {
        Self {
            mode,
            passphrase: None,
            xor_key: DEFAULT_XOR_KEY,
        }
    }

    pub fn plain() -> Self {
        Self::new(ObfuscationMode::Plain)
    }

    pub fn xor(key: u8) -> Self {
        Self::new(ObfuscationMode::XorBase64).with_xor_key(key)
    }

    pub fn aes(passphrase: impl Into<String>) -> Self {
        Self::new(ObfuscationMode::AesPbkdf2Cbc).with_passphrase(passphrase)
    }

    pub fn with_passphrase(mut self, passphrase: impl Into<String>) -> Self {
        self.passphrase = Some(passphrase.into());
        self
    }

    pub fn with_xor_key(mut self, key: u8) -> Self {
        self.xor_key = key;
        self
    }

    /// Encode plaintext for storage.
    ///
    /// AES mode refuses to run without a passphrase rather than silently
    /// picking a weaker mode. An empty passphrase counts as none.
    pub fn encode(&self, plaintext: &str) -> CodecResult<String> {
        match self.mode {
            ObfuscationMode::Plain => Ok(plaintext.to_string()),
            ObfuscationMode::XorBase64 => Ok(xor_encode(plaintext, self.xor_key)),
            ObfuscationMode::AesPbkdf2Cbc => {
                let pass = self
                    .passphrase
                    .as_deref()
                    .filter(|p| !p.is_empty())
                    .ok_or(CodecError::MissingPassphrase)?;
                Ok(aes_encrypt(plaintext, pass))
            }
        }
    }

    /// Decode stored text back to plaintext.
    ///
    /// In AES mode a missing passphrase is treated as the empty passphrase.
    pub fn decode(&self, encoded: &str) -> CodecResult<String> {
        match self.mode {
            ObfuscationMode::Plain => Ok(encoded.to_string()),
            ObfuscationMode::XorBase64 => xor_decode(encoded, self.xor_key),
            ObfuscationMode::AesPbkdf2Cbc => {
                aes_decrypt(encoded, self.passphrase.as_deref().unwrap_or_default())
            }
        }
    }
}
