//! Store options
//!
//! Where each layer lives and how it is encoded. Built in code or loaded
//! from a TOML file:
//!
//! ```toml
//! integrity_key = "optional-hmac-key"
//!
//! [defaults]
//! path = "Data/Parameters.json"
//! mode = "xor"
//!
//! [user]
//! path = "Save/Parameters.sav"
//! mode = "aes"
//! passphrase_env = "PARAMSTORE_PASSPHRASE"
//! ```

use paramstore_codec::{Codec, ObfuscationMode, DEFAULT_XOR_KEY};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// File name of the shipped defaults layer
pub const DEFAULTS_FILE_NAME: &str = "Parameters.json";

/// File name of the user save layer
pub const USER_FILE_NAME: &str = "Parameters.sav";

fn default_xor_key() -> u8 {
    DEFAULT_XOR_KEY
}

/// Location and encoding of one layer
#[derive(Clone, Serialize, Deserialize, PartialEq)]
pub struct LayerOptions {
    /// File path of the layer
    pub path: PathBuf,

    /// Obfuscation mode (default: "xor")
    #[serde(default)]
    pub mode: ObfuscationMode,

    /// AES passphrase
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub passphrase: Option<String>,

    /// Environment variable holding the passphrase, read when `passphrase` is unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub passphrase_env: Option<String>,

    /// XOR key byte (default: 0x5A)
    #[serde(default = "default_xor_key")]
    pub xor_key: u8,
}

impl LayerOptions {
    pub fn new(path: impl Into<PathBuf>, mode: ObfuscationMode) -> Self {
        Self {
            path: path.into(),
            mode,
            passphrase: None,
            passphrase_env: None,
            xor_key: DEFAULT_XOR_KEY,
        }
    }

    pub fn with_passphrase(mut self, passphrase: impl Into<String>) -> Self {
        self.passphrase = Some(passphrase.into());
        self
    }

    pub fn with_passphrase_env(mut self, var: impl Into<String>) -> Self {
        self.passphrase_env = Some(var.into());
        self
    }

    pub fn with_xor_key(mut self, key: u8) -> Self {
        self.xor_key = key;
        self
    }

    /// The configured passphrase, falling back to `passphrase_env`.
    ///
    /// Empty strings count as unset.
    pub fn resolved_passphrase(&self) -> Option<String> {
        self.passphrase
            .clone()
            .filter(|p| !p.is_empty())
            .or_else(|| {
                self.passphrase_env
                    .as_deref()
                    .and_then(|var| std::env::var(var).ok())
            })
            .filter(|p| !p.is_empty())
    }

    /// Codec for reading and writing this layer
    pub fn codec(&self) -> Codec {
        Codec {
            mode: self.mode,
            passphrase: self.resolved_passphrase(),
            xor_key: self.xor_key,
        }
    }
}

impl fmt::Debug for LayerOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LayerOptions")
            .field("path", &self.path)
            .field("mode", &self.mode)
            .field("passphrase", &self.passphrase.as_ref().map(|_| "[REDACTED]"))
            .field("passphrase_env", &self.passphrase_env)
            .field("xor_key", &format_args!("{:#04x}", self.xor_key))
            .finish()
    }
}

/// Options for a [`ParamStore`](crate::ParamStore)
#[derive(Clone, Serialize, Deserialize, PartialEq)]
pub struct StoreOptions {
    /// Read-only defaults layer
    pub defaults: LayerOptions,

    /// User layer; its mode and passphrase are also used when saving
    pub user: LayerOptions,

    /// Key for the HMAC sidecar written next to the user file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub integrity_key: Option<String>,
}

impl fmt::Debug for StoreOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreOptions")
            .field("defaults", &self.defaults)
            .field("user", &self.user)
            .field("integrity_key", &self.integrity_key.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

impl StoreOptions {
    pub fn new(defaults: LayerOptions, user: LayerOptions) -> Self {
        Self {
            defaults,
            user,
            integrity_key: None,
        }
    }

    /// Both layers in `dir` under their standard names, XOR-obfuscated.
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self::new(
            LayerOptions::new(dir.join(DEFAULTS_FILE_NAME), ObfuscationMode::XorBase64),
            LayerOptions::new(dir.join(USER_FILE_NAME), ObfuscationMode::XorBase64),
        )
    }

    pub fn with_integrity_key(mut self, key: impl Into<String>) -> Self {
        self.integrity_key = Some(key.into());
        self
    }

    /// Parse options from TOML text.
    ///
    /// Relative layer paths are resolved against `base_dir` when given.
    pub fn from_toml_str(contents: &str, base_dir: Option<&Path>) -> Result<Self, OptionsError> {
        let mut options: StoreOptions = toml::from_str(contents)
            .map_err(|e| OptionsError::ParseError(format!("TOML parse error: {}", e)))?;

        if let Some(base) = base_dir {
            for layer in [&mut options.defaults, &mut options.user] {
                if layer.path.is_relative() {
                    layer.path = base.join(&layer.path);
                }
            }
        }

        Ok(options)
    }

    /// Load options from a TOML file; relative paths resolve against its directory.
    pub fn from_toml_file(path: &Path) -> Result<Self, OptionsError> {
        let contents = fs::read_to_string(path)
            .map_err(|e| OptionsError::IoError(format!("{}: {}", path.display(), e)))?;
        Self::from_toml_str(&contents, path.parent())
    }
}

/// Option loading errors
#[derive(Debug, thiserror::Error)]
pub enum OptionsError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_in_dir() {
        let options = StoreOptions::in_dir("/data");
        assert_eq!(options.defaults.path, PathBuf::from("/data/Parameters.json"));
        assert_eq!(options.user.path, PathBuf::from("/data/Parameters.sav"));
        assert_eq!(options.user.mode, ObfuscationMode::XorBase64);
        assert_eq!(options.user.xor_key, 0x5A);
        assert!(options.integrity_key.is_none());
    }

    #[test]
    fn test_from_toml_str() {
        let toml = r#"
            integrity_key = "tag"

            [defaults]
            path = "/shipped/Parameters.json"
            mode = "plain"

            [user]
            path = "/save/Parameters.sav"
            mode = "aes"
            passphrase = "pw"
            xor_key = 17
        "#;

        let options = StoreOptions::from_toml_str(toml, None).unwrap();
        assert_eq!(options.defaults.mode, ObfuscationMode::Plain);
        assert_eq!(options.defaults.xor_key, DEFAULT_XOR_KEY);
        assert_eq!(options.user.mode, ObfuscationMode::AesPbkdf2Cbc);
        assert_eq!(options.user.passphrase.as_deref(), Some("pw"));
        assert_eq!(options.user.xor_key, 17);
        assert_eq!(options.integrity_key.as_deref(), Some("tag"));
    }

    #[test]
    fn test_mode_defaults_to_xor() {
        let toml = r#"
            [defaults]
            path = "a.json"
            [user]
            path = "b.sav"
        "#;
        let options = StoreOptions::from_toml_str(toml, None).unwrap();
        assert_eq!(options.defaults.mode, ObfuscationMode::XorBase64);
        assert_eq!(options.user.mode, ObfuscationMode::XorBase64);
    }

    #[test]
    fn test_legacy_mode_names() {
        let toml = r#"
            [defaults]
            path = "a.json"
            mode = "none"
            [user]
            path = "b.sav"
            mode = "simple"
        "#;
        let options = StoreOptions::from_toml_str(toml, None).unwrap();
        assert_eq!(options.defaults.mode, ObfuscationMode::Plain);
        assert_eq!(options.user.mode, ObfuscationMode::XorBase64);
    }

    #[test]
    fn test_relative_paths_resolve_against_file() {
        let mut temp = NamedTempFile::new().unwrap();
        writeln!(temp, "[defaults]").unwrap();
        writeln!(temp, "path = \"Data/Parameters.json\"").unwrap();
        writeln!(temp, "[user]").unwrap();
        writeln!(temp, "path = \"/abs/Parameters.sav\"").unwrap();

        let options = StoreOptions::from_toml_file(temp.path()).unwrap();
        let base = temp.path().parent().unwrap();
        assert_eq!(options.defaults.path, base.join("Data/Parameters.json"));
        assert_eq!(options.user.path, PathBuf::from("/abs/Parameters.sav"));
    }

    #[test]
    fn test_parse_error() {
        let result = StoreOptions::from_toml_str("[defaults\npath=", None);
        assert!(matches!(result, Err(OptionsError::ParseError(_))));
    }

    #[test]
    fn test_unknown_mode_rejected() {
        let toml = r#"
            [defaults]
            path = "a"
            mode = "rot13"
            [user]
            path = "b"
        "#;
        assert!(StoreOptions::from_toml_str(toml, None).is_err());
    }

    #[test]
    fn test_missing_file() {
        let result = StoreOptions::from_toml_file(Path::new("/nonexistent/paramstore.toml"));
        assert!(matches!(result, Err(OptionsError::IoError(_))));
    }

    #[test]
    fn test_passphrase_env_fallback() {
        let var = "PARAMSTORE_TEST_PASSPHRASE_FALLBACK";
        std::env::set_var(var, "from-env");

        let layer = LayerOptions::new("x.sav", ObfuscationMode::AesPbkdf2Cbc).with_passphrase_env(var);
        assert_eq!(layer.resolved_passphrase().as_deref(), Some("from-env"));

        let explicit = layer.clone().with_passphrase("explicit");
        assert_eq!(explicit.resolved_passphrase().as_deref(), Some("explicit"));

        std::env::remove_var(var);
        assert_eq!(layer.resolved_passphrase(), None);
    }

    #[test]
    fn test_empty_passphrase_is_unset() {
        let var = "PARAMSTORE_TEST_PASSPHRASE_EMPTY";
        std::env::set_var(var, "");

        let layer = LayerOptions::new("x.sav", ObfuscationMode::AesPbkdf2Cbc)
            .with_passphrase("")
            .with_passphrase_env(var);
        assert_eq!(layer.resolved_passphrase(), None);
        assert_eq!(layer.codec().passphrase, None);

        std::env::remove_var(var);
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let options = StoreOptions::in_dir("/d").with_integrity_key("mac-key");
        let options = StoreOptions {
            user: options.user.clone().with_passphrase("hunter2"),
            ..options
        };
        let debug = format!("{:?}", options);
        assert!(!debug.contains("hunter2"));
        assert!(!debug.contains("mac-key"));
        assert!(debug.contains("[REDACTED]"));
    }
}
