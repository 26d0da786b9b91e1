//! Layer documents and the on-disk envelope
//!
//! A layer file holds codec-encoded JSON. The JSON is normally an envelope
//! `{"data": {...}, ...provenance}`, but a bare object is accepted too.
//! Every failure while loading degrades to an empty document and is
//! recorded in the layer's [`LayerReport`].

use chrono::{SecondsFormat, Utc};
use paramstore_codec::{verify_hmac, Codec};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use super::persist::read_text;
use crate::config::LayerOptions;

/// Envelope key holding the document
pub const DATA_KEY: &str = "data";

/// Envelope key for the time the document was fetched from a remote sheet
pub const FETCHED_AT_KEY: &str = "fetchedAt";

/// Envelope key for the time the document was saved by the store
pub const SAVED_AT_KEY: &str = "savedAt";

/// Envelope key naming the remote sheet a document came from
pub const SHEET_NAME_KEY: &str = "sheetName";

/// Which layer a document belongs to
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LayerKind {
    Defaults,
    User,
}

impl fmt::Display for LayerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LayerKind::Defaults => f.write_str("defaults"),
            LayerKind::User => f.write_str("user"),
        }
    }
}

/// How loading a layer went
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LayerStatus {
    /// Decoded and parsed
    Loaded,
    /// File absent
    Missing,
    /// File present but could not be read
    Unreadable,
    /// Codec rejected the contents
    Undecodable,
    /// Decoded text is not a JSON object
    Unparsable,
    /// HMAC sidecar did not match
    IntegrityMismatch,
}

/// Provenance of a loaded layer
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LayerReport {
    pub kind: LayerKind,

    pub path: PathBuf,

    pub status: LayerStatus,

    /// SHA-256 digest of the raw file bytes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub fetched_at: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub saved_at: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub sheet_name: Option<String>,
}

impl LayerReport {
    fn new(kind: LayerKind, path: &Path, status: LayerStatus) -> Self {
        Self {
            kind,
            path: path.to_path_buf(),
            status,
            digest: None,
            fetched_at: None,
            saved_at: None,
            sheet_name: None,
        }
    }
}

/// Path of the HMAC sidecar for a layer file: `<file name>.hmac`
pub fn sidecar_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".hmac");
    path.with_file_name(name)
}

/// Wrap a document in the save envelope.
pub fn wrap_envelope(data: &Value) -> Value {
    let mut envelope = Map::new();
    envelope.insert(DATA_KEY.to_string(), data.clone());
    envelope.insert(
        SAVED_AT_KEY.to_string(),
        Value::String(Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)),
    );
    Value::Object(envelope)
}

/// Wrap an arbitrary payload in the provenance envelope a sheet fetch produces.
pub fn wrap_fetched(sheet_name: &str, payload: Value) -> Value {
    let mut envelope = Map::new();
    envelope.insert(SHEET_NAME_KEY.to_string(), Value::String(sheet_name.to_string()));
    envelope.insert(
        FETCHED_AT_KEY.to_string(),
        Value::String(Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)),
    );
    envelope.insert(DATA_KEY.to_string(), payload);
    Value::Object(envelope)
}

/// Envelope metadata found alongside the document
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Provenance {
    pub fetched_at: Option<String>,
    pub saved_at: Option<String>,
    pub sheet_name: Option<String>,
}

/// Parse decoded text into an object-rooted document.
///
/// A root object with a `data` key is unwrapped. Returns `None` when the
/// text is not JSON or the document is not an object.
pub fn parse_document(text: &str) -> Option<(Value, Provenance)> {
    let root: Value = serde_json::from_str(text).ok()?;
    let Value::Object(mut map) = root else {
        return None;
    };

    let Some(data) = map.remove(DATA_KEY) else {
        return Some((Value::Object(map), Provenance::default()));
    };

    let field = |key: &str| map.get(key).and_then(Value::as_str).map(str::to_string);
    let provenance = Provenance {
        fetched_at: field(FETCHED_AT_KEY),
        saved_at: field(SAVED_AT_KEY),
        sheet_name: field(SHEET_NAME_KEY),
    };

    data.is_object().then_some((data, provenance))
}

/// Decoded, parsed layer plus how it got that way
#[derive(Debug, Clone)]
pub struct LoadedLayer {
    pub document: Value,
    pub report: LayerReport,
}

impl LoadedLayer {
    fn empty(report: LayerReport) -> Self {
        Self {
            document: Value::Object(Map::new()),
            report,
        }
    }
}

/// Read, verify, decode and parse one layer.
///
/// Never fails: any problem yields an empty document and a report saying why.
pub fn load_layer(kind: LayerKind, options: &LayerOptions, integrity_key: Option<&str>) -> LoadedLayer {
    let path = options.path.as_path();

    let (text, raw) = match read_text(path) {
        Ok(read) => read,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            warn!("{} layer not found: {}", kind, path.display());
            return LoadedLayer::empty(LayerReport::new(kind, path, LayerStatus::Missing));
        }
        Err(e) => {
            warn!("Failed to read {} layer {}: {}", kind, path.display(), e);
            return LoadedLayer::empty(LayerReport::new(kind, path, LayerStatus::Unreadable));
        }
    };

    let mut report = LayerReport::new(kind, path, LayerStatus::Loaded);
    report.digest = Some(hex::encode(Sha256::digest(&raw)));

    if let Some(key) = integrity_key {
        let sidecar = sidecar_path(path);
        match std::fs::read_to_string(&sidecar) {
            Ok(mac) => {
                if !verify_hmac(&text, &mac, key.as_bytes()) {
                    warn!(
                        "Integrity check failed for {} layer {}; ignoring its contents",
                        kind,
                        path.display()
                    );
                    report.status = LayerStatus::IntegrityMismatch;
                    return LoadedLayer::empty(report);
                }
            }
            Err(e) => {
                warn!(
                    "No integrity tag for {} layer ({}): {}",
                    kind,
                    sidecar.display(),
                    e
                );
            }
        }
    }

    let codec: Codec = options.codec();
    let decoded = match codec.decode(&text) {
        Ok(decoded) => decoded,
        Err(e) => {
            warn!("Failed to decode {} layer {} ({}): {}", kind, path.display(), codec.mode, e);
            report.status = LayerStatus::Undecodable;
            return LoadedLayer::empty(report);
        }
    };

    match parse_document(&decoded) {
        Some((document, provenance)) => {
            debug!(
                "Loaded {} layer {} ({} top-level keys)",
                kind,
                path.display(),
                document.as_object().map(Map::len).unwrap_or(0)
            );
            report.fetched_at = provenance.fetched_at;
            report.saved_at = provenance.saved_at;
            report.sheet_name = provenance.sheet_name;
            LoadedLayer { document, report }
        }
        None => {
            warn!("Failed to parse {} layer {} as a JSON object", kind, path.display());
            report.status = LayerStatus::Unparsable;
            LoadedLayer::empty(report)
        }
    }
}
