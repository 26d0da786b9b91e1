//! Layered parameter store
//!
//! Owns two layers:
//! 1. Defaults (shipped, read-only after load)
//! 2. User overrides (the only layer ever written back)
//!
//! Readers see the deep merge of the two. Every operation other than
//! `initialize` and `wait_until_ready` fails with
//! [`StoreError::NotInitialized`] until the store is ready.

mod document;
mod lookup;
mod merge;
mod path;
mod persist;

pub use document::{
    load_layer, parse_document, sidecar_path, wrap_envelope, wrap_fetched, LayerKind, LayerReport,
    LayerStatus, LoadedLayer, Provenance, DATA_KEY, FETCHED_AT_KEY, SAVED_AT_KEY, SHEET_NAME_KEY,
};
pub use lookup::{coerce, Lookup};
pub use merge::deep_merge;
pub use path::{get_path, remove_path, segments, set_path};
pub use persist::{read_text, write_atomic, StagedWrite};

use paramstore_codec::{compute_hmac, CodecError, ObfuscationMode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::io;
use std::path::PathBuf;
#[cfg(test)]
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use thiserror::Error;
use tokio::sync::{watch, Mutex};
use tracing::{debug, info};

use crate::config::StoreOptions;

/// Lifecycle of a store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Uninitialized,
    Initializing,
    Ready,
}

/// Store errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("parameter store is not initialized")]
    NotInitialized,

    #[error("save mode is AES but no passphrase is configured for {0}")]
    MissingPassphrase(PathBuf),

    #[error("invalid parameter path: {0:?}")]
    InvalidPath(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("encode error: {0}")]
    Codec(#[from] CodecError),

    #[error("initialization task failed: {0}")]
    InitTask(String),
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Loaded layers plus their cached merge
#[derive(Debug, Clone)]
struct Layers {
    defaults: Value,
    user: Value,
    merged: Value,
    reports: Vec<LayerReport>,
}

impl Layers {
    fn load(options: &StoreOptions) -> Self {
        let defaults = load_layer(LayerKind::Defaults, &options.defaults, None);
        let user = load_layer(
            LayerKind::User,
            &options.user,
            options.integrity_key.as_deref(),
        );
        let merged = deep_merge(defaults.document.clone(), user.document.clone());
        Self {
            defaults: defaults.document,
            user: user.document,
            merged,
            reports: vec![defaults.report, user.report],
        }
    }

    fn remerge(&mut self) {
        self.merged = deep_merge(self.defaults.clone(), self.user.clone());
    }
}

/// Two-layer parameter store.
///
/// Construct one per save location and share it (e.g. behind an `Arc`)
/// with whatever needs parameters. `set`/`save` expect a single logical
/// writer; reads may happen from anywhere.
pub struct ParamStore {
    options: StoreOptions,
    phase: watch::Sender<Phase>,
    init_lock: Mutex<()>,
    layers: RwLock<Option<Layers>>,
    #[cfg(test)]
    loads: AtomicUsize,
}

impl std::fmt::Debug for ParamStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParamStore")
            .field("options", &self.options)
            .field("phase", &self.phase())
            .finish()
    }
}

impl ParamStore {
    pub fn new(options: StoreOptions) -> Self {
        let (phase, _) = watch::channel(Phase::Uninitialized);
        Self {
            options,
            phase,
            init_lock: Mutex::new(()),
            layers: RwLock::new(None),
            #[cfg(test)]
            loads: AtomicUsize::new(0),
        }
    }

    pub fn options(&self) -> &StoreOptions {
        &self.options
    }

    pub fn phase(&self) -> Phase {
        *self.phase.borrow()
    }

    pub fn is_ready(&self) -> bool {
        self.phase() == Phase::Ready
    }

    /// Load both layers and compute the merged view.
    ///
    /// Idempotent. Concurrent callers are serialized so the load runs once;
    /// later callers return as soon as the first finishes. File I/O and
    /// decoding run on the blocking pool.
    pub async fn initialize(&self) -> StoreResult<()> {
        if self.is_ready() {
            return Ok(());
        }

        let _guard = self.init_lock.lock().await;
        if self.is_ready() {
            return Ok(());
        }

        self.phase.send_replace(Phase::Initializing);
        #[cfg(test)]
        self.loads.fetch_add(1, Ordering::SeqCst);

        let options = self.options.clone();
        let layers = match tokio::task::spawn_blocking(move || Layers::load(&options)).await {
            Ok(layers) => layers,
            Err(e) => {
                self.phase.send_replace(Phase::Uninitialized);
                return Err(StoreError::InitTask(e.to_string()));
            }
        };

        *self.write_layers() = Some(layers);
        self.phase.send_replace(Phase::Ready);
        info!(
            "Parameter store initialized (defaults: {}, user: {})",
            self.options.defaults.path.display(),
            self.options.user.path.display()
        );
        Ok(())
    }

    /// Suspend until the store is ready. No timeout; wrap in one if needed.
    pub async fn wait_until_ready(&self) {
        let mut rx = self.phase.subscribe();
        loop {
            let ready = *rx.borrow_and_update() == Phase::Ready;
            if ready {
                return;
            }
            // The sender lives as long as `self`, so this only fails if the store is gone
            if rx.changed().await.is_err() {
                return;
            }
        }
    }

    fn read_layers(&self) -> RwLockReadGuard<'_, Option<Layers>> {
        self.layers.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_layers(&self) -> RwLockWriteGuard<'_, Option<Layers>> {
        self.layers.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn with_layers<R>(&self, f: impl FnOnce(&Layers) -> R) -> StoreResult<R> {
        if !self.is_ready() {
            return Err(StoreError::NotInitialized);
        }
        let guard = self.read_layers();
        guard.as_ref().map(f).ok_or(StoreError::NotInitialized)
    }

    fn with_layers_mut<R>(&self, f: impl FnOnce(&mut Layers) -> R) -> StoreResult<R> {
        if !self.is_ready() {
            return Err(StoreError::NotInitialized);
        }
        let mut guard = self.write_layers();
        guard.as_mut().map(f).ok_or(StoreError::NotInitialized)
    }

    /// Typed read from the merged view, keeping found/missing/mismatch apart.
    pub fn lookup<T: DeserializeOwned>(&self, path: &str) -> StoreResult<Lookup<T>> {
        let result = self.with_layers(|layers| lookup::lookup(&layers.merged, path))?;
        if let Lookup::Mismatch(value) = &result {
            debug!(
                "Parameter {} holds {} which does not convert to {}; using fallback",
                path,
                value,
                std::any::type_name::<T>()
            );
        }
        Ok(result)
    }

    /// Typed read from the merged view, returning `fallback` when the value
    /// is absent or does not convert.
    pub fn get<T: DeserializeOwned>(&self, path: &str, fallback: T) -> StoreResult<T> {
        Ok(self.lookup(path)?.or(fallback))
    }

    /// Raw value at `path` in the merged view.
    pub fn get_value(&self, path: &str) -> StoreResult<Option<Value>> {
        self.with_layers(|layers| get_path(&layers.merged, path).cloned())
    }

    /// Snapshot of the merged view
    pub fn merged(&self) -> StoreResult<Value> {
        self.with_layers(|layers| layers.merged.clone())
    }

    /// Snapshot of the defaults layer
    pub fn defaults(&self) -> StoreResult<Value> {
        self.with_layers(|layers| layers.defaults.clone())
    }

    /// Snapshot of the user layer
    pub fn user(&self) -> StoreResult<Value> {
        self.with_layers(|layers| layers.user.clone())
    }

    /// How each layer was loaded
    pub fn layer_reports(&self) -> StoreResult<Vec<LayerReport>> {
        self.with_layers(|layers| layers.reports.clone())
    }

    /// Write `value` at `path` in the user layer.
    ///
    /// Intermediate non-objects are overwritten with objects. The merged
    /// view reflects the change immediately.
    pub fn set<V: Serialize>(&self, path: &str, value: V) -> StoreResult<()> {
        let parts = segments(path).ok_or_else(|| StoreError::InvalidPath(path.to_string()))?;
        let value = serde_json::to_value(value)?;
        self.with_layers_mut(|layers| {
            set_path(&mut layers.user, &parts, value);
            layers.remerge();
        })
    }

    /// Drop the user override at `path`, returning whether one existed.
    pub fn remove(&self, path: &str) -> StoreResult<bool> {
        let parts = segments(path).ok_or_else(|| StoreError::InvalidPath(path.to_string()))?;
        self.with_layers_mut(|layers| {
            let removed = remove_path(&mut layers.user, &parts).is_some();
            if removed {
                layers.remerge();
            }
            removed
        })
    }

    /// Encode the user layer and write it atomically to the user path.
    ///
    /// With an integrity key configured, an HMAC sidecar is written after the
    /// data file. Only one save per store should be in flight at a time.
    pub fn save(&self) -> StoreResult<()> {
        let user_options = &self.options.user;
        let envelope = self.with_layers(|layers| wrap_envelope(&layers.user))?;

        let codec = user_options.codec();
        if codec.mode == ObfuscationMode::AesPbkdf2Cbc && codec.passphrase.is_none() {
            return Err(StoreError::MissingPassphrase(user_options.path.clone()));
        }

        let json = serde_json::to_string(&envelope)?;
        let encoded = codec.encode(&json)?;

        // Both files are fully written before either is renamed into place.
        // A crash between the two renames still leaves a stale sidecar.
        let data = StagedWrite::stage(&user_options.path, &encoded)?;
        let sidecar = match self.options.integrity_key.as_deref() {
            Some(key) => {
                let mac = compute_hmac(&encoded, key.as_bytes());
                Some(StagedWrite::stage(&sidecar_path(&user_options.path), &mac)?)
            }
            None => None,
        };
        data.commit()?;
        if let Some(sidecar) = sidecar {
            sidecar.commit()?;
        }

        info!("Saved parameters -> {}", user_options.path.display());
        Ok(())
    }

    #[cfg(test)]
    fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }
}
