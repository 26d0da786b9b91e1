//! Atomic file writes (write-then-rename)

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Sibling temp path for `path`: `.<file name>.<uuid>.tmp` in the same directory.
fn temp_path_for(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "paramstore".to_string());
    let temp_name = format!(".{}.{}.tmp", name, uuid::Uuid::new_v4().simple());
    path.with_file_name(temp_name)
}

/// A file written and synced to a sibling temp path, not yet renamed over
/// its target.
///
/// Dropping it without [`StagedWrite::commit`] removes the temp file and
/// leaves the target untouched.
#[derive(Debug)]
pub struct StagedWrite {
    temp_path: PathBuf,
    target: PathBuf,
    committed: bool,
}

impl StagedWrite {
    /// Write and sync `contents` next to `path`.
    ///
    /// Parent directories are created as needed. Text is written as UTF-8
    /// with no byte-order mark.
    pub fn stage(path: &Path, contents: &str) -> io::Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let staged = Self {
            temp_path: temp_path_for(path),
            target: path.to_path_buf(),
            committed: false,
        };
        let mut file = File::create(&staged.temp_path)?;
        file.write_all(contents.as_bytes())?;
        file.sync_all()?;
        Ok(staged)
    }

    pub fn target(&self) -> &Path {
        &self.target
    }

    /// Rename the temp file over the target.
    pub fn commit(mut self) -> io::Result<()> {
        fs::rename(&self.temp_path, &self.target)?;
        self.committed = true;
        Ok(())
    }
}

impl Drop for StagedWrite {
    fn drop(&mut self) {
        if !self.committed {
            let _ = fs::remove_file(&self.temp_path);
        }
    }
}

/// Write `contents` to `path` atomically.
///
/// The data is written and synced to a sibling temp file, then renamed over
/// the target, so the target holds either the old or the new contents.
pub fn write_atomic(path: &Path, contents: &str) -> io::Result<()> {
    StagedWrite::stage(path, contents)?.commit()
}

/// Read a text file, stripping a leading UTF-8 byte-order mark.
///
/// Returns the text together with the raw bytes it came from.
pub fn read_text(path: &Path) -> io::Result<(String, Vec<u8>)> {
    let bytes = fs::read(path)?;
    let text = String::from_utf8(bytes.clone())
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    let text = match text.strip_prefix('\u{feff}') {
        Some(stripped) => stripped.to_string(),
        None => text,
    };
    Ok((text, bytes))
}
