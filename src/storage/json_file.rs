//! Atomic JSON document persistence.
//!
//! Writes go through a hidden temp file in the target directory:
//! serialize → write tmp → fsync → rename. Readers never observe a partial
//! document. Files are created owner-only on unix.
//!
//! A document that fails to parse is treated as empty. The broken file is
//! copied aside (`<file>.corrupt-<unix-ts>`) right before the first write
//! that would replace it.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, warn};

use crate::core::errors::{Result, WalletStateError};

/// One JSON document on disk.
#[derive(Debug, Clone)]
pub struct JsonFile {
    path: PathBuf,
}

/// Outcome of reading a document.
struct Loaded<T> {
    value: T,
    malformed: bool,
}

impl JsonFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the document; missing or malformed files yield `T::default()`.
    pub fn read<T>(&self) -> Result<T>
    where
        T: DeserializeOwned + Default,
    {
        Ok(self.load()?.value)
    }

    /// Read-modify-write. The document is rewritten only when `f` changed it.
    ///
    /// Callers must hold the file's lock; this function does not lock.
    pub fn update<T, R, F>(&self, f: F) -> Result<R>
    where
        T: Serialize + DeserializeOwned + Default + Clone + PartialEq,
        F: FnOnce(&mut T) -> Result<R>,
    {
        let Loaded { value: before, malformed } = self.load::<T>()?;
        let mut after = before.clone();
        let out = f(&mut after)?;

        if after != before {
            if malformed {
                self.preserve_corrupt()?;
            }
            self.write_atomic(&after)?;
        } else {
            debug!(path = %self.path.display(), "document unchanged, skipping write");
        }
        Ok(out)
    }

    fn load<T>(&self) -> Result<Loaded<T>>
    where
        T: DeserializeOwned + Default,
    {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Ok(Loaded { value: T::default(), malformed: false })
            }
            Err(e) => return Err(e.into()),
        };

        if raw.trim().is_empty() {
            return Ok(Loaded { value: T::default(), malformed: false });
        }

        match serde_json::from_str(&raw) {
            Ok(value) => Ok(Loaded { value, malformed: false }),
            Err(e) => {
                let err = WalletStateError::MalformedStore {
                    path: self.path.clone(),
                    reason: e.to_string(),
                };
                warn!(error = %err, "treating store as empty");
                Ok(Loaded { value: T::default(), malformed: true })
            }
        }
    }

    fn preserve_corrupt(&self) -> Result<()> {
        let backup = sibling(&self.path, |name| format!("{}.corrupt-{}", name, Utc::now().timestamp()))?;
        fs::copy(&self.path, &backup)?;
        warn!(
            path = %self.path.display(),
            backup = %backup.display(),
            "malformed store preserved before overwrite"
        );
        Ok(())
    }

    fn write_atomic<T: Serialize>(&self, value: &T) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            ensure_private_dir(parent)?;
        }
        let tmp_path = sibling(&self.path, |name| format!(".{}.tmp", name))?;
        let body = serde_json::to_vec_pretty(value)?;

        {
            let mut file = create_private(&tmp_path)?;
            file.write_all(&body)?;
            file.sync_all()?;
        }

        if let Err(e) = fs::rename(&tmp_path, &self.path) {
            let _ = fs::remove_file(&tmp_path);
            return Err(e.into());
        }
        sync_parent(&self.path);
        debug!(path = %self.path.display(), bytes = body.len(), "document written");
        Ok(())
    }
}

/// `dir/<f(name)>` for the file name of `path`.
pub(crate) fn sibling(path: &Path, f: impl FnOnce(&str) -> String) -> Result<PathBuf> {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| WalletStateError::Config(format!("invalid store path: {}", path.display())))?;
    Ok(path.with_file_name(f(name)))
}

/// Create `dir` (and parents), owner-only on unix when newly created.
pub(crate) fn ensure_private_dir(dir: &Path) -> io::Result<()> {
    if dir.as_os_str().is_empty() || dir.is_dir() {
        return Ok(());
    }
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt as _;
        fs::DirBuilder::new().recursive(true).mode(0o700).create(dir)
    }
    #[cfg(not(unix))]
    {
        fs::create_dir_all(dir)
    }
}

/// Truncating open with 0o600 on unix.
fn create_private(path: &Path) -> io::Result<File> {
    let mut options = OpenOptions::new();
    options.create(true).write(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt as _;
        options.mode(0o600);
    }
    options.open(path)
}

// Best effort: persist the rename itself.
fn sync_parent(path: &Path) {
    #[cfg(unix)]
    {
        if let Some(parent) = path.parent() {
            if let Ok(dir) = File::open(parent) {
                let _ = dir.sync_all();
            }
        }
    }
    #[cfg(not(unix))]
    let _ = path;
}
