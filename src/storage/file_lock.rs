//! Cross-process advisory lock based on a marker file.
//!
//! The marker is created with `create_new` and holds the owner's pid as plain
//! text. A marker whose pid no longer exists is stale and gets broken; so is a
//! marker that stays unreadable for longer than the stale grace period.
//! Breaking is serialized through an OS advisory lock on `<marker>.break`.
//! Threads of one process share a pid, so a process never breaks its own
//! marker; those threads simply wait their turn.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant, SystemTime};

use chrono::{DateTime, Utc};
use fs2::FileExt;
use tracing::{debug, warn};

use super::json_file::{ensure_private_dir, sibling};
use crate::core::config::LockConfig;
use crate::core::errors::{Result, WalletStateError};

/// Marker path guarding `store`: `<store>.lock`.
pub fn lock_path_for(store: &Path) -> Result<PathBuf> {
    sibling(store, |name| format!("{}.lock", name))
}

/// Held lock. Dropping it releases the marker.
#[derive(Debug)]
pub struct LockHandle {
    path: PathBuf,
    holder_pid: u32,
    acquired_at: DateTime<Utc>,
    released: bool,
}

impl LockHandle {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn holder_pid(&self) -> u32 {
        self.holder_pid
    }

    pub fn acquired_at(&self) -> DateTime<Utc> {
        self.acquired_at
    }

    /// Remove the marker. An already missing marker is not an error.
    pub fn release(mut self) -> Result<()> {
        self.released = true;
        remove_own_marker(&self.path, self.holder_pid).map_err(Into::into)
    }
}

impl Drop for LockHandle {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        if let Err(e) = remove_own_marker(&self.path, self.holder_pid) {
            warn!(path = %self.path.display(), error = %e, "failed to release lock marker");
        }
    }
}

/// Marker-file lock acquisition.
pub struct FileLock;

impl FileLock {
    /// Acquire the lock at `path`, waiting up to `config.timeout()`.
    pub fn acquire(path: &Path, config: &LockConfig) -> Result<LockHandle> {
        let pid = std::process::id();
        let started = Instant::now();
        let timeout = config.timeout();

        if let Some(parent) = path.parent() {
            ensure_private_dir(parent)?;
        }

        loop {
            match create_marker(path, pid) {
                Ok(()) => {
                    debug!(path = %path.display(), pid, "lock acquired");
                    return Ok(LockHandle {
                        path: path.to_path_buf(),
                        holder_pid: pid,
                        acquired_at: Utc::now(),
                        released: false,
                    });
                }
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {}
                Err(e) => return Err(e.into()),
            }

            if let Some(observed) = stale_marker(path, pid, config.stale_grace())? {
                if break_stale(path, &observed)? {
                    // retry right away
                    continue;
                }
            }

            let waited = started.elapsed();
            if waited >= timeout {
                return Err(WalletStateError::LockTimeout {
                    path: path.to_path_buf(),
                    waited_ms: u64::try_from(waited.as_millis()).unwrap_or(u64::MAX),
                });
            }
            thread::sleep(config.poll_interval().min(timeout - waited));
        }
    }
}

/// Run `f` while holding the lock at `path`.
///
/// The lock is released on every exit path, including errors from `f`.
pub fn with_lock<T, F>(path: &Path, config: &LockConfig, f: F) -> Result<T>
where
    F: FnOnce() -> Result<T>,
{
    let handle = FileLock::acquire(path, config)?;
    let out = f();
    let released = handle.release();
    let value = out?;
    released?;
    Ok(value)
}

fn create_marker(path: &Path, pid: u32) -> io::Result<()> {
    let mut options = OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt as _;
        options.mode(0o600);
    }
    let mut file = options.open(path)?;

    let written = file.write_all(pid.to_string().as_bytes()).and_then(|_| file.sync_all());
    if let Err(e) = written {
        drop(file);
        let _ = fs::remove_file(path);
        return Err(e);
    }
    Ok(())
}

/// Contents of the marker at `path` when it may be broken, `None` otherwise.
fn stale_marker(path: &Path, own_pid: u32, grace: Duration) -> Result<Option<String>> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        // released between our create attempt and this read
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    match contents.trim().parse::<u32>() {
        Ok(pid) if pid == own_pid => Ok(None),
        Ok(pid) if pid > 0 => {
            if process_alive(pid) {
                Ok(None)
            } else {
                warn!(path = %path.display(), pid, "lock holder is gone, breaking stale lock");
                Ok(Some(contents))
            }
        }
        _ => {
            // the owner may still be writing its pid
            let age = match fs::metadata(path).and_then(|m| m.modified()) {
                Ok(modified) => SystemTime::now().duration_since(modified).unwrap_or_default(),
                Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
                Err(e) => return Err(e.into()),
            };
            if age > grace {
                warn!(path = %path.display(), age_ms = age.as_millis() as u64, "unreadable lock marker past grace period");
                Ok(Some(contents))
            } else {
                Ok(None)
            }
        }
    }
}

/// Remove a marker judged stale. Returns whether the lock looks free now.
///
/// Breakers serialize on an OS lock over `<marker>.break` and re-read the
/// marker under it; only a marker still holding exactly `observed` is
/// removed. A breaker that finds the guard taken backs off.
fn break_stale(path: &Path, observed: &str) -> Result<bool> {
    let guard_path = sibling(path, |name| format!("{}.break", name))?;
    let guard = open_break_guard(&guard_path)?;
    if let Err(e) = guard.try_lock_exclusive() {
        if e.raw_os_error() == fs2::lock_contended_error().raw_os_error() {
            debug!(path = %path.display(), "another process is breaking this lock");
            return Ok(false);
        }
        return Err(e.into());
    }

    let outcome = match fs::read_to_string(path) {
        Ok(current) if current == observed => fs::remove_file(path).map(|_| true).or_else(|e| {
            if e.kind() == io::ErrorKind::NotFound {
                Ok(true)
            } else {
                Err(e)
            }
        }),
        Ok(_) => {
            debug!(path = %path.display(), "marker changed hands, not breaking");
            Ok(false)
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(true),
        Err(e) => Err(e),
    };

    let _ = FileExt::unlock(&guard);
    Ok(outcome?)
}

fn open_break_guard(path: &Path) -> io::Result<File> {
    let mut options = OpenOptions::new();
    options.create(true).read(true).write(true).truncate(false);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt as _;
        options.mode(0o600);
    }
    options.open(path)
}

fn remove_own_marker(path: &Path, pid: u32) -> io::Result<()> {
    match fs::read_to_string(path) {
        Ok(contents) if contents.trim() != pid.to_string() => {
            warn!(path = %path.display(), holder = %contents.trim(), "lock marker owned by another process, leaving it");
            return Ok(());
        }
        Ok(_) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e),
    }
    match fs::remove_file(path) {
        Ok(()) => {
            debug!(path = %path.display(), "lock released");
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

#[cfg(unix)]
fn process_alive(pid: u32) -> bool {
    let Ok(pid) = libc::pid_t::try_from(pid) else {
        return false;
    };
    // SAFETY: signal 0 performs permission and existence checks only.
    let rc = unsafe { libc::kill(pid, 0) };
    if rc == 0 {
        return true;
    }
    io::Error::last_os_error().raw_os_error() != Some(libc::ESRCH)
}

#[cfg(not(unix))]
fn process_alive(_pid: u32) -> bool {
    true
}
