//! Lock file guarding against overlapping runs

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Exclusive run lock, released on drop
#[derive(Debug)]
pub struct RunLock {
    path: PathBuf,
    // holds the flock for the lifetime of the lock
    _file: File,
}

/// Retries when the lock file is swapped out between open and flock
const MAX_LOCK_ATTEMPTS: usize = 8;

/// Lock file content
#[derive(Debug, Serialize, Deserialize)]
struct LockContent {
    pid: u32,
    started_at: DateTime<Utc>,
}

impl RunLock {
    /// Acquire the lock at `path`
    ///
    /// Fails if another live process holds it. A leftover file from a
    /// process that died without cleaning up is reclaimed.
    pub fn acquire(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create lock directory {}", parent.display()))?;
        }

        let mut file = Self::lock_current_file(path)?;

        if let Some(pid) = Self::stale_owner(&mut file) {
            warn!(pid, path = %path.display(), "Reclaiming stale lock file");
        }

        Self::write_lock_content(&mut file)?;
        debug!(path = %path.display(), "Acquired run lock");

        Ok(Self {
            path: path.to_path_buf(),
            _file: file,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Open and flock the file currently at `path`
    ///
    /// A releasing owner unlinks the file, so a flock taken on a handle
    /// opened just before that unlink guards an orphaned inode. Such a
    /// lock is dropped and the open is retried.
    fn lock_current_file(path: &Path) -> Result<File> {
        for _ in 0..MAX_LOCK_ATTEMPTS {
            let mut file = OpenOptions::new()
                .create(true)
                .read(true)
                .write(true)
                .truncate(false)
                .open(path)
                .with_context(|| format!("Failed to open lock file {}", path.display()))?;

            if !try_flock_exclusive(&file)? {
                match Self::read_lock_content(&mut file) {
                    Ok(content) => anyhow::bail!(
                        "Another run is in progress (pid {} since {}, lock file {})",
                        content.pid,
                        content.started_at.to_rfc3339(),
                        path.display()
                    ),
                    Err(_) => anyhow::bail!(
                        "Another run is in progress (lock file {} held)",
                        path.display()
                    ),
                }
            }

            if is_current_file(&file, path)? {
                return Ok(file);
            }
            debug!(path = %path.display(), "Lock file replaced while locking, retrying");
        }

        anyhow::bail!(
            "Failed to lock {} (file kept being replaced)",
            path.display()
        )
    }

    /// Release the lock and remove the file
    pub fn release(self) -> Result<()> {
        std::fs::remove_file(&self.path)
            .with_context(|| format!("Failed to remove lock file {}", self.path.display()))?;
        Ok(())
    }

    /// PID recorded by a previous owner that is no longer running
    fn stale_owner(file: &mut File) -> Option<u32> {
        let content = Self::read_lock_content(file).ok()?;
        (content.pid != std::process::id() && !is_process_alive(content.pid)).then_some(content.pid)
    }

    fn write_lock_content(file: &mut File) -> Result<()> {
        let content = LockContent {
            pid: std::process::id(),
            started_at: Utc::now(),
        };

        let serialized =
            serde_json::to_string(&content).context("Failed to serialize lock content")?;

        file.set_len(0)?;
        file.seek(SeekFrom::Start(0))?;
        file.write_all(serialized.as_bytes())?;
        file.sync_all()?;
        Ok(())
    }

    fn read_lock_content(file: &mut File) -> Result<LockContent> {
        file.seek(SeekFrom::Start(0))?;
        let mut contents = String::new();
        file.read_to_string(&mut contents)?;
        let content: LockContent =
            serde_json::from_str(&contents).context("Failed to deserialize lock content")?;
        Ok(content)
    }
}

impl Drop for RunLock {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

/// Try to acquire an exclusive flock without blocking
#[cfg(unix)]
fn try_flock_exclusive(file: &File) -> Result<bool> {
    use nix::fcntl::{flock, FlockArg};
    use std::os::unix::io::AsRawFd;

    match flock(file.as_raw_fd(), FlockArg::LockExclusiveNonblock) {
        Ok(_) => Ok(true),
        Err(nix::errno::Errno::EWOULDBLOCK) => Ok(false),
        Err(e) => Err(e).context("Failed to lock file"),
    }
}

/// Whether `file` is still the file linked at `path`
#[cfg(unix)]
fn is_current_file(file: &File, path: &Path) -> Result<bool> {
    use std::os::unix::fs::MetadataExt;

    let held = file.metadata().context("Failed to stat lock file")?;
    match std::fs::metadata(path) {
        Ok(linked) => Ok(held.dev() == linked.dev() && held.ino() == linked.ino()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e).with_context(|| format!("Failed to stat {}", path.display())),
    }
}

#[cfg(not(unix))]
fn is_current_file(_file: &File, path: &Path) -> Result<bool> {
    Ok(path.exists())
}

#[cfg(not(unix))]
fn try_flock_exclusive(_file: &File) -> Result<bool> {
    Ok(true)
}

#[cfg(target_os = "linux")]
fn is_process_alive(pid: u32) -> bool {
    Path::new(&format!("/proc/{}", pid)).exists()
}

#[cfg(all(unix, not(target_os = "linux")))]
fn is_process_alive(pid: u32) -> bool {
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;

    // null signal: existence check only
    match kill(Pid::from_raw(pid as i32), None::<Signal>) {
        Ok(_) => true,
        Err(nix::errno::Errno::ESRCH) => false,
        Err(_) => true,
    }
}

#[cfg(not(unix))]
fn is_process_alive(_pid: u32) -> bool {
    true
}
