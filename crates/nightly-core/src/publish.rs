//! Artifact publishing.
//!
//! A run assembles its site in a staging directory next to the publish
//! directory and swaps it into place at the end, so visitors see either the
//! previous site (with the placeholder page) or the complete new one.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::{NamedTempFile, TempDir};
use tracing::{debug, warn};

use crate::error::{NightlyError, Result};

/// Name of the lock file guarding the log directory during a run.
pub const LOCK_FILE: &str = "nightly.lock";

/// Directory in which the next site is assembled.
pub struct StagingArea {
    dir: TempDir,
    publish_dir: PathBuf,
}

impl StagingArea {
    /// Create an empty staging directory beside `publish_dir`.
    pub fn create(publish_dir: &Path) -> Result<Self> {
        let parent = parent_dir(publish_dir);
        let dir = tempfile::Builder::new()
            .prefix(".nightly-staging-")
            .tempdir_in(parent)?;
        set_mode(dir.path(), 0o755)?;
        Ok(Self {
            dir,
            publish_dir: publish_dir.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Replace the publish directory with the staged tree.
    ///
    /// Returns the number of top-level entries published. If the staging area
    /// is dropped without swapping, it is deleted and the live site is left alone.
    /// If the staged tree cannot be moved in, the previous site is put back.
    pub fn swap_into_place(self) -> Result<usize> {
        self.swap_with(|from, to| fs::rename(from, to))
    }

    fn swap_with(self, rename: impl Fn(&Path, &Path) -> std::io::Result<()>) -> Result<usize> {
        let entries = fs::read_dir(self.dir.path())?.count();
        let parent = parent_dir(&self.publish_dir);

        // The old site moves into a scratch directory that is removed on drop.
        let retired = tempfile::Builder::new()
            .prefix(".nightly-previous-")
            .tempdir_in(parent)?;
        let previous = retired.path().join("site");
        let had_previous = self.publish_dir.exists();
        if had_previous {
            rename(&self.publish_dir, &previous)?;
        }
        if let Err(e) = rename(self.dir.path(), &self.publish_dir) {
            if had_previous {
                if let Err(restore) = rename(&previous, &self.publish_dir) {
                    let kept = retired.keep();
                    warn!(
                        previous = %kept.join("site").display(),
                        error = %restore,
                        "could not restore previous site"
                    );
                }
            }
            return Err(e.into());
        }
        debug!(publish_dir = %self.publish_dir.display(), "staged site swapped in");
        Ok(entries)
    }
}

fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    }
}

#[cfg(unix)]
fn set_mode(path: &Path, mode: u32) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(mode))?;
    Ok(())
}

#[cfg(not(unix))]
fn set_mode(_path: &Path, _mode: u32) -> Result<()> {
    Ok(())
}

/// Write `contents` to `path` via a temp file in the same directory and a rename.
pub fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let dir = parent_dir(path);
    fs::create_dir_all(dir)?;
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(contents.as_bytes())?;
    set_mode(tmp.path(), 0o644)?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Copy one file, creating the destination's parent directory.
pub fn copy_file(src: &Path, dest: &Path) -> Result<u64> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)?;
    }
    Ok(fs::copy(src, dest)?)
}

/// Recursively copy `src` into a new directory `dest`. Returns files copied.
pub fn copy_tree(src: &Path, dest: &Path) -> Result<u64> {
    fs::create_dir_all(dest)?;
    let mut copied = 0;
    for entry in fs::read_dir(src)? {
        let entry = entry?;
        let target = dest.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copied += copy_tree(&entry.path(), &target)?;
        } else {
            fs::copy(entry.path(), &target)?;
            copied += 1;
        }
    }
    Ok(copied)
}

/// Names of the entries of `dir` accepted by `keep`, sorted.
///
/// Sorting makes rendered link lists independent of directory order.
pub fn sorted_entries(dir: &Path, keep: impl Fn(&str) -> bool) -> Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in fs::read_dir(dir)? {
        let name = entry?.file_name().to_string_lossy().into_owned();
        if keep(&name) {
            names.push(name);
        }
    }
    names.sort();
    Ok(names)
}

/// Delete the `*.log` files of `log_dir`. Returns how many were removed.
pub fn clear_logs(log_dir: &Path) -> Result<usize> {
    let mut removed = 0;
    for name in sorted_entries(log_dir, |n| n.ends_with(".log"))? {
        let path = log_dir.join(&name);
        if path.is_file() {
            fs::remove_file(&path)?;
            removed += 1;
        }
    }
    Ok(removed)
}

/// Exclusive marker that a run owns the log and publish directories.
///
/// The lock file holds the owner's PID. Released when dropped; a lock whose
/// owner is no longer running is reclaimed.
#[derive(Debug)]
pub struct RunLock {
    path: PathBuf,
}

impl RunLock {
    pub fn acquire(log_dir: &Path) -> Result<Self> {
        let path = log_dir.join(LOCK_FILE);
        match Self::create(&path) {
            Err(NightlyError::RunInProgress(_)) if lock_is_stale(&path) => {
                warn!(path = %path.display(), "reclaiming lock left by a run that is gone");
                match fs::remove_file(&path) {
                    Err(e) if e.kind() != std::io::ErrorKind::NotFound => return Err(e.into()),
                    _ => {}
                }
                Self::create(&path)
            }
            other => other,
        }
    }

    /// Publish a complete lock file, failing if one already exists.
    fn create(path: &Path) -> Result<Self> {
        let mut tmp = NamedTempFile::new_in(parent_dir(path))?;
        writeln!(tmp, "{}", std::process::id())?;
        match tmp.persist_noclobber(path) {
            Ok(_) => Ok(Self {
                path: path.to_path_buf(),
            }),
            Err(e) if e.error.kind() == std::io::ErrorKind::AlreadyExists => {
                Err(NightlyError::RunInProgress(path.to_path_buf()))
            }
            Err(e) => Err(e.error.into()),
        }
    }
}

/// Whether the lock at `path` names no live process.
fn lock_is_stale(path: &Path) -> bool {
    let Ok(contents) = fs::read_to_string(path) else {
        // Gone already: the next create decides.
        return true;
    };
    match contents.trim().parse::<i32>() {
        Ok(pid) if pid > 0 => !process_is_running(pid),
        _ => true,
    }
}

#[cfg(unix)]
fn process_is_running(pid: i32) -> bool {
    use nix::errno::Errno;
    use nix::sys::signal::kill;
    use nix::unistd::Pid;

    !matches!(kill(Pid::from_raw(pid), None), Err(Errno::ESRCH))
}

#[cfg(not(unix))]
fn process_is_running(_pid: i32) -> bool {
    true
}

impl Drop for RunLock {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            warn!(path = %self.path.display(), error = %e, "failed to release run lock");
        }
    }
}
