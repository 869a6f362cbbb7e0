//! Host-wide advisory lock marker for the GPIO hardware.
//!
//! The marker is a plain file created with `create_new`, so two processes
//! racing for it cannot both succeed. It is removed when the [`GpioLock`]
//! is dropped.

use chrono::Utc;
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

use super::GpioError;

/// Ownership of the GPIO lock marker.
#[derive(Debug)]
pub struct GpioLock {
    path: PathBuf,
}

impl GpioLock {
    /// Create the marker at `path`, failing with [`GpioError::Busy`] if it exists.
    pub fn acquire(path: &Path) -> Result<Self, GpioError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let mut file = match OpenOptions::new().write(true).create_new(true).open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                warn!(lock = %path.display(), "GPIO already in use by another session");
                return Err(GpioError::Busy {
                    lock_path: path.to_path_buf(),
                });
            }
            Err(e) => return Err(GpioError::Io(e)),
        };

        // From here on the marker is ours; dropping `lock` removes it.
        let lock = Self {
            path: path.to_path_buf(),
        };
        writeln!(
            file,
            "pid={} acquired={}",
            std::process::id(),
            Utc::now().to_rfc3339()
        )?;

        info!(lock = %path.display(), "GPIO lock acquired");
        Ok(lock)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether some session currently holds the marker at `path`.
    pub fn is_held(path: &Path) -> bool {
        path.exists()
    }
}

impl Drop for GpioLock {
    fn drop(&mut self) {
        match fs::remove_file(&self.path) {
            Ok(()) => info!(lock = %self.path.display(), "GPIO lock released"),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                warn!(lock = %self.path.display(), "GPIO lock was already removed")
            }
            Err(e) => error!(lock = %self.path.display(), "failed to release GPIO lock: {}", e),
        }
    }
}
