//! Single writer lock per data directory.
//!
//! The server and the admin tool both rewrite the snapshot file, so only one
//! of them may run against a given data directory at a time. The lock is a
//! Unix socket: the OS drops it when the process dies, so a crash never
//! leaves a lock that blocks the next start.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::io;
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum InstanceLockError {
    #[error("another bridge process is already using {0}")]
    AlreadyRunning(PathBuf),

    #[error("failed to acquire instance lock: {0}")]
    Io(#[from] io::Error),
}

/// Held for as long as the value lives. Dropping it removes the socket.
pub struct InstanceLock {
    _listener: UnixListener,
    path: PathBuf,
}

impl InstanceLock {
    /// Lock `data_dir`, placing the socket in `$XDG_RUNTIME_DIR` (or `/tmp`).
    pub fn acquire(data_dir: &Path) -> Result<Self, InstanceLockError> {
        let runtime_dir = std::env::var_os("XDG_RUNTIME_DIR").map(PathBuf::from);
        Self::acquire_at(socket_path_in(runtime_dir, data_dir), data_dir)
    }

    fn acquire_at(path: PathBuf, data_dir: &Path) -> Result<Self, InstanceLockError> {
        if path.exists() {
            // A live owner accepts connections; a stale socket does not
            if UnixStream::connect(&path).is_ok() {
                return Err(InstanceLockError::AlreadyRunning(data_dir.to_path_buf()));
            }
            let _ = std::fs::remove_file(&path);
        }

        match UnixListener::bind(&path) {
            Ok(listener) => Ok(Self {
                _listener: listener,
                path,
            }),
            Err(e) if e.kind() == io::ErrorKind::AddrInUse => {
                Err(InstanceLockError::AlreadyRunning(data_dir.to_path_buf()))
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for InstanceLock {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

/// Socket path for `data_dir` under `runtime_dir`, falling back to `/tmp`.
pub fn socket_path_in(runtime_dir: Option<PathBuf>, data_dir: &Path) -> PathBuf {
    let mut hasher = DefaultHasher::new();
    data_dir.hash(&mut hasher);
    runtime_dir
        .unwrap_or_else(|| PathBuf::from("/tmp"))
        .join(format!("desktop-app-bridge-{:016x}.sock", hasher.finish()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_socket_path_per_data_dir() {
        let a = socket_path_in(Some(PathBuf::from("/run/user/1000")), Path::new("/data/a"));
        let b = socket_path_in(Some(PathBuf::from("/run/user/1000")), Path::new("/data/b"));

        assert!(a.starts_with("/run/user/1000"));
        assert_ne!(a, b);
        assert_eq!(
            a,
            socket_path_in(Some(PathBuf::from("/run/user/1000")), Path::new("/data/a"))
        );

        let fallback = socket_path_in(None, Path::new("/data/a"));
        assert!(fallback.starts_with("/tmp"));
    }

    #[test]
    fn test_second_acquire_fails_until_dropped() {
        let runtime = tempfile::tempdir().unwrap();
        let data_dir = Path::new("/data/bridge");
        let path = socket_path_in(Some(runtime.path().to_path_buf()), data_dir);

        let first = InstanceLock::acquire_at(path.clone(), data_dir).unwrap();
        assert!(matches!(
            InstanceLock::acquire_at(path.clone(), data_dir),
            Err(InstanceLockError::AlreadyRunning(_))
        ));

        drop(first);
        assert!(!path.exists());
        assert!(InstanceLock::acquire_at(path, data_dir).is_ok());
    }
}
