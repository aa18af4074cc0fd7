use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use anyhow::Context;
use log::{debug, warn};
use nix::sys::stat::Mode;

pub const SERVER_PIPE_NAME: &str = "server_pipe";
pub const CLIENT_PIPE_NAME: &str = "client_pipe";

/// The two named pipes shared by the monitor and its clients.
#[derive(Debug, Clone, PartialEq)]
pub struct FifoPaths {
    /// Client to service requests.
    pub server: PathBuf,
    /// Service to client replies.
    pub client: PathBuf,
}

impl FifoPaths {
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            server: dir.join(SERVER_PIPE_NAME),
            client: dir.join(CLIENT_PIPE_NAME),
        }
    }
}

fn create_fifo(path: &Path) -> anyhow::Result<()> {
    // Remove a stale FIFO left by a previous run
    let _ = nix::unistd::unlink(path);

    nix::unistd::mkfifo(path, Mode::from_bits_truncate(0o666))
        .with_context(|| format!("Failed to create FIFO {}", path.display()))?;
    Ok(())
}

/// Owns both FIFOs on disk and unlinks them when dropped.
#[derive(Debug)]
pub struct FifoGuard {
    paths: FifoPaths,
}

impl FifoGuard {
    pub fn create(paths: FifoPaths) -> anyhow::Result<Self> {
        create_fifo(&paths.server)?;
        create_fifo(&paths.client)?;
        debug!(
            "Created FIFOs {} and {}",
            paths.server.display(),
            paths.client.display()
        );
        Ok(Self { paths })
    }

    pub fn paths(&self) -> &FifoPaths {
        &self.paths
    }
}

impl Drop for FifoGuard {
    fn drop(&mut self) {
        for path in [&self.paths.server, &self.paths.client] {
            if let Err(e) = nix::unistd::unlink(path.as_path()) {
                warn!("Failed to remove FIFO {}: {}", path.display(), e);
            }
        }
    }
}

/// Blocks until a writer opens the other end.
pub fn open_reader(path: &Path) -> anyhow::Result<File> {
    OpenOptions::new()
        .read(true)
        .open(path)
        .with_context(|| format!("Failed to open {} for reading", path.display()))
}

/// Blocks until a reader opens the other end.
pub fn open_writer(path: &Path) -> anyhow::Result<File> {
    OpenOptions::new()
        .write(true)
        .open(path)
        .with_context(|| format!("Failed to open {} for writing", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::fs::FileTypeExt;

    #[test]
    fn guard_creates_and_removes_both_fifos() {
        let dir = tempfile::tempdir().unwrap();
        let paths = FifoPaths::in_dir(dir.path());

        {
            let guard = FifoGuard::create(paths.clone()).unwrap();
            for path in [&guard.paths().server, &guard.paths().client] {
                let kind = std::fs::metadata(path).unwrap().file_type();
                assert!(kind.is_fifo());
            }
        }

        assert!(!paths.server.exists());
        assert!(!paths.client.exists());
    }

    #[test]
    fn create_replaces_stale_file() {
        let dir = tempfile::tempdir().unwrap();
        let paths = FifoPaths::in_dir(dir.path());
        std::fs::write(&paths.server, "stale").unwrap();

        let _guard = FifoGuard::create(paths.clone()).unwrap();

        let kind = std::fs::metadata(&paths.server).unwrap().file_type();
        assert!(kind.is_fifo());
    }
}
