//! Per-pid scratch files bridging a `start` event to its `end` event.
//!
//! Each file lives at `<dir>/<pid>` and holds `"<program> <value>\n"`.

use std::fs;
use std::io;
use std::path::PathBuf;

use log::trace;
use thiserror::Error;

use crate::models::record::Pid;

#[derive(Debug, Error)]
pub enum ScratchError {
    #[error("scratch file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("malformed scratch record in {path}: {content:?}")]
    Malformed { path: PathBuf, content: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScratchRecord {
    pub program: String,
    pub value: i64,
}

#[derive(Debug, Clone)]
pub struct ScratchStore {
    dir: PathBuf,
}

impl ScratchStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, pid: Pid) -> PathBuf {
        self.dir.join(pid.to_string())
    }

    pub fn put(&self, pid: Pid, record: &ScratchRecord) -> Result<(), ScratchError> {
        let path = self.path_for(pid);
        trace!("Writing scratch record for {} to {}", pid, path.display());
        fs::write(&path, format!("{} {}\n", record.program, record.value))
            .map_err(|source| ScratchError::Io { path, source })
    }

    /// Reads and removes the record for `pid`.
    pub fn take(&self, pid: Pid) -> Result<ScratchRecord, ScratchError> {
        let path = self.path_for(pid);
        let content = fs::read_to_string(&path).map_err(|source| ScratchError::Io {
            path: path.clone(),
            source,
        })?;

        let record = content
            .trim_end()
            .rsplit_once(' ')
            .and_then(|(program, value)| {
                Some(ScratchRecord {
                    program: program.to_string(),
                    value: value.parse().ok()?,
                })
            })
            .ok_or_else(|| ScratchError::Malformed {
                path: path.clone(),
                content: content.clone(),
            })?;

        fs::remove_file(&path).map_err(|source| ScratchError::Io { path, source })?;
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_writes_program_and_value() {
        let dir = tempfile::tempdir().unwrap();
        let store = ScratchStore::new(dir.path());
        let record = ScratchRecord {
            program: "cat a | wc -l".to_string(),
            value: 1234,
        };

        store.put(77, &record).unwrap();

        let content = fs::read_to_string(dir.path().join("77")).unwrap();
        assert_eq!(content, "cat a | wc -l 1234\n");
        assert_eq!(store.take(77).unwrap(), record);
        assert!(!store.path_for(77).exists());
    }

    #[test]
    fn take_missing_pid_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = ScratchStore::new(dir.path());

        assert!(matches!(store.take(5), Err(ScratchError::Io { .. })));
    }

    #[test]
    fn take_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let store = ScratchStore::new(dir.path());
        fs::write(store.path_for(5), "justonetoken\n").unwrap();

        assert!(matches!(store.take(5), Err(ScratchError::Malformed { .. })));
    }
}
