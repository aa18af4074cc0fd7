use std::path::PathBuf;

use crate::fifo::FifoPaths;
use crate::manager::registry::DEFAULT_CAPACITY;

pub const DEFAULT_FIFO_DIR: &str = "tmp";
pub const FIFO_DIR_ENV: &str = "TASK_MONITOR_FIFO_DIR";
pub const MAX_RECORDS_ENV: &str = "TASK_MONITOR_MAX_RECORDS";

#[derive(Debug, Clone, PartialEq)]
pub struct MonitorConfig {
    /// Where per-pid scratch files are written.
    pub output_dir: PathBuf,
    pub fifo_dir: PathBuf,
    pub max_records: usize,
}

impl MonitorConfig {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            fifo_dir: PathBuf::from(DEFAULT_FIFO_DIR),
            max_records: DEFAULT_CAPACITY,
        }
    }

    pub fn fifo_paths(&self) -> FifoPaths {
        FifoPaths::in_dir(&self.fifo_dir)
    }
}
