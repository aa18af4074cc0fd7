use std::fs;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use log::info;

use crate::config::{MonitorConfig, DEFAULT_FIFO_DIR, FIFO_DIR_ENV, MAX_RECORDS_ENV};
use crate::manager::monitor::Monitor;
use crate::manager::registry::DEFAULT_CAPACITY;
use crate::scratch::ScratchStore;

#[derive(Parser, Debug)]
#[command(name = "monitor", version, about = "Records execution times reported by tracer clients")]
pub struct Cli {
    /// Directory where per-pid scratch files are written
    pub output_dir: PathBuf,

    /// Directory holding the server and client FIFOs
    #[arg(long, env = FIFO_DIR_ENV, default_value = DEFAULT_FIFO_DIR)]
    pub fifo_dir: PathBuf,

    /// Maximum number of executions kept in memory
    #[arg(long, env = MAX_RECORDS_ENV, default_value_t = DEFAULT_CAPACITY)]
    pub max_records: usize,
}

impl From<Cli> for MonitorConfig {
    fn from(cli: Cli) -> Self {
        MonitorConfig {
            output_dir: cli.output_dir,
            fifo_dir: cli.fifo_dir,
            max_records: cli.max_records,
        }
    }
}

/// Serves requests until an OS-level failure stops the monitor.
pub fn run(config: MonitorConfig) -> anyhow::Result<()> {
    for dir in [&config.output_dir, &config.fifo_dir] {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create directory {}", dir.display()))?;
    }
    info!(
        "Starting monitor: scratch files in {}, up to {} records",
        config.output_dir.display(),
        config.max_records
    );

    let monitor = Monitor::new(ScratchStore::new(&config.output_dir), config.max_records);
    monitor.serve(config.fifo_paths())
}
