use std::collections::HashMap;

use log::{debug, info};
use thiserror::Error;

use crate::models::record::{Pid, ProcessRecord};

pub const DEFAULT_CAPACITY: usize = 4096;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RegistryError {
    #[error("registry is full ({capacity} records)")]
    Full { capacity: usize },
    #[error("no running record for pid {0}")]
    NotFound(Pid),
    #[error("pid {0} already has a running record")]
    AlreadyRunning(Pid),
}

/// History of every execution seen by the service.
///
/// Records are kept in creation order and never removed. A pid may appear
/// many times once the OS recycles it, but only one of those records can be
/// running at a time; `running` maps that pid to its index in `records`.
#[derive(Debug)]
pub struct Registry {
    records: Vec<ProcessRecord>,
    running: HashMap<Pid, usize>,
    capacity: usize,
}

impl Default for Registry {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

impl Registry {
    pub fn with_capacity(capacity: usize) -> Self {
        Registry {
            records: Vec::new(),
            running: HashMap::new(),
            capacity,
        }
    }

    pub fn record_start(&mut self, pid: Pid, name: &str, start_ms: i64) -> Result<(), RegistryError> {
        if self.running.contains_key(&pid) {
            return Err(RegistryError::AlreadyRunning(pid));
        }
        if self.records.len() >= self.capacity {
            return Err(RegistryError::Full {
                capacity: self.capacity,
            });
        }

        self.running.insert(pid, self.records.len());
        self.records
            .push(ProcessRecord::started(pid, name.to_string(), start_ms));
        info!("Process {} '{}' started.", pid, name);
        Ok(())
    }

    /// Finalizes the running record for `pid`. Returns the elapsed time.
    pub fn record_end(&mut self, pid: Pid, end_ms: i64) -> Result<i64, RegistryError> {
        let index = self
            .running
            .remove(&pid)
            .ok_or(RegistryError::NotFound(pid))?;
        let record = &mut self.records[index];
        let elapsed = record.finish(end_ms);
        info!("Process {} '{}' finished in {} ms.", pid, record.program_name, elapsed);
        Ok(elapsed)
    }

    pub fn snapshot(&self) -> Vec<ProcessRecord> {
        debug!("Snapshot of {} record(s).", self.records.len());
        self.records.clone()
    }
}
