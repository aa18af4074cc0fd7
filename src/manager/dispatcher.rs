use std::sync::{Arc, Mutex, MutexGuard};

use log::{debug, warn};
use thiserror::Error;

use super::registry::{Registry, RegistryError};
use super::stats;
use crate::models::message::Request;
use crate::models::record::{Pid, ProcessRecord};
use crate::scratch::{ScratchRecord, ScratchStore};

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// Applies requests to the one registry the service owns.
///
/// Clones share the same registry, so a request handled through any clone is
/// visible to every later request.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    registry: Arc<Mutex<Registry>>,
    scratch: ScratchStore,
}

impl Dispatcher {
    pub fn new(registry: Registry, scratch: ScratchStore) -> Self {
        Dispatcher {
            registry: Arc::new(Mutex::new(registry)),
            scratch,
        }
    }

    fn registry(&self) -> MutexGuard<'_, Registry> {
        // Records are only appended or finished in place, a panic mid-update
        // cannot leave a half-written entry behind.
        self.registry
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn snapshot(&self) -> Vec<ProcessRecord> {
        self.registry().snapshot()
    }

    /// Handles one request. Returns the reply payload for query verbs.
    pub fn handle(&self, request: Request, now_ms: i64) -> Result<Option<String>, DispatchError> {
        debug!("Handling `{}`", request);
        match request {
            Request::Start {
                pid,
                program,
                start_ms,
            } => {
                self.start(pid, program, start_ms)?;
                Ok(None)
            }
            Request::End { pid, end_ms } => {
                self.end(pid, end_ms)?;
                Ok(None)
            }
            Request::Status => Ok(Some(stats::format_status(&self.snapshot(), now_ms))),
            Request::StatsTime(pids) => Ok(Some(stats::format_total_time(&self.snapshot(), &pids))),
            Request::StatsCommand { name, pids } => Ok(Some(stats::format_command_count(
                &self.snapshot(),
                &name,
                &pids,
            ))),
            Request::StatsUniq(pids) => {
                Ok(Some(stats::format_unique_names(&self.snapshot(), &pids)))
            }
        }
    }

    fn start(&self, pid: Pid, program: String, start_ms: i64) -> Result<(), DispatchError> {
        self.registry().record_start(pid, &program, start_ms)?;
        let record = ScratchRecord {
            program,
            value: start_ms,
        };
        // The registry already holds the start, only the on-disk copy is missing
        if let Err(e) = self.scratch.put(pid, &record) {
            warn!("Kept start of {} but could not write its scratch file: {}", pid, e);
        }
        Ok(())
    }

    fn end(&self, pid: Pid, end_ms: i64) -> Result<(), DispatchError> {
        // Scratch files are only touched for a pid with a running record
        let elapsed = self.registry().record_end(pid, end_ms)?;

        match self.scratch.take(pid) {
            Ok(started) => {
                let finished = ScratchRecord {
                    program: started.program,
                    value: elapsed,
                };
                if let Err(e) = self.scratch.put(pid, &finished) {
                    warn!("Could not store elapsed time for {}: {}", pid, e);
                }
            }
            Err(e) => warn!("No start record on disk for {}: {}", pid, e),
        }
        Ok(())
    }
}
