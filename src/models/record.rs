/// OS process identifier as carried on the wire.
pub type Pid = i32;

/// One tracked execution.
///
/// While `running` is set, `timestamp` holds the start time in milliseconds
/// since the epoch. Once finished it holds the elapsed duration in
/// milliseconds.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessRecord {
    pub pid: Pid,
    pub program_name: String,
    pub timestamp: i64,
    pub running: bool,
}

impl ProcessRecord {
    pub fn started(pid: Pid, program_name: String, start_ms: i64) -> Self {
        Self {
            pid,
            program_name,
            timestamp: start_ms,
            running: true,
        }
    }

    /// Turns a running record into a finished one. Returns the elapsed time.
    pub fn finish(&mut self, end_ms: i64) -> i64 {
        let elapsed = end_ms - self.timestamp;
        self.timestamp = elapsed;
        self.running = false;
        elapsed
    }

    pub fn is_finished(&self) -> bool {
        !self.running
    }
}
