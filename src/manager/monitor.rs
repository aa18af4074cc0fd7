use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::thread::JoinHandle;

use anyhow::{bail, Context};
use crossbeam_channel::{unbounded, Receiver, Sender};
use log::{debug, info, warn};

use super::dispatcher::Dispatcher;
use super::registry::Registry;
use crate::fifo::{self, FifoGuard, FifoPaths};
use crate::models::message::Request;
use crate::scratch::ScratchStore;
use crate::worker::worker::spawn_worker_thread;

/// The long-lived monitoring service.
pub struct Monitor {
    dispatcher: Dispatcher,
    sender: Sender<Request>,
    receiver: Receiver<Request>,
}

impl Monitor {
    pub fn new(scratch: ScratchStore, capacity: usize) -> Self {
        let (sender, receiver) = unbounded();
        Monitor {
            dispatcher: Dispatcher::new(Registry::with_capacity(capacity), scratch),
            sender,
            receiver,
        }
    }

    /// Starts the worker, replying to queries on the FIFO at `reply_path`.
    pub fn start(&self, reply_path: PathBuf) -> JoinHandle<()> {
        spawn_worker_thread(self.receiver.clone(), self.dispatcher.clone(), move |payload| {
            let mut client = fifo::open_writer(&reply_path)?;
            client
                .write_all(payload.as_bytes())
                .with_context(|| format!("Failed to write reply to {}", reply_path.display()))?;
            // Dropping the handle closes the FIFO so the client sees end of stream
            Ok(())
        })
    }

    pub fn submit(&self, request: Request) -> anyhow::Result<()> {
        self.sender
            .send(request)
            .context("Request worker is no longer running")
    }

    /// Parses one inbound line and queues it. Malformed lines are logged and skipped.
    pub fn submit_line(&self, line: &str) -> anyhow::Result<()> {
        if line.trim().is_empty() {
            return Ok(());
        }
        match line.parse::<Request>() {
            Ok(request) => self.submit(request),
            Err(e) => {
                warn!("Ignoring malformed request {:?}: {}", line, e);
                Ok(())
            }
        }
    }

    /// Creates both FIFOs and serves requests until an OS-level failure.
    pub fn serve(&self, paths: FifoPaths) -> anyhow::Result<()> {
        let guard = FifoGuard::create(paths)?;
        let worker = self.start(guard.paths().client.clone());
        info!("Monitor listening on {}", guard.paths().server.display());

        loop {
            if worker.is_finished() {
                bail!("Request worker stopped unexpectedly");
            }

            let server = fifo::open_reader(&guard.paths().server)?;
            for line in BufReader::new(server).lines() {
                match line {
                    Ok(line) => self.submit_line(&line)?,
                    Err(e) => {
                        warn!("Failed to read request: {}", e);
                        break;
                    }
                }
            }
            debug!("All writers closed {}, reopening", guard.paths().server.display());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_lines_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let monitor = Monitor::new(ScratchStore::new(dir.path()), 8);

        monitor.submit_line("launch 1 2").unwrap();
        monitor.submit_line("start 1").unwrap();
        monitor.submit_line("").unwrap();
        monitor.submit_line("status").unwrap();

        assert_eq!(monitor.receiver.len(), 1);
        assert_eq!(monitor.receiver.try_recv(), Ok(Request::Status));
    }
}
