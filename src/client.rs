use std::io::{self, Write};

use anyhow::Context;
use log::debug;

use crate::fifo::{self, FifoPaths};
use crate::models::message::Request;

/// Destination for the `start`/`end` events of an execution.
pub trait EventSink {
    fn send(&mut self, request: &Request) -> anyhow::Result<()>;
}

/// Talks to a running monitor through its two FIFOs.
#[derive(Debug, Clone)]
pub struct MonitorClient {
    paths: FifoPaths,
}

impl MonitorClient {
    pub fn new(paths: FifoPaths) -> Self {
        Self { paths }
    }

    /// Writes one request line. Blocks until the monitor has the FIFO open.
    pub fn send(&self, request: &Request) -> anyhow::Result<()> {
        let mut server = fifo::open_writer(&self.paths.server)?;
        server
            .write_all(request.to_line().as_bytes())
            .with_context(|| format!("Failed to send `{}` request", request.verb()))?;
        debug!("Sent `{}`", request);
        Ok(())
    }

    /// Sends a query and copies the reply to `out` until the monitor closes
    /// the reply FIFO.
    pub fn query(&self, request: &Request, out: &mut impl Write) -> anyhow::Result<u64> {
        self.send(request)?;
        let mut client = fifo::open_reader(&self.paths.client)?;
        let copied = io::copy(&mut client, out).context("Failed to read monitor reply")?;
        out.flush()?;
        Ok(copied)
    }
}

impl EventSink for MonitorClient {
    fn send(&mut self, request: &Request) -> anyhow::Result<()> {
        MonitorClient::send(self, request)
    }
}
