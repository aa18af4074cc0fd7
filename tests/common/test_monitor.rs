use std::path::PathBuf;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use assert_cmd::assert::Assert;
use assert_cmd::Command;
use tempfile::TempDir;

use task_monitor::app::monitor_cli;
use task_monitor::client::MonitorClient;
use task_monitor::config::{MonitorConfig, FIFO_DIR_ENV};
use task_monitor::fifo::FifoPaths;

/// A monitor serving from a private temporary directory on a background thread.
pub struct TestMonitor {
    dir: TempDir,
    #[allow(dead_code)]
    handle: JoinHandle<anyhow::Result<()>>,
}

impl TestMonitor {
    pub fn launch() -> anyhow::Result<Self> {
        let dir = TempDir::new()?;
        let mut config = MonitorConfig::new(dir.path().join("out"));
        config.fifo_dir = dir.path().join("fifo");
        let paths = config.fifo_paths();

        let handle = thread::spawn(move || monitor_cli::run(config));

        let deadline = Instant::now() + Duration::from_secs(10);
        while !(paths.server.exists() && paths.client.exists()) {
            if handle.is_finished() || Instant::now() > deadline {
                anyhow::bail!("monitor did not create its FIFOs");
            }
            thread::sleep(Duration::from_millis(10));
        }

        Ok(Self { dir, handle })
    }

    pub fn fifo_dir(&self) -> PathBuf {
        self.dir.path().join("fifo")
    }

    #[allow(dead_code)]
    pub fn output_dir(&self) -> PathBuf {
        self.dir.path().join("out")
    }

    pub fn client(&self) -> MonitorClient {
        MonitorClient::new(FifoPaths::in_dir(self.fifo_dir()))
    }

    /// Sends a query and returns the reply text.
    #[allow(dead_code)]
    pub fn query(&self, line: &str) -> String {
        let mut reply = Vec::new();
        self.client()
            .query(&line.parse().unwrap(), &mut reply)
            .unwrap();
        String::from_utf8(reply).unwrap()
    }

    #[allow(dead_code)]
    pub fn tracer(&self) -> Command {
        let mut cmd = Command::cargo_bin("tracer").unwrap();
        cmd.env(FIFO_DIR_ENV, self.fifo_dir());
        cmd.env("RUST_BACKTRACE", "1");
        cmd.timeout(Duration::from_secs(30));
        cmd
    }

    #[allow(dead_code)]
    pub fn send_command(&self, args: &[&str]) -> Assert {
        self.tracer().args(args).assert()
    }
}
