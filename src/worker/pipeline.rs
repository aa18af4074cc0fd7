use std::ffi::{CString, NulError};
use std::io::Write;
use std::os::fd::{AsRawFd, OwnedFd};

use anyhow::Context;
use log::{debug, warn};
use nix::errno::Errno;
use nix::fcntl::OFlag;
use nix::sys::wait::{waitpid, WaitStatus};
use nix::unistd::{self, ForkResult};
use thiserror::Error;

use crate::client::EventSink;
use crate::clock;
use crate::models::message::Request;
use crate::models::record::Pid;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PipelineError {
    #[error("nothing to execute")]
    Empty,
    #[error("stage {0} of the pipeline is empty")]
    EmptyStage(usize),
    #[error("argument contains a NUL byte: {0}")]
    Nul(#[from] NulError),
}

/// A chain of stages, each stage's stdout feeding the next one's stdin.
#[derive(Debug, Clone, PartialEq)]
pub struct Pipeline {
    text: String,
    stages: Vec<Vec<String>>,
}

/// What happened during one run of a pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineReport {
    /// Pid of the first stage, the identity reported to the monitor.
    pub pid: Pid,
    pub stages: usize,
    pub pipes: usize,
    pub reaped: usize,
    /// Exit code per stage, `None` when it was killed by a signal.
    pub exit_codes: Vec<Option<i32>>,
    pub start_ms: i64,
    pub end_ms: i64,
}

impl PipelineReport {
    pub fn elapsed_ms(&self) -> i64 {
        self.end_ms - self.start_ms
    }
}

impl Pipeline {
    /// Splits `text` on `|` into stages and each stage on whitespace.
    pub fn parse(text: &str) -> Result<Self, PipelineError> {
        if text.trim().is_empty() {
            return Err(PipelineError::Empty);
        }
        let stages = text
            .split('|')
            .enumerate()
            .map(|(index, stage)| {
                let argv: Vec<String> = stage.split_whitespace().map(str::to_string).collect();
                if argv.is_empty() {
                    Err(PipelineError::EmptyStage(index))
                } else {
                    Ok(argv)
                }
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Pipeline {
            text: text.trim().to_string(),
            stages,
        })
    }

    /// One program with its arguments. The monitor only sees the program name.
    pub fn single(argv: Vec<String>) -> Result<Self, PipelineError> {
        let program = argv.first().ok_or(PipelineError::Empty)?.clone();
        Ok(Pipeline {
            text: program,
            stages: vec![argv],
        })
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn stages(&self) -> &[Vec<String>] {
        &self.stages
    }

    fn c_argvs(&self) -> Result<Vec<Vec<CString>>, PipelineError> {
        self.stages
            .iter()
            .map(|argv| {
                argv.iter()
                    .map(|arg| CString::new(arg.as_str()))
                    .collect::<Result<Vec<_>, _>>()
                    .map_err(PipelineError::from)
            })
            .collect()
    }

    /// Runs every stage, sends `start`/`end` to `sink` and prints the
    /// `Running PID` / `Ended in` lines to `out`.
    ///
    /// Blocks until every stage has been reaped. A stage whose program cannot
    /// be executed exits on its own; the others keep running.
    pub fn run(
        &self,
        sink: &mut dyn EventSink,
        out: &mut dyn Write,
    ) -> anyhow::Result<PipelineReport> {
        let argvs = self.c_argvs()?;
        let pipes = (1..self.stages.len())
            .map(|_| unistd::pipe2(OFlag::O_CLOEXEC))
            .collect::<nix::Result<Vec<_>>>()
            .context("Failed to create pipe")?;
        let pipe_count = pipes.len();

        let mut children = Vec::with_capacity(argvs.len());
        let start_ms = clock::now_ms();
        let launched = self.launch(&argvs, &pipes, &mut children, start_ms, sink, out);

        // The parent never touches pipeline data
        drop(pipes);

        let exit_codes = reap(&children);
        let end_ms = clock::now_ms();
        launched?;

        let pid = children[0].as_raw();
        let report = PipelineReport {
            pid,
            stages: children.len(),
            pipes: pipe_count,
            reaped: exit_codes.len(),
            exit_codes: exit_codes.into_iter().map(|(_, code)| code).collect(),
            start_ms,
            end_ms,
        };

        writeln!(out, "Ended in {} ms", report.elapsed_ms())?;
        out.flush()?;
        sink.send(&Request::End { pid, end_ms })?;
        Ok(report)
    }

    fn launch(
        &self,
        argvs: &[Vec<CString>],
        pipes: &[(OwnedFd, OwnedFd)],
        children: &mut Vec<unistd::Pid>,
        start_ms: i64,
        sink: &mut dyn EventSink,
        out: &mut dyn Write,
    ) -> anyhow::Result<()> {
        for (index, argv) in argvs.iter().enumerate() {
            let child = spawn_stage(index, argv, pipes)
                .with_context(|| format!("Failed to fork stage {}", index))?;
            children.push(child);

            if index == 0 {
                let pid = child.as_raw();
                writeln!(out, "Running PID {}", pid)?;
                out.flush()?;
                sink.send(&Request::Start {
                    pid,
                    program: self.text.clone(),
                    start_ms,
                })?;
            }
        }
        Ok(())
    }
}

/// Forks stage `index`: stdin from pipe `index - 1`, stdout into pipe `index`.
fn spawn_stage(
    index: usize,
    argv: &[CString],
    pipes: &[(OwnedFd, OwnedFd)],
) -> nix::Result<unistd::Pid> {
    // Built before forking so the child never allocates
    let failure_prefix = format!("{}: ", argv[0].to_string_lossy());
    let mut argv_ptrs: Vec<*const libc::c_char> = argv.iter().map(|arg| arg.as_ptr()).collect();
    argv_ptrs.push(std::ptr::null());

    // SAFETY: the child only calls dup2, close, execvp, write and _exit on
    // memory prepared above, all async-signal-safe.
    match unsafe { unistd::fork()? } {
        ForkResult::Parent { child } => {
            debug!("Stage {} {:?} forked as {}", index, argv[0], child);
            Ok(child)
        }
        ForkResult::Child => {
            if index > 0 {
                if let Err(e) = unistd::dup2(pipes[index - 1].0.as_raw_fd(), libc::STDIN_FILENO) {
                    exit_child(&failure_prefix, e);
                }
            }
            if index < pipes.len() {
                if let Err(e) = unistd::dup2(pipes[index].1.as_raw_fd(), libc::STDOUT_FILENO) {
                    exit_child(&failure_prefix, e);
                }
            }
            for (read, write) in pipes {
                let _ = unistd::close(read.as_raw_fd());
                let _ = unistd::close(write.as_raw_fd());
            }

            // `argv_ptrs` is null-terminated and its strings outlive the call
            unsafe { libc::execvp(argv_ptrs[0], argv_ptrs.as_ptr()) };
            exit_child(&failure_prefix, Errno::last())
        }
    }
}

fn exit_child(prefix: &str, err: Errno) -> ! {
    let desc = err.desc();
    // SAFETY: plain writes to stderr followed by _exit, no unwinding in the child.
    unsafe {
        libc::write(libc::STDERR_FILENO, prefix.as_ptr().cast(), prefix.len());
        libc::write(libc::STDERR_FILENO, desc.as_ptr().cast(), desc.len());
        libc::write(libc::STDERR_FILENO, b"\n".as_ptr().cast(), 1);
        libc::_exit(127)
    }
}

/// Waits for every child. Returns one entry per child that was reaped.
fn reap(children: &[unistd::Pid]) -> Vec<(unistd::Pid, Option<i32>)> {
    let mut reaped = Vec::with_capacity(children.len());
    for &child in children {
        let status = loop {
            match waitpid(child, None) {
                Err(Errno::EINTR) => continue,
                other => break other,
            }
        };
        match status {
            Ok(WaitStatus::Exited(pid, code)) => reaped.push((pid, Some(code))),
            Ok(WaitStatus::Signaled(pid, signal, _)) => {
                debug!("Stage {} killed by {:?}", pid, signal);
                reaped.push((pid, None));
            }
            Ok(other) => {
                debug!("Unexpected wait status {:?}", other);
                reaped.push((child, None));
            }
            Err(e) => warn!("Failed to wait for {}: {}", child, e),
        }
    }
    reaped
}
