use std::io::{self, Write};
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::client::MonitorClient;
use crate::config::{DEFAULT_FIFO_DIR, FIFO_DIR_ENV};
use crate::fifo::FifoPaths;
use crate::models::message::Request;
use crate::models::record::Pid;
use crate::worker::pipeline::Pipeline;

#[derive(Parser, Debug)]
#[command(name = "tracer", version, about = "Runs programs and queries the execution monitor")]
pub struct Cli {
    /// Directory holding the server and client FIFOs
    #[arg(long, env = FIFO_DIR_ENV, default_value = DEFAULT_FIFO_DIR, global = true)]
    pub fifo_dir: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum Command {
    /// Run a single program (-u) or a pipeline (-p) and report its timing
    Execute(ExecuteArgs),
    /// List running executions with their elapsed time
    Status,
    /// Total execution time of the given pids
    StatsTime {
        #[arg(required = true)]
        pids: Vec<Pid>,
    },
    /// How many of the given pids ran a program
    StatsCommand {
        name: String,
        #[arg(required = true)]
        pids: Vec<Pid>,
    },
    /// Distinct programs run by the given pids
    StatsUniq {
        #[arg(required = true)]
        pids: Vec<Pid>,
    },
}

#[derive(Args, Debug, PartialEq)]
pub struct ExecuteArgs {
    /// Run one program with its arguments
    #[arg(short = 'u', conflicts_with = "pipeline", required_unless_present = "pipeline")]
    pub unique: bool,

    /// Run a `|`-separated pipeline given as one quoted argument
    #[arg(short = 'p')]
    pub pipeline: bool,

    #[arg(
        value_name = "PROGRAM",
        required = true,
        num_args = 1..,
        trailing_var_arg = true,
        allow_hyphen_values = true
    )]
    pub program: Vec<String>,
}

impl ExecuteArgs {
    pub fn to_pipeline(&self) -> anyhow::Result<Pipeline> {
        let pipeline = if self.pipeline {
            Pipeline::parse(&self.program.join(" "))?
        } else {
            Pipeline::single(self.program.clone())?
        };
        Ok(pipeline)
    }
}

impl Command {
    /// The request sent to the monitor, `None` for `execute`.
    pub fn to_request(&self) -> Option<Request> {
        match self {
            Command::Execute(_) => None,
            Command::Status => Some(Request::Status),
            Command::StatsTime { pids } => Some(Request::StatsTime(pids.clone())),
            Command::StatsCommand { name, pids } => Some(Request::StatsCommand {
                name: name.clone(),
                pids: pids.clone(),
            }),
            Command::StatsUniq { pids } => Some(Request::StatsUniq(pids.clone())),
        }
    }
}

pub fn run(cli: Cli) -> anyhow::Result<()> {
    let mut client = MonitorClient::new(FifoPaths::in_dir(&cli.fifo_dir));
    let mut stdout = io::stdout().lock();

    match &cli.command {
        Command::Execute(args) => {
            let pipeline = args.to_pipeline()?;
            pipeline.run(&mut client, &mut stdout)?;
        }
        command => {
            if let Some(request) = command.to_request() {
                client.query(&request, &mut stdout)?;
            }
        }
    }
    stdout.flush()?;
    Ok(())
}
