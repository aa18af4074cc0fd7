use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use super::record::Pid;

/// One line of the client-to-service protocol.
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    Start {
        pid: Pid,
        program: String,
        start_ms: i64,
    },
    End {
        pid: Pid,
        end_ms: i64,
    },
    Status,
    StatsTime(Vec<Pid>),
    StatsCommand {
        name: String,
        pids: Vec<Pid>,
    },
    StatsUniq(Vec<Pid>),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProtocolError {
    #[error("empty request")]
    Empty,
    #[error("unknown verb: {0}")]
    UnknownVerb(String),
    #[error("`{verb}` expects {expected}, got {got} token(s)")]
    TokenCount {
        verb: &'static str,
        expected: &'static str,
        got: usize,
    },
    #[error("invalid integer `{0}`")]
    InvalidInteger(String),
}

impl Request {
    pub fn verb(&self) -> &'static str {
        match self {
            Request::Start { .. } => "start",
            Request::End { .. } => "end",
            Request::Status => "status",
            Request::StatsTime(_) => "stats-time",
            Request::StatsCommand { .. } => "stats-command",
            Request::StatsUniq(_) => "stats-uniq",
        }
    }

    /// Query verbs get exactly one reply on the outbound FIFO.
    pub fn expects_reply(&self) -> bool {
        !matches!(self, Request::Start { .. } | Request::End { .. })
    }

    /// Wire form including the trailing newline.
    pub fn to_line(&self) -> String {
        format!("{self}\n")
    }
}

fn parse_int<T: FromStr>(token: &str) -> Result<T, ProtocolError> {
    token
        .parse()
        .map_err(|_| ProtocolError::InvalidInteger(token.to_string()))
}

fn parse_pids(tokens: &[&str]) -> Result<Vec<Pid>, ProtocolError> {
    tokens.iter().map(|token| parse_int(token)).collect()
}

impl FromStr for Request {
    type Err = ProtocolError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        let Some((verb, args)) = tokens.split_first() else {
            return Err(ProtocolError::Empty);
        };

        match *verb {
            "start" => {
                // The program may itself be a pipeline with spaces in it.
                if args.len() < 3 {
                    return Err(ProtocolError::TokenCount {
                        verb: "start",
                        expected: "<pid> <program> <start_ms>",
                        got: args.len(),
                    });
                }
                let last = args.len() - 1;
                Ok(Request::Start {
                    pid: parse_int(args[0])?,
                    program: args[1..last].join(" "),
                    start_ms: parse_int(args[last])?,
                })
            }
            "end" => match args {
                [pid, end_ms] => Ok(Request::End {
                    pid: parse_int(pid)?,
                    end_ms: parse_int(end_ms)?,
                }),
                _ => Err(ProtocolError::TokenCount {
                    verb: "end",
                    expected: "<pid> <end_ms>",
                    got: args.len(),
                }),
            },
            "status" => match args {
                [] => Ok(Request::Status),
                _ => Err(ProtocolError::TokenCount {
                    verb: "status",
                    expected: "no arguments",
                    got: args.len(),
                }),
            },
            "stats-time" => Ok(Request::StatsTime(parse_pids(args)?)),
            "stats-command" => match args.split_first() {
                Some((name, pids)) => Ok(Request::StatsCommand {
                    name: name.to_string(),
                    pids: parse_pids(pids)?,
                }),
                None => Err(ProtocolError::TokenCount {
                    verb: "stats-command",
                    expected: "<name> <pid>...",
                    got: 0,
                }),
            },
            "stats-uniq" => Ok(Request::StatsUniq(parse_pids(args)?)),
            other => Err(ProtocolError::UnknownVerb(other.to_string())),
        }
    }
}

fn write_pids(f: &mut fmt::Formatter<'_>, pids: &[Pid]) -> fmt::Result {
    for pid in pids {
        write!(f, " {pid}")?;
    }
    Ok(())
}

impl fmt::Display for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Request::Start {
                pid,
                program,
                start_ms,
            } => write!(f, "start {pid} {program} {start_ms}"),
            Request::End { pid, end_ms } => write!(f, "end {pid} {end_ms}"),
            Request::Status => f.write_str("status"),
            Request::StatsTime(pids) => {
                f.write_str("stats-time")?;
                write_pids(f, pids)
            }
            Request::StatsCommand { name, pids } => {
                write!(f, "stats-command {name}")?;
                write_pids(f, pids)
            }
            Request::StatsUniq(pids) => {
                f.write_str("stats-uniq")?;
                write_pids(f, pids)
            }
        }
    }
}
