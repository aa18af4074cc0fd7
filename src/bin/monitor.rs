use clap::Parser;
use env_logger::Env;

use task_monitor::app::monitor_cli::{self, Cli};

fn main() {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            std::process::exit(if err.use_stderr() { 1 } else { 0 });
        }
    };

    if let Err(err) = monitor_cli::run(cli.into()) {
        eprintln!("Error: {:#}", err);
        std::process::exit(1);
    }
}
