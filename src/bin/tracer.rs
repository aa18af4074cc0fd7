use clap::Parser;
use env_logger::Env;

use task_monitor::app::tracer_cli::{self, Cli};

fn main() {
    env_logger::Builder::from_env(Env::default().default_filter_or("warn")).init();

    // Usage errors exit with 1, help and version with 0
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            std::process::exit(if err.use_stderr() { 1 } else { 0 });
        }
    };

    if let Err(err) = tracer_cli::run(cli) {
        eprintln!("Error: {:#}", err);
        std::process::exit(1);
    }
}
