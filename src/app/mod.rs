pub mod monitor_cli;
pub mod tracer_cli;
