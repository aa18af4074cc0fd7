pub mod dispatcher;
pub mod monitor;
pub mod registry;
pub mod stats;
