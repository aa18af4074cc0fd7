pub mod app;
pub mod client;
pub mod clock;
pub mod config;
pub mod fifo;
pub mod manager;
pub mod models;
pub mod scratch;
pub mod worker;
