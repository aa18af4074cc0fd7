pub mod test_monitor;
