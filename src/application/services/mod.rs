pub mod active_runs;
pub mod attempt_log;
pub mod transport;
