use std::{path::PathBuf, time::Duration};

pub const DEFAULT_SOCKET: &str = "/var/tmp/5840-mr.sock";
pub const DEFAULT_WAIT_MS: u64 = 1000;

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Unix socket the coordinator listens on.
    pub socket: PathBuf,
    /// Directory holding intermediate and output files.
    pub work_dir: PathBuf,
    /// Sleep between polls while the coordinator has nothing to hand out.
    pub wait_interval: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            socket: PathBuf::from(DEFAULT_SOCKET),
            work_dir: PathBuf::from("."),
            wait_interval: Duration::from_millis(DEFAULT_WAIT_MS),
        }
    }
}
