pub mod common;
pub mod config;
pub mod durable;
pub mod error;
pub mod map_reduce_apps;
pub mod mr_worker;
pub mod partition;
pub mod rpc;

pub use common::{FileLayout, KeyValue, MapReduceApp};
pub use config::WorkerConfig;
pub use error::{Result, WorkerError};
pub use mr_worker::{RunSummary, Worker};
