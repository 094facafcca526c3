use std::{io, path::PathBuf};

use thiserror::Error;

pub type Result<T, E = WorkerError> = std::result::Result<T, E>;

/// Every variant is fatal for the current task attempt. The worker stops
/// without reporting and leaves reassignment to the coordinator.
#[derive(Error, Debug)]
pub enum WorkerError {
    #[error("cannot read input file {path:?}: {source}")]
    InputUnreadable { path: PathBuf, source: io::Error },

    #[error("cannot read intermediate file {path:?}: {source}")]
    IntermediateUnreadable { path: PathBuf, source: io::Error },

    #[error("malformed record in {path:?} at line {line}: {source}")]
    Decode {
        path: PathBuf,
        line: usize,
        source: serde_json::Error,
    },

    /// Writing the temporary file failed; the target was not touched.
    #[error("cannot stage {path:?}: {source}")]
    Stage { path: PathBuf, source: io::Error },

    #[error("cannot publish {path:?}: {source}")]
    Publish { path: PathBuf, source: io::Error },

    #[error("transport failure calling {method}: {source}")]
    Transport {
        method: &'static str,
        source: io::Error,
    },

    #[error("coordinator rejected {method}: {message}")]
    Remote {
        method: &'static str,
        message: String,
    },

    #[error("malformed reply to {method}: {source}")]
    Protocol {
        method: &'static str,
        source: serde_json::Error,
    },

    #[error("unexpected job type `{0}`")]
    UnknownPhase(String),

    #[error("invalid task descriptor: {0}")]
    InvalidTask(String),

    #[error("partition commit did not finish: {0}")]
    CommitJoin(#[from] tokio::task::JoinError),
}
