//! Worker side of the coordinator protocol.
//!
//! Every call dials the coordinator's Unix socket, writes one JSON line
//! `{"method": .., "args": ..}`, reads one JSON line back (`{"reply": ..}` or
//! `{"error": ..}`) and hangs up. Failures are not retried.

use std::{io, path::PathBuf};

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tokio::{
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
    net::UnixStream,
};
use tracing::trace;

use crate::error::{Result, WorkerError};

pub const HEARTBEAT_METHOD: &str = "Coordinator.Heartbeat";
pub const REPORT_METHOD: &str = "Coordinator.Report";

pub const JOB_MAP: &str = "map";
pub const JOB_REDUCE: &str = "reduce";
pub const JOB_WAIT: &str = "wait";
pub const JOB_DONE: &str = "done";

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulePhase {
    Map,
    Reduce,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct HeartbeatRequest {}

/// Raw reply to a heartbeat. `job_type` is kept as text so an unexpected
/// value reaches the worker and can be rejected there. The numeric fields are
/// optional on the wire; which ones must be present depends on the job type.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct HeartbeatResponse {
    pub job_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_path: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub n_map: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub n_reduce: Option<usize>,
}

impl HeartbeatResponse {
    pub fn map(id: usize, file_path: impl Into<PathBuf>, n_map: usize, n_reduce: usize) -> Self {
        Self {
            job_type: JOB_MAP.into(),
            id: Some(id),
            file_path: Some(file_path.into()),
            n_map: Some(n_map),
            n_reduce: Some(n_reduce),
        }
    }

    pub fn reduce(id: usize, n_map: usize, n_reduce: usize) -> Self {
        Self {
            job_type: JOB_REDUCE.into(),
            id: Some(id),
            file_path: None,
            n_map: Some(n_map),
            n_reduce: Some(n_reduce),
        }
    }

    pub fn wait() -> Self {
        Self {
            job_type: JOB_WAIT.into(),
            ..Default::default()
        }
    }

    pub fn done() -> Self {
        Self {
            job_type: JOB_DONE.into(),
            ..Default::default()
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportRequest {
    pub id: usize,
    pub phase: SchedulePhase,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct ReportResponse {}

/// A validated heartbeat reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Assignment {
    Map {
        id: usize,
        file_path: PathBuf,
        n_reduce: usize,
    },
    Reduce {
        id: usize,
        n_map: usize,
    },
    Wait,
    Done,
}

fn required<T>(field: Option<T>, job_type: &str, name: &str) -> Result<T> {
    field.ok_or_else(|| WorkerError::InvalidTask(format!("{} task without `{}`", job_type, name)))
}

impl TryFrom<HeartbeatResponse> for Assignment {
    type Error = WorkerError;

    fn try_from(resp: HeartbeatResponse) -> Result<Self> {
        match resp.job_type.as_str() {
            JOB_MAP => {
                let id = required(resp.id, JOB_MAP, "id")?;
                let file_path = required(resp.file_path, JOB_MAP, "file_path")?;
                let n_reduce = required(resp.n_reduce, JOB_MAP, "n_reduce")?;
                if n_reduce == 0 {
                    return Err(WorkerError::InvalidTask(format!(
                        "map task {} asks for zero reduce partitions",
                        id
                    )));
                }
                Ok(Assignment::Map {
                    id,
                    file_path,
                    n_reduce,
                })
            }
            JOB_REDUCE => Ok(Assignment::Reduce {
                id: required(resp.id, JOB_REDUCE, "id")?,
                n_map: required(resp.n_map, JOB_REDUCE, "n_map")?,
            }),
            JOB_WAIT => Ok(Assignment::Wait),
            JOB_DONE => Ok(Assignment::Done),
            other => Err(WorkerError::UnknownPhase(other.to_string())),
        }
    }
}

/// The two calls a worker makes. Tests swap in an in-memory script.
#[async_trait]
pub trait Coordinator: Send {
    async fn heartbeat(&mut self) -> Result<HeartbeatResponse>;
    async fn report(&mut self, id: usize, phase: SchedulePhase) -> Result<()>;
}

#[derive(Serialize)]
struct Call<'a, A> {
    method: &'a str,
    args: &'a A,
}

#[derive(Deserialize)]
struct Reply<R> {
    reply: Option<R>,
    error: Option<String>,
}

pub struct RpcClient {
    socket: PathBuf,
}

impl RpcClient {
    pub fn new(socket: impl Into<PathBuf>) -> Self {
        Self {
            socket: socket.into(),
        }
    }

    pub async fn call<A, R>(&self, method: &'static str, args: &A) -> Result<R>
    where
        A: Serialize + Sync,
        R: DeserializeOwned,
    {
        let transport = |source| WorkerError::Transport { method, source };
        let protocol = |source| WorkerError::Protocol { method, source };

        let mut request = serde_json::to_vec(&Call { method, args }).map_err(protocol)?;
        request.push(b'\n');

        let stream = UnixStream::connect(&self.socket).await.map_err(transport)?;
        let (read_half, mut write_half) = stream.into_split();
        write_half.write_all(&request).await.map_err(transport)?;
        write_half.flush().await.map_err(transport)?;

        let mut line = String::new();
        let n = BufReader::new(read_half)
            .read_line(&mut line)
            .await
            .map_err(transport)?;
        if n == 0 {
            return Err(transport(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "coordinator hung up without replying",
            )));
        }
        trace!(method, reply = line.trim_end(), "rpc reply");

        let reply: Reply<R> = serde_json::from_str(&line).map_err(protocol)?;
        match (reply.reply, reply.error) {
            (_, Some(message)) => Err(WorkerError::Remote { method, message }),
            (Some(value), None) => Ok(value),
            (None, None) => Err(WorkerError::Remote {
                method,
                message: "empty reply".into(),
            }),
        }
    }
}

#[async_trait]
impl Coordinator for RpcClient {
    async fn heartbeat(&mut self) -> Result<HeartbeatResponse> {
        self.call(HEARTBEAT_METHOD, &HeartbeatRequest {}).await
    }

    async fn report(&mut self, id: usize, phase: SchedulePhase) -> Result<()> {
        let _: ReportResponse = self
            .call(REPORT_METHOD, &ReportRequest { id, phase })
            .await?;
        Ok(())
    }
}
