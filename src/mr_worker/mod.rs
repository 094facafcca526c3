mod map_task;
mod reduce_task;

pub use map_task::{run_map_task, MapOutcome};
pub use reduce_task::{run_reduce_task, ReduceOutcome};

use std::{sync::Arc, time::Duration};

use tracing::{debug, info, info_span, Instrument};
use uuid::Uuid;

use crate::common::{FileLayout, MapReduceApp};
use crate::config::WorkerConfig;
use crate::error::Result;
use crate::rpc::{Assignment, Coordinator, SchedulePhase};

/// What one worker did before the coordinator said it was done.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub map_tasks: usize,
    pub reduce_tasks: usize,
    pub waits: usize,
}

pub struct Worker<C> {
    pub id: String,
    coordinator: C,
    app: Arc<dyn MapReduceApp>,
    layout: FileLayout,
    wait_interval: Duration,
}

impl<C: Coordinator> Worker<C> {
    /// Only `work_dir` and `wait_interval` matter here; the socket belongs to
    /// whichever `Coordinator` the caller built.
    pub fn new(coordinator: C, app: Arc<dyn MapReduceApp>, config: WorkerConfig) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            coordinator,
            app,
            layout: FileLayout::new(config.work_dir),
            wait_interval: config.wait_interval,
        }
    }

    /// Polls for work until the coordinator says the job is done.
    ///
    /// Runs one task at a time and never retries. Any error ends the loop
    /// with the current task unreported.
    pub async fn run(&mut self) -> Result<RunSummary> {
        let span = info_span!("worker", id = %self.id);
        self.poll_loop().instrument(span).await
    }

    async fn poll_loop(&mut self) -> Result<RunSummary> {
        let mut summary = RunSummary::default();
        loop {
            let response = self.coordinator.heartbeat().await?;
            debug!("receive coordinator's heartbeat {:?}", response);

            match Assignment::try_from(response)? {
                Assignment::Map {
                    id,
                    file_path,
                    n_reduce,
                } => {
                    let outcome = run_map_task(
                        Arc::clone(&self.app),
                        &self.layout,
                        id,
                        &file_path,
                        n_reduce,
                    )
                    .instrument(info_span!("map", task = id))
                    .await?;
                    info!(
                        "map task {} done: {} records over {} partitions",
                        id,
                        outcome.total_records(),
                        n_reduce
                    );
                    self.coordinator.report(id, SchedulePhase::Map).await?;
                    summary.map_tasks += 1;
                }
                Assignment::Reduce { id, n_map } => {
                    let outcome = run_reduce_task(Arc::clone(&self.app), &self.layout, id, n_map)
                        .instrument(info_span!("reduce", task = id))
                        .await?;
                    info!(
                        "reduce task {} done: {} keys, {} missing inputs",
                        id, outcome.keys_written, outcome.missing_inputs
                    );
                    self.coordinator.report(id, SchedulePhase::Reduce).await?;
                    summary.reduce_tasks += 1;
                }
                Assignment::Wait => {
                    summary.waits += 1;
                    tokio::time::sleep(self.wait_interval).await;
                }
                Assignment::Done => {
                    info!("job done, worker exiting: {:?}", summary);
                    return Ok(summary);
                }
            }
        }
    }
}
