use std::{io::Write, path::Path, sync::Arc};

use tokio::task::JoinSet;
use tracing::{debug, dispatcher, info, Span};

use crate::common::{FileLayout, KeyValue, MapReduceApp};
use crate::durable;
use crate::error::{Result, WorkerError};
use crate::partition::partition;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapOutcome {
    /// Records written to each partition, indexed by partition id.
    pub records_per_partition: Vec<usize>,
}

impl MapOutcome {
    pub fn total_records(&self) -> usize {
        self.records_per_partition.iter().sum()
    }
}

/// Runs map over one input file and commits `n_reduce` intermediate files,
/// one per partition, empty ones included.
pub async fn run_map_task(
    app: Arc<dyn MapReduceApp>,
    layout: &FileLayout,
    task_id: usize,
    input: &Path,
    n_reduce: usize,
) -> Result<MapOutcome> {
    if n_reduce == 0 {
        return Err(WorkerError::InvalidTask(format!(
            "map task {} asks for zero reduce partitions",
            task_id
        )));
    }

    let bytes = tokio::fs::read(input)
        .await
        .map_err(|source| WorkerError::InputUnreadable {
            path: input.to_path_buf(),
            source,
        })?;
    info!("map read: {:?} ({} bytes)", input, bytes.len());
    // input is not required to be UTF-8; bad sequences become U+FFFD
    let contents = String::from_utf8_lossy(&bytes);

    let filename = input.to_string_lossy();
    let key_values = app.map(&filename, &contents);
    let buckets = split_into_buckets(key_values, n_reduce);
    let records_per_partition = buckets.iter().map(Vec::len).collect();

    let mut commits = JoinSet::new();
    for (reduce_id, bucket) in buckets.into_iter().enumerate() {
        let path = layout.construct_i_file_path(task_id, reduce_id);
        // blocking threads inherit neither the task span nor a scoped subscriber
        let span = Span::current();
        let dispatch = dispatcher::get_default(|d| d.clone());
        commits.spawn_blocking(move || {
            dispatcher::with_default(&dispatch, || {
                span.in_scope(|| {
                    durable::commit_with(&path, |w| encode_bucket(w, &bucket))?;
                    debug!("map write: {:?} ({} records)", path, bucket.len());
                    Ok::<_, WorkerError>(())
                })
            })
        });
    }
    // dropping the set on an early return aborts whatever has not started
    while let Some(joined) = commits.join_next().await {
        joined??;
    }

    Ok(MapOutcome {
        records_per_partition,
    })
}

pub(crate) fn split_into_buckets(
    key_values: Vec<KeyValue>,
    n_reduce: usize,
) -> Vec<Vec<KeyValue>> {
    let mut buckets: Vec<Vec<KeyValue>> = (0..n_reduce).map(|_| Vec::new()).collect();
    for kv in key_values {
        let idx = partition(&kv.key, n_reduce);
        buckets[idx].push(kv);
    }
    buckets
}

/// One JSON object per line.
fn encode_bucket<W: Write>(w: &mut W, bucket: &[KeyValue]) -> std::io::Result<()> {
    for kv in bucket {
        serde_json::to_writer(&mut *w, kv)?;
        w.write_all(b"\n")?;
    }
    Ok(())
}
