use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// One record emitted by map and consumed by reduce.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyValue {
    pub key: String,
    pub value: String,
}

impl KeyValue {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// User-supplied map and reduce callbacks.
pub trait MapReduceApp: Send + Sync {
    fn map(&self, filename: &str, contents: &str) -> Vec<KeyValue>;
    fn reduce(&self, key: &str, values: &[String]) -> String;
}

/// Where intermediate and output files live. The names are a pure function of
/// task ids so a reduce task can find its inputs knowing only the map count.
#[derive(Debug, Clone)]
pub struct FileLayout {
    work_dir: PathBuf,
}

impl FileLayout {
    pub fn new(work_dir: impl Into<PathBuf>) -> Self {
        Self {
            work_dir: work_dir.into(),
        }
    }

    pub fn construct_i_file_path(&self, map_id: usize, reduce_id: usize) -> PathBuf {
        self.work_dir.join(format!("mr-{}-{}", map_id, reduce_id))
    }

    pub fn construct_o_file_path(&self, reduce_id: usize) -> PathBuf {
        self.work_dir.join(format!("mr-out-{}", reduce_id))
    }
}
