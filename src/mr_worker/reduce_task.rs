use std::{collections::HashMap, io, path::Path, sync::Arc};

use tracing::{debug, info};

use crate::common::{FileLayout, KeyValue, MapReduceApp};
use crate::durable;
use crate::error::{Result, WorkerError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReduceOutcome {
    pub keys_written: usize,
    pub records_read: usize,
    /// Map tasks that left no file for this partition.
    pub missing_inputs: usize,
}

/// Merges partition `reduce_id` from map tasks `0..n_map` and commits
/// `mr-out-<reduce_id>`.
pub async fn run_reduce_task(
    app: Arc<dyn MapReduceApp>,
    layout: &FileLayout,
    reduce_id: usize,
    n_map: usize,
) -> Result<ReduceOutcome> {
    let mut intermediate_key_values = Vec::new();
    let mut missing_inputs = 0;
    // ascending map id order decides the order values reach reduce
    for map_id in 0..n_map {
        let path = layout.construct_i_file_path(map_id, reduce_id);
        match read_intermediate(&path).await? {
            Some(mut kvs) => intermediate_key_values.append(&mut kvs),
            None => {
                debug!("reduce: {:?} absent, counting it as empty", path);
                missing_inputs += 1;
            }
        }
    }
    let records_read = intermediate_key_values.len();
    info!(
        "reduce read {} records for partition {} from {} map tasks",
        records_read, reduce_id, n_map
    );

    let grouped_key_values = group_by_key(intermediate_key_values);
    let mut lines = String::new();
    for (key, values) in &grouped_key_values {
        let output = app.reduce(key, values);
        lines.push_str(&format!("{} {}\n", key, output));
    }

    let output_file = layout.construct_o_file_path(reduce_id);
    let payload = lines.into_bytes();
    let target = output_file.clone();
    tokio::task::spawn_blocking(move || durable::commit(&target, &payload)).await??;
    info!("reduce write: {:?}", output_file);

    Ok(ReduceOutcome {
        keys_written: grouped_key_values.len(),
        records_read,
        missing_inputs,
    })
}

/// `Ok(None)` when the file does not exist; that map task produced nothing
/// for this partition.
async fn read_intermediate(path: &Path) -> Result<Option<Vec<KeyValue>>> {
    let contents = match tokio::fs::read_to_string(path).await {
        Ok(contents) => contents,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(WorkerError::IntermediateUnreadable {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    contents
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.is_empty())
        .map(|(idx, line)| {
            serde_json::from_str(line).map_err(|source| WorkerError::Decode {
                path: path.to_path_buf(),
                line: idx + 1,
                source,
            })
        })
        .collect::<Result<Vec<_>>>()
        .map(Some)
}

/// Groups values per key. Keys come out in first-seen order, values in the
/// order they were read.
pub(crate) fn group_by_key(key_values: Vec<KeyValue>) -> Vec<(String, Vec<String>)> {
    let mut slots: HashMap<String, usize> = HashMap::new();
    key_values
        .into_iter()
        .fold(Vec::new(), |mut acc: Vec<(String, Vec<String>)>, kv| {
            match slots.get(&kv.key) {
                Some(&slot) => acc[slot].1.push(kv.value),
                None => {
                    slots.insert(kv.key.clone(), acc.len());
                    acc.push((kv.key, vec![kv.value]));
                }
            }
            acc
        })
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;
    use crate::map_reduce_apps::WordCount;

    /// Joins values with '+' so value order shows up in the output.
    struct Concat;

    impl MapReduceApp for Concat {
        fn map(&self, _filename: &str, _contents: &str) -> Vec<KeyValue> {
            Vec::new()
        }

        fn reduce(&self, _key: &str, values: &[String]) -> String {
            values.join("+")
        }
    }

    fn write_intermediate(layout: &FileLayout, map_id: usize, reduce_id: usize, kvs: &[KeyValue]) {
        let mut text = String::new();
        for kv in kvs {
            text.push_str(&serde_json::to_string(kv).unwrap());
            text.push('\n');
        }
        fs::write(layout.construct_i_file_path(map_id, reduce_id), text).unwrap();
    }

    fn output_lines(layout: &FileLayout, reduce_id: usize) -> Vec<String> {
        let mut lines: Vec<String> = fs::read_to_string(layout.construct_o_file_path(reduce_id))
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect();
        lines.sort();
        lines
    }

    #[test]
    fn grouping_keeps_first_seen_key_order_and_value_order() {
        let grouped = group_by_key(vec![
            KeyValue::new("b", "1"),
            KeyValue::new("a", "2"),
            KeyValue::new("b", "3"),
            KeyValue::new("a", "4"),
        ]);
        assert_eq!(
            grouped,
            vec![
                ("b".to_string(), vec!["1".to_string(), "3".to_string()]),
                ("a".to_string(), vec!["2".to_string(), "4".to_string()]),
            ]
        );
    }

    #[tokio::test]
    async fn count_reduce_writes_key_space_count() {
        let dir = TempDir::new().unwrap();
        let layout = FileLayout::new(dir.path());
        write_intermediate(&layout, 0, 0, &[KeyValue::new("a", "1"), KeyValue::new("a", "1")]);

        let outcome = run_reduce_task(Arc::new(WordCount::new()), &layout, 0, 1)
            .await
            .unwrap();

        assert_eq!(output_lines(&layout, 0), vec!["a 2"]);
        assert_eq!(outcome.keys_written, 1);
        assert_eq!(outcome.records_read, 2);
    }

    #[tokio::test]
    async fn every_key_appears_exactly_once() {
        let dir = TempDir::new().unwrap();
        let layout = FileLayout::new(dir.path());
        write_intermediate(&layout, 0, 1, &[KeyValue::new("x", "1"), KeyValue::new("y", "1")]);
        write_intermediate(&layout, 1, 1, &[KeyValue::new("y", "1"), KeyValue::new("z", "1")]);
        write_intermediate(&layout, 2, 1, &[KeyValue::new("x", "1")]);

        run_reduce_task(Arc::new(WordCount::new()), &layout, 1, 3)
            .await
            .unwrap();

        assert_eq!(output_lines(&layout, 1), vec!["x 2", "y 2", "z 1"]);
    }

    #[tokio::test]
    async fn values_follow_ascending_map_id() {
        let dir = TempDir::new().unwrap();
        let layout = FileLayout::new(dir.path());
        // written out of order on purpose
        write_intermediate(&layout, 2, 0, &[KeyValue::new("k", "c")]);
        write_intermediate(&layout, 0, 0, &[KeyValue::new("k", "a")]);
        write_intermediate(&layout, 1, 0, &[KeyValue::new("k", "b1"), KeyValue::new("k", "b2")]);

        run_reduce_task(Arc::new(Concat), &layout, 0, 3).await.unwrap();

        assert_eq!(output_lines(&layout, 0), vec!["k a+b1+b2+c"]);
    }

    #[tokio::test]
    async fn missing_intermediate_counts_as_empty() {
        let dir = TempDir::new().unwrap();
        let layout = FileLayout::new(dir.path());
        write_intermediate(&layout, 1, 0, &[KeyValue::new("only", "1")]);

        let outcome = run_reduce_task(Arc::new(WordCount::new()), &layout, 0, 3)
            .await
            .unwrap();

        assert_eq!(outcome.missing_inputs, 2);
        assert_eq!(output_lines(&layout, 0), vec!["only 1"]);
    }

    #[tokio::test]
    async fn no_inputs_at_all_commits_an_empty_output() {
        let dir = TempDir::new().unwrap();
        let layout = FileLayout::new(dir.path());

        let outcome = run_reduce_task(Arc::new(WordCount::new()), &layout, 5, 2)
            .await
            .unwrap();

        assert_eq!(outcome.keys_written, 0);
        assert_eq!(
            fs::read_to_string(layout.construct_o_file_path(5)).unwrap(),
            ""
        );
    }

    #[tokio::test]
    async fn corrupt_intermediate_is_fatal_and_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let layout = FileLayout::new(dir.path());
        write_intermediate(&layout, 0, 0, &[KeyValue::new("a", "1")]);
        fs::write(layout.construct_i_file_path(1, 0), "{\"key\":\"a\",\"val").unwrap();

        let err = run_reduce_task(Arc::new(WordCount::new()), &layout, 0, 2)
            .await
            .unwrap_err();

        match err {
            WorkerError::Decode { line, .. } => assert_eq!(line, 1),
            other => panic!("expected Decode, got {:?}", other),
        }
        assert!(!layout.construct_o_file_path(0).exists());
    }

    #[tokio::test]
    async fn unreadable_intermediate_is_fatal() {
        let dir = TempDir::new().unwrap();
        let layout = FileLayout::new(dir.path());
        // a directory where a file should be is an I/O error, not absence
        fs::create_dir(layout.construct_i_file_path(0, 0)).unwrap();

        let err = run_reduce_task(Arc::new(WordCount::new()), &layout, 0, 1)
            .await
            .unwrap_err();

        assert!(matches!(err, WorkerError::IntermediateUnreadable { .. }));
        assert!(!layout.construct_o_file_path(0).exists());
    }
}
