use std::collections::BTreeSet;

use regex::Regex;

use crate::common::{KeyValue, MapReduceApp};

fn words_regex() -> Regex {
    Regex::new(r"\b[a-zA-Z0-9]+\b").expect("invalid regex")
}

pub struct WordCount {
    words: Regex,
}

impl WordCount {
    pub fn new() -> Self {
        Self {
            words: words_regex(),
        }
    }
}

impl Default for WordCount {
    fn default() -> Self {
        Self::new()
    }
}

impl MapReduceApp for WordCount {
    fn map(&self, _filename: &str, contents: &str) -> Vec<KeyValue> {
        self.words
            .find_iter(contents)
            .map(|w| KeyValue::new(w.as_str().to_lowercase(), "1"))
            .collect()
    }

    fn reduce(&self, _key: &str, values: &[String]) -> String {
        values.len().to_string()
    }
}

/// Inverted index: word -> "<count> doc1,doc2,...".
pub struct Indexer {
    words: Regex,
}

impl Indexer {
    pub fn new() -> Self {
        Self {
            words: words_regex(),
        }
    }
}

impl Default for Indexer {
    fn default() -> Self {
        Self::new()
    }
}

impl MapReduceApp for Indexer {
    fn map(&self, filename: &str, contents: &str) -> Vec<KeyValue> {
        let distinct: BTreeSet<String> = self
            .words
            .find_iter(contents)
            .map(|w| w.as_str().to_lowercase())
            .collect();
        distinct
            .into_iter()
            .map(|word| KeyValue::new(word, filename))
            .collect()
    }

    fn reduce(&self, _key: &str, values: &[String]) -> String {
        let docs: BTreeSet<&str> = values.iter().map(String::as_str).collect();
        let docs: Vec<&str> = docs.into_iter().collect();
        format!("{} {}", docs.len(), docs.join(","))
    }
}
