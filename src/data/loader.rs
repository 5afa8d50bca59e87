// ============================================================
// Layer 4 — Corpus Partitioner
// ============================================================
// Loads a pair of line-aligned token-ID corpus files into
// per-bucket pools.
//
// File format (one sentence per line, IDs separated by spaces):
//   train_ids.en          train_ids.vi
//   ────────────          ────────────
//   12 48 7               2 91 14 3
//   5 5                   2 7 7 3
//
// Line N of the source file pairs with line N of the target
// file. Reading stops at the end of the shorter file.
// Pairs that fit no bucket are dropped and counted.
// With vocabulary sizes set, an ID at or past the size of its
// side's vocabulary is a malformed line.

use std::{
    fs::File,
    io::{BufRead, BufReader},
    path::{Path, PathBuf},
};

use crate::data::dataset::BucketedDataset;
use crate::domain::bucket::BucketCatalog;
use crate::domain::error::{PipelineError, Result};
use crate::domain::example::Example;

/// Reads paired ID files and files every pair into its bucket.
pub struct CorpusPartitioner {
    catalog:     BucketCatalog,
    /// (source, target) vocabulary sizes, when known
    vocab_sizes: Option<(usize, usize)>,
}

impl CorpusPartitioner {
    pub fn new(catalog: BucketCatalog) -> Self {
        Self { catalog, vocab_sizes: None }
    }

    pub fn with_vocab_sizes(mut self, source: usize, target: usize) -> Self {
        self.vocab_sizes = Some((source, target));
        self
    }

    /// Load both files and partition them. Fails with `EmptyDataset`
    /// if no pair fits any bucket.
    pub fn load(&self, source_file: &Path, target_file: &Path) -> Result<BucketedDataset> {
        let sources = BufReader::new(File::open(source_file)?);
        let targets = BufReader::new(File::open(target_file)?);

        let mut dataset = BucketedDataset::new(self.catalog.clone());
        for (line_no, (src, tgt)) in sources.lines().zip(targets.lines()).enumerate() {
            let source_ids = parse_ids(&src?, source_file, line_no + 1)?;
            let target_ids = parse_ids(&tgt?, target_file, line_no + 1)?;
            if let Some((src_size, tgt_size)) = self.vocab_sizes {
                check_range(&source_ids, src_size, source_file, line_no + 1)?;
                check_range(&target_ids, tgt_size, target_file, line_no + 1)?;
            }
            dataset.insert(Example::new(source_ids, target_ids));
        }

        if dataset.total() == 0 {
            return Err(PipelineError::EmptyDataset);
        }

        tracing::info!(
            "Loaded {} pairs from '{}' ({} dropped: no bucket fits)",
            dataset.total(),
            source_file.display(),
            dataset.dropped(),
        );
        Ok(dataset)
    }
}

/// Parse one line of whitespace-separated token IDs.
pub fn parse_ids(line: &str, path: &Path, line_no: usize) -> Result<Vec<u32>> {
    line.split_whitespace()
        .map(|tok| {
            tok.parse::<u32>().map_err(|e| PipelineError::MalformedCorpus {
                path:   PathBuf::from(path),
                line:   line_no,
                reason: format!("'{tok}' is not a token id ({e})"),
            })
        })
        .collect()
}

fn check_range(ids: &[u32], vocab_size: usize, path: &Path, line_no: usize) -> Result<()> {
    match ids.iter().find(|&&id| id as usize >= vocab_size) {
        Some(id) => Err(PipelineError::MalformedCorpus {
            path:   PathBuf::from(path),
            line:   line_no,
            reason: format!("id {id} is outside the vocabulary of {vocab_size} tokens"),
        }),
        None => Ok(()),
    }
}

/// Read a text file as a list of lines, without trailing newlines.
pub fn read_lines(path: &Path) -> Result<Vec<String>> {
    let reader = BufReader::new(File::open(path)?);
    reader
        .lines()
        .map(|l| l.map_err(PipelineError::from))
        .collect()
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::data::dataset::Dataset;
    use std::fs;

    fn write(dir: &Path, name: &str, body: &str) -> PathBuf {
        let p = dir.join(name);
        fs::write(&p, body).unwrap();
        p
    }

    fn partitioner() -> CorpusPartitioner {
        CorpusPartitioner::new(BucketCatalog::from_pairs(&[(4, 4), (6, 6)]).unwrap())
    }

    #[test]
    fn test_load_partitions_pairs() {
        let dir = tempfile::tempdir().unwrap();
        let src = write(dir.path(), "a.en", "5 5\n1 2 3 4 5\n1 2 3 4 5 6 7\n");
        let tgt = write(dir.path(), "a.vi", "2 7 7 3\n2 9 3\n2 3\n");

        let ds = partitioner().load(&src, &tgt).unwrap();
        assert_eq!(ds.pool_sizes(), vec![1, 1]);
        assert_eq!(ds.dropped(), 1);
        assert_eq!(
            ds.pool(0).unwrap().get(0).unwrap(),
            Example::new(vec![5, 5], vec![2, 7, 7, 3])
        );
    }

    #[test]
    fn test_stops_at_shorter_file() {
        let dir = tempfile::tempdir().unwrap();
        let src = write(dir.path(), "a.en", "1\n2\n3\n");
        let tgt = write(dir.path(), "a.vi", "4\n");
        let ds = partitioner().load(&src, &tgt).unwrap();
        assert_eq!(ds.total(), 1);
    }

    #[test]
    fn test_empty_corpus_is_empty_dataset() {
        let dir = tempfile::tempdir().unwrap();
        let src = write(dir.path(), "a.en", "");
        let tgt = write(dir.path(), "a.vi", "");
        assert!(matches!(
            partitioner().load(&src, &tgt),
            Err(PipelineError::EmptyDataset)
        ));
    }

    #[test]
    fn test_non_integer_token_is_reported_with_line() {
        let dir = tempfile::tempdir().unwrap();
        let src = write(dir.path(), "a.en", "1 2\n3 x\n");
        let tgt = write(dir.path(), "a.vi", "1\n2\n");
        match partitioner().load(&src, &tgt) {
            Err(PipelineError::MalformedCorpus { line, .. }) => assert_eq!(line, 2),
            other => panic!("expected MalformedCorpus, got {other:?}"),
        }
    }

    #[test]
    fn test_id_past_vocabulary_is_reported_with_line() {
        let dir = tempfile::tempdir().unwrap();
        let src = write(dir.path(), "a.en", "4 5\n4 9\n");
        let tgt = write(dir.path(), "a.vi", "2 6 3\n2 7 3\n");

        match partitioner().with_vocab_sizes(10, 12).load(&src, &tgt) {
            Ok(ds) => assert_eq!(ds.total(), 2),
            Err(e) => panic!("ids inside the vocabulary were rejected: {e}"),
        }
        match partitioner().with_vocab_sizes(9, 12).load(&src, &tgt) {
            Err(PipelineError::MalformedCorpus { line, reason, .. }) => {
                assert_eq!(line, 2);
                assert!(reason.contains("id 9"));
            }
            other => panic!("expected MalformedCorpus, got {other:?}"),
        }
        match partitioner().with_vocab_sizes(10, 7).load(&src, &tgt) {
            Err(PipelineError::MalformedCorpus { path, .. }) => assert_eq!(path, tgt),
            other => panic!("expected MalformedCorpus, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_ids_allows_blank_lines() {
        assert!(parse_ids("", Path::new("x"), 1).unwrap().is_empty());
        assert_eq!(parse_ids(" 3  4 ", Path::new("x"), 1).unwrap(), vec![3, 4]);
    }
}
