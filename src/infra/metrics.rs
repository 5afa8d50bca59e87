// ============================================================
// Layer 6 — Metrics
// ============================================================
// Two kinds of numbers come out of a run:
//
//   training  — the average loss of every logging window,
//               appended to `metrics.csv` in the checkpoint dir
//
//                 iteration,avg_loss
//                 0,9.841200
//                 2000,5.213377
//
//   evaluation — smoothed sentence-level BLEU between a decoded
//               candidate and its reference
//
// BLEU matches NLTK's `sentence_bleu` with uniform 4-gram weights
// and smoothing method 1: an n-gram order with zero matches gets
// the small count ε = 0.1 instead of zero, so short sentences
// do not collapse to a score of 0.

use std::{
    collections::HashMap,
    fs::{self, OpenOptions},
    hash::Hash,
    io::Write,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use crate::domain::error::Result;

// ─── Training Metrics ─────────────────────────────────────────────────────────
/// One row of the metrics CSV: a finished logging window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowMetrics {
    /// Iteration counter at which the window closed
    pub iteration: usize,

    /// Mean per-step loss over the window
    pub avg_loss: f64,
}

impl WindowMetrics {
    pub fn new(iteration: usize, avg_loss: f64) -> Self {
        Self { iteration, avg_loss }
    }

    pub fn is_improvement(&self, best_loss: f64) -> bool {
        self.avg_loss < best_loss
    }
}

/// Appends window metrics to a CSV file.
pub struct MetricsLogger {
    csv_path: PathBuf,
}

impl MetricsLogger {
    /// Create the logger, writing the header if the file is new.
    pub fn new(dir: &Path) -> Result<Self> {
        fs::create_dir_all(dir)?;
        let csv_path = dir.join("metrics.csv");

        if !csv_path.exists() {
            let mut f = fs::File::create(&csv_path)?;
            writeln!(f, "iteration,avg_loss")?;
            tracing::debug!("Created metrics CSV: '{}'", csv_path.display());
        }

        Ok(Self { csv_path })
    }

    pub fn log(&self, m: &WindowMetrics) -> Result<()> {
        let mut f = OpenOptions::new().append(true).open(&self.csv_path)?;
        writeln!(f, "{},{:.6}", m.iteration, m.avg_loss)?;
        tracing::debug!("Logged window at iteration {}: avg_loss={:.4}", m.iteration, m.avg_loss);
        Ok(())
    }

    pub fn csv_path(&self) -> &PathBuf {
        &self.csv_path
    }
}

// ─── BLEU ─────────────────────────────────────────────────────────────────────
const MAX_ORDER: usize = 4;
const SMOOTHING_EPSILON: f64 = 0.1;

fn ngram_counts<T: Eq + Hash>(tokens: &[T], n: usize) -> HashMap<&[T], usize> {
    let mut map = HashMap::new();
    if n == 0 || tokens.len() < n {
        return map;
    }
    for window in tokens.windows(n) {
        *map.entry(window).or_insert(0) += 1;
    }
    map
}

/// Clipped n-gram matches and the candidate's n-gram total.
fn modified_precision<T: Eq + Hash>(reference: &[T], candidate: &[T], n: usize) -> (usize, usize) {
    let ref_counts = ngram_counts(reference, n);
    let cand_counts = ngram_counts(candidate, n);

    let matched = cand_counts
        .iter()
        .map(|(gram, &c)| c.min(ref_counts.get(gram).copied().unwrap_or(0)))
        .sum();
    let total = candidate.len().saturating_sub(n - 1);
    (matched, total)
}

/// Smoothed sentence BLEU of `candidate` against a single `reference`.
/// The result lies in `[0, 1]`; 1.0 means an exact match of four or more tokens.
pub fn sentence_bleu<T: Eq + Hash>(reference: &[T], candidate: &[T]) -> f64 {
    if candidate.is_empty() {
        return 0.0;
    }

    let mut log_sum = 0.0;
    for n in 1..=MAX_ORDER {
        let (matched, total) = modified_precision(reference, candidate, n);
        if n == 1 && matched == 0 {
            return 0.0;
        }
        let denominator = total.max(1) as f64;
        let p = if matched == 0 {
            SMOOTHING_EPSILON / denominator
        } else {
            matched as f64 / denominator
        };
        log_sum += p.ln() / MAX_ORDER as f64;
    }

    let c = candidate.len() as f64;
    let r = reference.len() as f64;
    let brevity = if c > r { 1.0 } else { (1.0 - r / c).exp() };

    brevity * log_sum.exp()
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    fn words(s: &str) -> Vec<&str> {
        s.split_whitespace().collect()
    }

    #[test]
    fn test_is_improvement() {
        let m = WindowMetrics::new(2000, 2.3);
        assert!(m.is_improvement(3.0));
        assert!(!m.is_improvement(2.0));
    }

    #[test]
    fn test_logger_appends_rows() {
        let dir = tempfile::tempdir().unwrap();
        let logger = MetricsLogger::new(dir.path()).unwrap();
        logger.log(&WindowMetrics::new(0, 9.5)).unwrap();
        logger.log(&WindowMetrics::new(2000, 4.25)).unwrap();
        let text = fs::read_to_string(logger.csv_path()).unwrap();
        assert_eq!(text, "iteration,avg_loss\n0,9.500000\n2000,4.250000\n");
    }

    #[test]
    fn test_identical_sentences_score_one() {
        let s = words("the cat sat on the mat");
        assert!((sentence_bleu(&s, &s) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_short_identical_sentence_hits_smoothing_floor() {
        let s = words("hello world");
        // p1 = p2 = 1, p3 = p4 = 0.1 → 0.1^(2/4)
        let expected = 0.1f64.sqrt();
        assert!((sentence_bleu(&s, &s) - expected).abs() < 1e-9);
    }

    #[test]
    fn test_no_overlap_scores_zero() {
        assert_eq!(sentence_bleu(&words("a b c d"), &words("w x y z")), 0.0);
        assert_eq!(sentence_bleu(&words("a b c d"), &Vec::<&str>::new()), 0.0);
    }

    #[test]
    fn test_brevity_penalty_applies_to_short_candidates() {
        let reference = words("the cat sat on the mat today");
        let full = sentence_bleu(&reference, &reference);
        let short = sentence_bleu(&reference, &words("the cat sat on"));
        assert!(short < full);
        assert!(short > 0.0);
    }

    #[test]
    fn test_counts_are_clipped() {
        // "the the the the" against "the cat": p1 = 1/4, not 4/4
        let score = sentence_bleu(&words("the cat"), &words("the the the the"));
        assert!(score < 0.3);
    }
}
