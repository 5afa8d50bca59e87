// ============================================================
// Layer 6 — Vocabulary Store
// ============================================================
// Builds, saves and loads the line-indexed vocabulary files.
//
// File format: one token per line, line index = token ID.
// The first four lines are always the reserved tokens:
//
//   0  <pad>
//   1  <unk>
//   2  <s>
//   3  <\s>
//   4  the          ← most frequent word in the corpus
//   5  ,
//   ...
//
// Words are ordered by descending frequency. Ties keep the
// order in which the words first appeared in the corpus.

use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};

use crate::data::preprocessor::Preprocessor;
use crate::domain::error::{PipelineError, Result};
use crate::domain::example::{EOS_ID, RESERVED_TOKENS, START_ID, UNK_ID};

/// Token ↔ ID mapping for one language.
#[derive(Debug, Clone)]
pub struct Vocabulary {
    tokens: Vec<String>,
    index:  HashMap<String, u32>,
}

impl Vocabulary {
    /// Build from an ordered token list. The list must start with the
    /// four reserved tokens.
    pub fn from_tokens(tokens: Vec<String>) -> Result<Self> {
        Self::validated(tokens, Path::new("<memory>"))
    }

    fn validated(tokens: Vec<String>, path: &Path) -> Result<Self> {
        if tokens.len() < RESERVED_TOKENS.len() {
            return Err(PipelineError::InvalidVocabulary {
                path:   PathBuf::from(path),
                reason: format!("expected at least {} entries, found {}", RESERVED_TOKENS.len(), tokens.len()),
            });
        }
        for (id, expected) in RESERVED_TOKENS.iter().enumerate() {
            if tokens[id] != *expected {
                return Err(PipelineError::InvalidVocabulary {
                    path:   PathBuf::from(path),
                    reason: format!("line {id} must be '{expected}', found '{}'", tokens[id]),
                });
            }
        }
        let index = tokens
            .iter()
            .enumerate()
            .map(|(i, t)| (t.clone(), i as u32))
            .collect();
        Ok(Self { tokens, index })
    }

    /// Count tokens in `lines` and build a frequency-ordered vocabulary.
    /// Tokens seen fewer than `threshold` times are left out.
    pub fn build<'a, I>(lines: I, preprocessor: &Preprocessor, threshold: usize) -> Result<Self>
    where
        I: IntoIterator<Item = &'a str>,
    {
        // (count, first appearance)
        let mut freq: HashMap<String, (usize, usize)> = HashMap::new();
        let mut seen = 0usize;
        for line in lines {
            for token in preprocessor.tokenize(line) {
                let entry = freq.entry(token).or_insert_with(|| {
                    seen += 1;
                    (0, seen)
                });
                entry.0 += 1;
            }
        }

        let mut words: Vec<(String, usize, usize)> =
            freq.into_iter().map(|(w, (c, first))| (w, c, first)).collect();
        words.sort_by(|a, b| b.1.cmp(&a.1).then(a.2.cmp(&b.2)));

        let mut tokens: Vec<String> = RESERVED_TOKENS.iter().map(|t| t.to_string()).collect();
        for (word, count, _) in words {
            if count < threshold {
                break;
            }
            if !RESERVED_TOKENS.contains(&word.as_str()) {
                tokens.push(word);
            }
        }
        Self::from_tokens(tokens)
    }

    /// Load a vocabulary file written by `save`.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        let tokens = text.lines().map(str::to_string).collect();
        Self::validated(tokens, path)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let mut body = self.tokens.join("\n");
        body.push('\n');
        fs::write(path, body)?;
        tracing::debug!("Wrote {} tokens to '{}'", self.tokens.len(), path.display());
        Ok(())
    }

    /// Token IDs for a raw line; unknown tokens map to UNK.
    pub fn encode(&self, line: &str, preprocessor: &Preprocessor) -> Vec<u32> {
        preprocessor
            .tokenize(line)
            .iter()
            .map(|t| self.id(t))
            .collect()
    }

    /// Like `encode`, wrapped in START ... EOS (used for decoder-side corpora).
    pub fn encode_target(&self, line: &str, preprocessor: &Preprocessor) -> Vec<u32> {
        let mut ids = vec![START_ID];
        ids.extend(self.encode(line, preprocessor));
        ids.push(EOS_ID);
        ids
    }

    pub fn id(&self, token: &str) -> u32 {
        self.index.get(token).copied().unwrap_or(UNK_ID)
    }

    /// The surface form of `id`, if it is in range.
    pub fn token(&self, id: u32) -> Option<&str> {
        self.tokens.get(id as usize).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    fn vocab() -> Vocabulary {
        Vocabulary::build(["b a a", "c b a"], &Preprocessor::new(), 1).unwrap()
    }

    #[test]
    fn test_build_orders_by_frequency_then_first_seen() {
        let v = vocab();
        assert_eq!(v.token(0), Some("<pad>"));
        assert_eq!(v.token(3), Some("<\\s>"));
        assert_eq!(v.token(4), Some("a"));
        assert_eq!(v.token(5), Some("b"));
        assert_eq!(v.token(6), Some("c"));
        assert_eq!(v.len(), 7);
    }

    #[test]
    fn test_threshold_drops_rare_tokens() {
        let v = Vocabulary::build(["b a a", "c b a"], &Preprocessor::new(), 2).unwrap();
        assert_eq!(v.len(), 6);
        assert_eq!(v.id("c"), UNK_ID);
    }

    #[test]
    fn test_encode_maps_unknown_to_unk() {
        let v = vocab();
        let p = Preprocessor::new();
        assert_eq!(v.encode("A b zebra", &p), vec![4, 5, UNK_ID]);
        assert_eq!(v.encode_target("c", &p), vec![START_ID, 6, EOS_ID]);
    }

    #[test]
    fn test_save_load_preserves_ids() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vocab.en");
        let v = vocab();
        v.save(&path).unwrap();
        let loaded = Vocabulary::load(&path).unwrap();
        assert_eq!(loaded.len(), v.len());
        assert_eq!(loaded.id("b"), v.id("b"));
    }

    #[test]
    fn test_rejects_missing_reserved_tokens() {
        assert!(Vocabulary::from_tokens(vec!["<pad>".into(), "<unk>".into()]).is_err());
        let wrong_order = ["<unk>", "<pad>", "<s>", "<\\s>"].map(String::from).to_vec();
        assert!(matches!(
            Vocabulary::from_tokens(wrong_order),
            Err(PipelineError::InvalidVocabulary { .. })
        ));
    }
}
