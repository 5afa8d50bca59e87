// ============================================================
// Layer 4 — Text Preprocessor
// ============================================================
// Turns a raw corpus line into the word tokens the vocabulary
// is built from. The same function is used when building the
// vocabulary, when converting corpora to ID files, and on user
// input in `translate`, so all three agree on token boundaries.
//
// Steps (applied in order):
//   1. Drop underline markup `<u>`, `</u>` and square brackets
//   2. Trim and lowercase the line
//   3. Split on whitespace into fragments
//   4. Split every fragment around punctuation, keeping the
//      punctuation characters as their own tokens
//   5. Optionally replace every digit with '#'
//
// The punctuation class is `[.,!?"'-<>:;)(]`. Inside it `'-<`
// is a character range, so digits and `*+/` split out as
// single-character tokens too.

use regex::Regex;

const MARKUP: [&str; 4] = ["<u>", "</u>", "[", "]"];

pub struct Preprocessor {
    word_split: Regex,
    digit:      Regex,
    normalize_digits: bool,
}

impl Preprocessor {
    /// Create a preprocessor that normalises digits to '#'
    pub fn new() -> Self {
        Self::with_digit_normalization(true)
    }

    pub fn with_digit_normalization(normalize_digits: bool) -> Self {
        Self {
            // Both patterns are literals, so they always compile
            word_split: Regex::new(r#"[.,!?"'-<>:;)(]"#).expect("valid punctuation pattern"),
            digit:      Regex::new(r"\d").expect("valid digit pattern"),
            normalize_digits,
        }
    }

    /// Split one line into lowercase word/punctuation tokens.
    pub fn tokenize(&self, line: &str) -> Vec<String> {
        let mut text = line.to_string();
        for tag in MARKUP {
            text = text.replace(tag, "");
        }
        let text = text.trim().to_lowercase();

        let mut tokens = Vec::new();
        for fragment in text.split_whitespace() {
            let mut last = 0;
            for m in self.word_split.find_iter(fragment) {
                self.push_token(&mut tokens, &fragment[last..m.start()]);
                self.push_token(&mut tokens, m.as_str());
                last = m.end();
            }
            self.push_token(&mut tokens, &fragment[last..]);
        }
        tokens
    }

    fn push_token(&self, tokens: &mut Vec<String>, piece: &str) {
        if piece.is_empty() {
            return;
        }
        if self.normalize_digits {
            tokens.push(self.digit.replace_all(piece, "#").into_owned());
        } else {
            tokens.push(piece.to_string());
        }
    }
}

impl Default for Preprocessor {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lowercases_and_splits_whitespace() {
        let p = Preprocessor::new();
        assert_eq!(p.tokenize("  Hello   World "), vec!["hello", "world"]);
    }

    #[test]
    fn test_keeps_punctuation_as_tokens() {
        let p = Preprocessor::new();
        assert_eq!(
            p.tokenize("Hi, there!"),
            vec!["hi", ",", "there", "!"]
        );
        assert_eq!(p.tokenize("don't"), vec!["don", "'", "t"]);
    }

    #[test]
    fn test_strips_markup() {
        let p = Preprocessor::new();
        assert_eq!(p.tokenize("<u>very</u> [good]"), vec!["very", "good"]);
    }

    #[test]
    fn test_digits_split_and_normalise() {
        let p = Preprocessor::new();
        assert_eq!(p.tokenize("in 1984"), vec!["in", "#", "#", "#", "#"]);

        let raw = Preprocessor::with_digit_normalization(false);
        assert_eq!(raw.tokenize("in 42"), vec!["in", "4", "2"]);
    }

    #[test]
    fn test_empty_line() {
        let p = Preprocessor::new();
        assert!(p.tokenize("").is_empty());
        assert!(p.tokenize("   ").is_empty());
    }
}
