// ============================================================
// Layer 3 — Example Domain Type
// ============================================================
// One parallel sentence pair after tokenisation: the source
// token IDs and the target token IDs. Target sequences from the
// prepared corpus already carry <s> ... <\s> around the words.

/// Reserved vocabulary IDs. Every vocabulary file lists these
/// four tokens first, in this order.
pub const PAD_ID: u32 = 0;
pub const UNK_ID: u32 = 1;
pub const START_ID: u32 = 2;
pub const EOS_ID: u32 = 3;

/// The surface forms written at the top of every vocabulary file.
pub const RESERVED_TOKENS: [&str; 4] = ["<pad>", "<unk>", "<s>", "<\\s>"];

/// A source/target pair of token ID sequences.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Example {
    pub source_ids: Vec<u32>,
    pub target_ids: Vec<u32>,
}

impl Example {
    pub fn new(source_ids: Vec<u32>, target_ids: Vec<u32>) -> Self {
        Self { source_ids, target_ids }
    }

    /// (source length, target length)
    pub fn lengths(&self) -> (usize, usize) {
        (self.source_ids.len(), self.target_ids.len())
    }
}
