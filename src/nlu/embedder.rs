//! Word embedding seam.
//!
//! A [`WordEmbedder`] maps a single word to a fixed-width dense vector. Real
//! deployments plug in a subword-model wrapper; [`HashingEmbedder`] is the
//! dependency-free default that derives a deterministic pseudo-vector from a
//! hash of the word, which is enough to exercise the feature pipeline and
//! vector-consuming classifiers.

/// Per-word vector model.
pub trait WordEmbedder: Send + Sync {
    /// Embed one word. An empty vector means "no representation" and the
    /// token is skipped during aggregation.
    fn embed(&self, word: &str) -> Vec<f32>;

    /// Width of the vectors this model produces.
    fn dim(&self) -> usize;
}

/// Deterministic hash-seeded embedder.
#[derive(Debug, Clone, Copy)]
pub struct HashingEmbedder {
    dim: usize,
}

impl HashingEmbedder {
    pub fn new(dim: usize) -> Self {
        Self { dim }
    }

    fn seed(word: &str) -> u64 {
        // FNV-1a over the UTF-8 bytes.
        let mut hash: u64 = 0xcbf29ce484222325;
        for byte in word.as_bytes() {
            hash ^= u64::from(*byte);
            hash = hash.wrapping_mul(0x100000001b3);
        }
        hash
    }
}

impl Default for HashingEmbedder {
    fn default() -> Self {
        Self::new(64)
    }
}

impl WordEmbedder for HashingEmbedder {
    fn embed(&self, word: &str) -> Vec<f32> {
        let mut state = Self::seed(word);
        let mut vector = Vec::with_capacity(self.dim);
        for _ in 0..self.dim {
            // xorshift64 stream, mapped into [-1.0, 1.0].
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            let unit = (state >> 11) as f32 / (1u64 << 53) as f32;
            vector.push(unit * 2.0 - 1.0);
        }
        vector
    }

    fn dim(&self) -> usize {
        self.dim
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deterministic() {
        let emb = HashingEmbedder::new(16);
        assert_eq!(emb.embed("евро"), emb.embed("евро"));
    }

    #[test]
    fn test_fixed_width() {
        let emb = HashingEmbedder::new(32);
        assert_eq!(emb.embed("x").len(), 32);
        assert_eq!(emb.dim(), 32);
    }

    #[test]
    fn test_distinct_words_differ() {
        let emb = HashingEmbedder::new(16);
        assert_ne!(emb.embed("евро"), emb.embed("доллар"));
    }

    #[test]
    fn test_values_bounded() {
        let emb = HashingEmbedder::new(64);
        for v in emb.embed("проверка") {
            assert!((-1.0..=1.0).contains(&v));
        }
    }
}
