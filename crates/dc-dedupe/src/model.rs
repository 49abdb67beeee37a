// model.rs — shared configuration for both dedupe backends (spec §4.4).
// Fields the Jaccard backend doesn't need (`num_permutations`) are simply
// unread when the `minhash` feature is off.

#[derive(Debug, Clone)]
pub struct DedupeConfig {
    /// Token window size per shingle.
    pub shingle_size: usize,
    /// Jaccard score at or above which `query` reports a duplicate.
    pub threshold: f64,
    /// Tokens beyond this count are dropped before shingling.
    pub max_tokens: usize,
    /// LSH candidate-bucket scan cap; unused by the Jaccard backend.
    pub max_candidates: usize,
    /// MinHash permutation count; unused by the Jaccard backend.
    pub num_permutations: usize,
}

impl Default for DedupeConfig {
    fn default() -> Self {
        DedupeConfig { shingle_size: 3, threshold: 0.85, max_tokens: 2_000, max_candidates: 50, num_permutations: 128 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec_targets() {
        let config = DedupeConfig::default();
        assert_eq!(config.shingle_size, 3);
        assert!((config.threshold - 0.85).abs() < f64::EPSILON);
        assert_eq!(config.max_tokens, 2_000);
        assert_eq!(config.max_candidates, 50);
        assert_eq!(config.num_permutations, 128);
    }
}
