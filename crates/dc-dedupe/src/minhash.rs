// minhash.rs — MinHash-LSH backend (spec §4.4), behind the `minhash`
// feature. Banded LSH narrows the candidate set to at most
// `max_candidates` documents; the actual Jaccard score is then computed
// against the true shingle sets kept alongside the signatures, so
// `query`'s reported score is exact, not the MinHash estimate. No
// dedicated MinHash crate exists in this workspace's stack, so the
// permutation hashing is built directly on `rand`, already a workspace
// dependency for retry-backoff jitter.

use std::collections::hash_map::DefaultHasher;
use std::collections::{HashMap, HashSet};
use std::hash::{Hash, Hasher};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::model::DedupeConfig;
use crate::shingles::{jaccard, shingle_hashes, tokenize};

/// Signatures built by two different `MinHashLshIndex` instances over the
/// same corpus must land in the same buckets, so the permutation
/// coefficients are derived from a fixed seed rather than the process's
/// default (random) RNG.
const PERMUTATION_SEED: u64 = 0x4d_49_4e_48_41_53_48; // "MINHASH"
const ROWS_PER_BAND: usize = 4;
const MERSENNE_PRIME_61: u64 = (1u64 << 61) - 1;

struct Permutation {
    a: u64,
    b: u64,
}

impl Permutation {
    fn apply(&self, shingle: u64) -> u64 {
        ((self.a as u128 * shingle as u128 + self.b as u128) % MERSENNE_PRIME_61 as u128) as u64
    }
}

fn hash_band(rows: &[u64]) -> u64 {
    let mut hasher = DefaultHasher::new();
    rows.hash(&mut hasher);
    hasher.finish()
}

pub struct MinHashLshIndex {
    shingle_size: usize,
    max_tokens: usize,
    num_permutations: usize,
    bands: usize,
    rows_per_band: usize,
    permutations: Vec<Permutation>,
    shingle_sets: HashMap<String, HashSet<u64>>,
    buckets: HashMap<(usize, u64), Vec<String>>,
    insertion_order: Vec<String>,
}

impl MinHashLshIndex {
    pub fn new(config: &DedupeConfig) -> Self {
        let num_permutations = config.num_permutations.max(ROWS_PER_BAND);
        let bands = (num_permutations / ROWS_PER_BAND).max(1);
        let rows_per_band = num_permutations / bands;

        let mut rng = StdRng::seed_from_u64(PERMUTATION_SEED);
        let permutations = (0..num_permutations)
            .map(|_| Permutation { a: rng.gen_range(1..MERSENNE_PRIME_61), b: rng.gen_range(0..MERSENNE_PRIME_61) })
            .collect();

        MinHashLshIndex {
            shingle_size: config.shingle_size,
            max_tokens: config.max_tokens,
            num_permutations,
            bands,
            rows_per_band,
            permutations,
            shingle_sets: HashMap::new(),
            buckets: HashMap::new(),
            insertion_order: Vec::new(),
        }
    }

    fn signature(&self, shingles: &HashSet<u64>) -> Vec<u64> {
        self.permutations
            .iter()
            .map(|perm| shingles.iter().map(|&s| perm.apply(s)).min().unwrap_or(0))
            .collect()
    }

    fn band_keys(&self, signature: &[u64]) -> Vec<(usize, u64)> {
        (0..self.bands)
            .map(|band| {
                let start = band * self.rows_per_band;
                let end = (start + self.rows_per_band).min(signature.len());
                (band, hash_band(&signature[start..end]))
            })
            .collect()
    }

    pub fn add(&mut self, doc_id: String, text: &str) {
        let tokens = tokenize(text, self.max_tokens);
        let shingles = shingle_hashes(&tokens, self.shingle_size);
        let signature = self.signature(&shingles);

        for key in self.band_keys(&signature) {
            self.buckets.entry(key).or_default().push(doc_id.clone());
        }
        if !self.shingle_sets.contains_key(&doc_id) {
            self.insertion_order.push(doc_id.clone());
        }
        self.shingle_sets.insert(doc_id, shingles);
    }

    pub fn query(&self, text: &str, max_candidates: usize) -> (f64, Option<String>, usize) {
        let tokens = tokenize(text, self.max_tokens);
        let query_shingles = shingle_hashes(&tokens, self.shingle_size);
        let signature = self.signature(&query_shingles);

        let mut candidates = Vec::new();
        let mut seen = HashSet::new();
        'bands: for key in self.band_keys(&signature) {
            let Some(doc_ids) = self.buckets.get(&key) else { continue };
            for doc_id in doc_ids {
                if seen.insert(doc_id.clone()) {
                    candidates.push(doc_id.clone());
                    if candidates.len() >= max_candidates {
                        break 'bands;
                    }
                }
            }
        }

        let mut best_score = 0.0;
        let mut best_id = None;
        for doc_id in &candidates {
            let Some(shingles) = self.shingle_sets.get(doc_id) else { continue };
            let score = jaccard(&query_shingles, shingles);
            if score > best_score {
                best_score = score;
                best_id = Some(doc_id.clone());
            }
        }
        (best_score, best_id, candidates.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> DedupeConfig {
        DedupeConfig { shingle_size: 3, threshold: 0.85, max_tokens: 2_000, max_candidates: 50, num_permutations: 128 }
    }

    #[test]
    fn empty_index_has_no_candidates() {
        let index = MinHashLshIndex::new(&config());
        let (score, match_id, checked) = index.query("anything at all", 50);
        assert_eq!(score, 0.0);
        assert_eq!(match_id, None);
        assert_eq!(checked, 0);
    }

    #[test]
    fn identical_text_always_lands_in_the_same_bucket() {
        let mut index = MinHashLshIndex::new(&config());
        let text = "the quick brown fox jumps over the lazy dog repeatedly";
        index.add("doc-1".to_string(), text);
        let (score, match_id, checked) = index.query(text, 50);
        assert_eq!(score, 1.0);
        assert_eq!(match_id, Some("doc-1".to_string()));
        assert!(checked >= 1);
    }

    #[test]
    fn bands_times_rows_never_exceeds_configured_permutations() {
        let index = MinHashLshIndex::new(&config());
        assert!(index.bands * index.rows_per_band <= index.num_permutations);
    }
}
