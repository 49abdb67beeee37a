// jaccard.rs — pure in-memory Jaccard-over-shingles backend (spec §4.4):
// always available, no external dependency. Scans every indexed
// document on `query`; fine for the test/small-corpus use this backend
// is meant for, and also used by the `minhash` backend to score the
// candidates it shortlists.

use std::collections::HashMap;
use std::collections::HashSet;

use crate::model::DedupeConfig;
use crate::shingles::{jaccard, shingle_hashes, tokenize};

pub struct JaccardIndex {
    shingle_size: usize,
    max_tokens: usize,
    docs: HashMap<String, HashSet<u64>>,
    insertion_order: Vec<String>,
}

impl JaccardIndex {
    pub fn new(config: &DedupeConfig) -> Self {
        JaccardIndex {
            shingle_size: config.shingle_size,
            max_tokens: config.max_tokens,
            docs: HashMap::new(),
            insertion_order: Vec::new(),
        }
    }

    pub fn add(&mut self, doc_id: String, text: &str) {
        let tokens = tokenize(text, self.max_tokens);
        let shingles = shingle_hashes(&tokens, self.shingle_size);
        if !self.docs.contains_key(&doc_id) {
            self.insertion_order.push(doc_id.clone());
        }
        self.docs.insert(doc_id, shingles);
    }

    /// Highest-scoring stored document, the number of documents compared
    /// against, and the score itself. The caller decides the duplicate
    /// threshold.
    pub fn query(&self, text: &str) -> (f64, Option<String>, usize) {
        let tokens = tokenize(text, self.max_tokens);
        let query_shingles = shingle_hashes(&tokens, self.shingle_size);

        let mut best_score = 0.0;
        let mut best_id = None;
        let mut checked = 0usize;
        for doc_id in &self.insertion_order {
            let Some(shingles) = self.docs.get(doc_id) else { continue };
            checked += 1;
            let score = jaccard(&query_shingles, shingles);
            if score > best_score {
                best_score = score;
                best_id = Some(doc_id.clone());
            }
        }
        (best_score, best_id, checked)
    }

    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    pub(crate) fn snapshot(&self) -> Vec<(String, Vec<u64>)> {
        self.insertion_order
            .iter()
            .filter_map(|id| self.docs.get(id).map(|shingles| (id.clone(), shingles.iter().copied().collect())))
            .collect()
    }

    pub(crate) fn restore(config: &DedupeConfig, entries: Vec<(String, Vec<u64>)>) -> Self {
        let mut index = JaccardIndex::new(config);
        for (doc_id, shingles) in entries {
            index.insertion_order.push(doc_id.clone());
            index.docs.insert(doc_id, shingles.into_iter().collect());
        }
        index
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> DedupeConfig {
        DedupeConfig { shingle_size: 3, threshold: 0.85, max_tokens: 2_000, max_candidates: 50, num_permutations: 128 }
    }

    #[test]
    fn exact_duplicate_scores_one() {
        let mut index = JaccardIndex::new(&config());
        index.add("doc-1".to_string(), "the quick brown fox jumps over the lazy dog");
        let (score, match_id, checked) = index.query("the quick brown fox jumps over the lazy dog");
        assert_eq!(score, 1.0);
        assert_eq!(match_id, Some("doc-1".to_string()));
        assert_eq!(checked, 1);
    }

    #[test]
    fn unrelated_text_scores_low() {
        let mut index = JaccardIndex::new(&config());
        index.add("doc-1".to_string(), "the quick brown fox jumps over the lazy dog");
        let (score, _match_id, _checked) = index.query("completely different subject matter entirely");
        assert!(score < 0.5);
    }

    #[test]
    fn empty_index_has_no_candidates() {
        let index = JaccardIndex::new(&config());
        let (score, match_id, checked) = index.query("anything");
        assert_eq!(score, 0.0);
        assert_eq!(match_id, None);
        assert_eq!(checked, 0);
    }

    #[test]
    fn snapshot_and_restore_round_trips() {
        let mut index = JaccardIndex::new(&config());
        index.add("doc-1".to_string(), "the quick brown fox jumps over the lazy dog");
        let snapshot = index.snapshot();
        let restored = JaccardIndex::restore(&config(), snapshot);
        let (score, match_id, _) = restored.query("the quick brown fox jumps over the lazy dog");
        assert_eq!(score, 1.0);
        assert_eq!(match_id, Some("doc-1".to_string()));
    }
}
