// detector.rs — the public near-duplicate API (spec §4.4): a single
// `add`/`query` surface over whichever backend this build was compiled
// with. `query`'s result shape never changes across backends.

use std::time::Instant;

use serde::Serialize;

use crate::jaccard::JaccardIndex;
#[cfg(feature = "minhash")]
use crate::minhash::MinHashLshIndex;
use crate::model::DedupeConfig;

#[derive(Debug, Clone, Serialize)]
pub struct DuplicateResult {
    pub is_duplicate: bool,
    pub score: f64,
    pub match_id: Option<String>,
    pub backend: &'static str,
    pub elapsed_ms: u64,
    pub candidates_checked: usize,
}

enum Backend {
    Jaccard(JaccardIndex),
    #[cfg(feature = "minhash")]
    MinHashLsh(MinHashLshIndex),
}

/// Near-duplicate detector shared by the classifier and yellow-screen
/// stages. Picks the MinHash-LSH backend when the `minhash` feature is
/// compiled in, the pure-Jaccard backend otherwise.
pub struct NearDupDetector {
    backend: Backend,
    config: DedupeConfig,
}

impl NearDupDetector {
    pub fn new(config: DedupeConfig) -> Self {
        #[cfg(feature = "minhash")]
        let backend = Backend::MinHashLsh(MinHashLshIndex::new(&config));
        #[cfg(not(feature = "minhash"))]
        let backend = Backend::Jaccard(JaccardIndex::new(&config));
        NearDupDetector { backend, config }
    }

    pub fn add(&mut self, doc_id: impl Into<String>, text: &str) {
        let doc_id = doc_id.into();
        match &mut self.backend {
            Backend::Jaccard(index) => index.add(doc_id, text),
            #[cfg(feature = "minhash")]
            Backend::MinHashLsh(index) => index.add(doc_id, text),
        }
    }

    pub fn query(&self, text: &str) -> DuplicateResult {
        let start = Instant::now();
        let (score, candidate_id, candidates_checked, backend) = match &self.backend {
            Backend::Jaccard(index) => {
                let (score, candidate_id, checked) = index.query(text);
                (score, candidate_id, checked, "jaccard")
            }
            #[cfg(feature = "minhash")]
            Backend::MinHashLsh(index) => {
                let (score, candidate_id, checked) = index.query(text, self.config.max_candidates);
                (score, candidate_id, checked, "minhash_lsh")
            }
        };

        let is_duplicate = score >= self.config.threshold;
        DuplicateResult {
            is_duplicate,
            score,
            match_id: if is_duplicate { candidate_id } else { None },
            backend,
            elapsed_ms: start.elapsed().as_millis() as u64,
            candidates_checked,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_duplicate_is_reported() {
        let mut detector = NearDupDetector::new(DedupeConfig::default());
        detector.add("doc-1", "the quick brown fox jumps over the lazy dog repeatedly and often");
        let result = detector.query("the quick brown fox jumps over the lazy dog repeatedly and often");
        assert!(result.is_duplicate);
        assert_eq!(result.match_id, Some("doc-1".to_string()));
        assert_eq!(result.score, 1.0);
    }

    #[test]
    fn unrelated_text_is_not_a_duplicate() {
        let mut detector = NearDupDetector::new(DedupeConfig::default());
        detector.add("doc-1", "the quick brown fox jumps over the lazy dog repeatedly and often");
        let result = detector.query("an entirely separate passage about something else altogether");
        assert!(!result.is_duplicate);
        assert_eq!(result.match_id, None);
    }

    #[test]
    fn empty_detector_reports_no_duplicate() {
        let detector = NearDupDetector::new(DedupeConfig::default());
        let result = detector.query("anything");
        assert!(!result.is_duplicate);
        assert_eq!(result.candidates_checked, 0);
    }
}
