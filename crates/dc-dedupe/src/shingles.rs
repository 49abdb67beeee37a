// shingles.rs — tokenization and k-gram hashing shared by both dedupe
// backends, so a Jaccard score computed by one matches what the other
// would compute over the same text.

use std::collections::hash_map::DefaultHasher;
use std::collections::HashSet;
use std::hash::{Hash, Hasher};

pub fn tokenize(text: &str, max_tokens: usize) -> Vec<String> {
    text.split_whitespace()
        .map(|word| word.trim_matches(|c: char| !c.is_alphanumeric()).to_ascii_lowercase())
        .filter(|word| !word.is_empty())
        .take(max_tokens)
        .collect()
}

fn hash_shingle(shingle: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    shingle.hash(&mut hasher);
    hasher.finish()
}

/// Hashed k-grams of `tokens`. Texts shorter than `shingle_size` hash as
/// one shingle covering the whole token run rather than producing none.
pub fn shingle_hashes(tokens: &[String], shingle_size: usize) -> HashSet<u64> {
    let k = shingle_size.max(1);
    if tokens.len() <= k {
        let mut set = HashSet::with_capacity(1);
        set.insert(hash_shingle(&tokens.join(" ")));
        return set;
    }
    tokens.windows(k).map(|window| hash_shingle(&window.join(" "))).collect()
}

pub fn jaccard(a: &HashSet<u64>, b: &HashSet<u64>) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    let intersection = a.intersection(b).count() as f64;
    let union = a.union(b).count() as f64;
    if union == 0.0 {
        0.0
    } else {
        intersection / union
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenize_lowercases_and_strips_punctuation() {
        let tokens = tokenize("Hello, World! Hello?", 100);
        assert_eq!(tokens, vec!["hello", "world", "hello"]);
    }

    #[test]
    fn tokenize_caps_at_max_tokens() {
        let tokens = tokenize("a b c d e", 3);
        assert_eq!(tokens, vec!["a", "b", "c"]);
    }

    #[test]
    fn shingle_hashes_are_stable_for_identical_input() {
        let tokens = tokenize("the quick brown fox jumps", 100);
        let a = shingle_hashes(&tokens, 3);
        let b = shingle_hashes(&tokens, 3);
        assert_eq!(a, b);
    }

    #[test]
    fn short_texts_hash_as_a_single_shingle() {
        let tokens = tokenize("hi there", 100);
        let shingles = shingle_hashes(&tokens, 3);
        assert_eq!(shingles.len(), 1);
    }

    #[test]
    fn jaccard_of_identical_sets_is_one() {
        let tokens = tokenize("the quick brown fox jumps over the lazy dog", 100);
        let a = shingle_hashes(&tokens, 3);
        assert_eq!(jaccard(&a, &a), 1.0);
    }

    #[test]
    fn jaccard_of_disjoint_sets_is_zero() {
        let a = shingle_hashes(&tokenize("alpha beta gamma delta", 100), 3);
        let b = shingle_hashes(&tokenize("zulu yankee xray whiskey", 100), 3);
        assert_eq!(jaccard(&a, &b), 0.0);
    }
}
