//! Cosine-similarity ranking over candidate embedding pools.
//!
//! The brute-force O(N·D) scan is the one performance-sensitive path in
//! the query surface, so the ranking contract lives behind a trait: for
//! large pools the scan can be swapped for an approximate-nearest-neighbor
//! structure without touching callers.
//!
//! Contract: given a query vector and a candidate pool, return the top-k
//! nearest by cosine similarity, deterministically for a fixed input
//! order, with ties broken by original pool order. Inputs are never
//! mutated.

use crate::embedding::ServiceEmbedding;

/// A candidate ranked against a query vector.
#[derive(Debug, Clone)]
pub struct Ranked<'a> {
    pub embedding: &'a ServiceEmbedding,
    /// Cosine similarity to the query, in [-1.0, 1.0]
    pub score: f32,
}

/// Ranks a candidate pool against a query vector.
pub trait SimilarityIndex {
    /// Return up to `top_k` candidates sorted by descending similarity,
    /// skipping any candidate whose id is in `exclude_ids`.
    ///
    /// An empty filtered pool yields an empty result, not an error.
    /// `top_k` larger than the pool returns the whole filtered pool.
    fn rank<'a>(
        &self,
        query: &[f32],
        pool: &'a [ServiceEmbedding],
        top_k: usize,
        exclude_ids: &[String],
    ) -> Vec<Ranked<'a>>;
}

/// Exhaustive cosine scan over the candidate pool.
pub struct BruteForceIndex;

impl SimilarityIndex for BruteForceIndex {
    fn rank<'a>(
        &self,
        query: &[f32],
        pool: &'a [ServiceEmbedding],
        top_k: usize,
        exclude_ids: &[String],
    ) -> Vec<Ranked<'a>> {
        let mut results: Vec<Ranked<'a>> = pool
            .iter()
            .filter(|candidate| !exclude_ids.contains(&candidate.service_id))
            .map(|candidate| Ranked {
                embedding: candidate,
                score: cosine_similarity(query, &candidate.vector),
            })
            .collect();

        // Stable sort keeps equal-score candidates in pool order
        results.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        results.truncate(top_k);

        results
    }
}

/// Cosine similarity between two vectors. Zero-norm inputs score 0.0
/// rather than producing NaN, and mismatched dimensions score 0.0 with a
/// warning instead of comparing a truncated prefix.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        log::warn!(
            "dimension mismatch in similarity ({} vs {}), scoring 0",
            a.len(),
            b.len()
        );
        return 0.0;
    }

    let norm_a = l2_norm(a);
    let norm_b = l2_norm(b);
    if norm_a < f32::EPSILON || norm_b < f32::EPSILON {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    dot_product / (norm_a * norm_b)
}

fn l2_norm(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::ServiceMeta;

    fn candidate(id: &str, vector: Vec<f32>) -> ServiceEmbedding {
        ServiceEmbedding {
            service_id: id.to_string(),
            category_id: String::new(),
            vendor_id: "v1".to_string(),
            vector,
            meta: ServiceMeta {
                name: id.to_string(),
                category: String::new(),
                tags: vec![],
            },
        }
    }

    #[test]
    fn ranks_by_descending_similarity() {
        let pool = vec![
            candidate("far", vec![0.0, 1.0, 0.0]),
            candidate("near", vec![1.0, 0.1, 0.0]),
        ];
        let index = BruteForceIndex;
        let results = index.rank(&[1.0, 0.0, 0.0], &pool, 10, &[]);

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].embedding.service_id, "near");
        assert!(results[0].score > results[1].score);
    }

    #[test]
    fn excluded_ids_never_returned() {
        let pool = vec![
            candidate("a", vec![1.0, 0.0]),
            candidate("b", vec![1.0, 0.0]),
        ];
        let index = BruteForceIndex;
        let results = index.rank(&[1.0, 0.0], &pool, 10, &["a".to_string()]);

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].embedding.service_id, "b");
    }

    #[test]
    fn empty_filtered_pool_is_empty_result() {
        let pool = vec![candidate("a", vec![1.0, 0.0])];
        let index = BruteForceIndex;
        let results = index.rank(&[1.0, 0.0], &pool, 10, &["a".to_string()]);
        assert!(results.is_empty());
    }

    #[test]
    fn top_k_larger_than_pool_returns_full_pool() {
        let pool = vec![candidate("only", vec![1.0, 0.0])];
        let index = BruteForceIndex;
        let results = index.rank(&[1.0, 0.0], &pool, 5, &[]);

        assert_eq!(results.len(), 1);
        assert!((results[0].score - 1.0).abs() < 1e-6);
    }

    #[test]
    fn ties_keep_pool_order() {
        // Identical vectors score identically; stable sort must keep
        // the original pool order
        let pool = vec![
            candidate("first", vec![1.0, 0.0]),
            candidate("second", vec![1.0, 0.0]),
            candidate("third", vec![1.0, 0.0]),
        ];
        let index = BruteForceIndex;
        let results = index.rank(&[1.0, 0.0], &pool, 10, &[]);

        let ids: Vec<&str> = results
            .iter()
            .map(|r| r.embedding.service_id.as_str())
            .collect();
        assert_eq!(ids, vec!["first", "second", "third"]);
    }

    #[test]
    fn top_k_keeps_highest_scoring_candidates() {
        let pool = vec![
            candidate("low", vec![0.0, 1.0]),
            candidate("high", vec![1.0, 0.0]),
            candidate("mid", vec![1.0, 1.0]),
        ];
        let index = BruteForceIndex;
        let results = index.rank(&[1.0, 0.0], &pool, 2, &[]);

        let ids: Vec<&str> = results
            .iter()
            .map(|r| r.embedding.service_id.as_str())
            .collect();
        assert_eq!(ids, vec!["high", "mid"]);
    }

    #[test]
    fn mismatched_dimensions_score_zero() {
        // A shorter query must not be ranked against vector prefixes
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[1.0, 0.0, 0.0]), 0.0);

        let pool = vec![candidate("a", vec![1.0, 0.0, 0.0])];
        let index = BruteForceIndex;
        let results = index.rank(&[1.0, 0.0], &pool, 10, &[]);
        assert_eq!(results[0].score, 0.0);
    }

    #[test]
    fn zero_norm_vectors_score_zero() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[0.0, 0.0]), 0.0);
    }

    #[test]
    fn opposite_vectors_score_negative() {
        let score = cosine_similarity(&[1.0, 0.0], &[-1.0, 0.0]);
        assert!((score + 1.0).abs() < 1e-6);
    }
}
