//! Frequent-itemset discovery (Apriori).
//!
//! Transactions are encoded as boolean membership rows over the sorted
//! universe of observed categories; itemsets are grown level by level,
//! pruning both by minimum support and by downward closure (every subset
//! of a frequent itemset must itself be frequent).

use std::collections::{BTreeSet, HashSet};

/// One-hot encoding of transactions over the observed category universe.
pub struct TransactionMatrix {
    /// Sorted category universe; itemsets index into this
    items: Vec<String>,
    /// Membership row per transaction
    rows: Vec<Vec<bool>>,
}

impl TransactionMatrix {
    /// Encode transactions. Duplicate labels within one transaction are
    /// collapsed; the universe is sorted so encoding is deterministic
    /// regardless of input order.
    pub fn encode(transactions: &[Vec<String>]) -> Self {
        let universe: BTreeSet<&str> = transactions
            .iter()
            .flatten()
            .map(String::as_str)
            .collect();
        let items: Vec<String> = universe.into_iter().map(str::to_string).collect();

        let rows = transactions
            .iter()
            .map(|transaction| {
                let present: HashSet<&str> = transaction.iter().map(String::as_str).collect();
                items.iter().map(|item| present.contains(item.as_str())).collect()
            })
            .collect();

        Self { items, rows }
    }

    pub fn items(&self) -> &[String] {
        &self.items
    }

    pub fn item(&self, index: usize) -> &str {
        &self.items[index]
    }

    pub fn transaction_count(&self) -> usize {
        self.rows.len()
    }

    /// Fraction of transactions containing every item in `itemset`.
    pub fn support(&self, itemset: &[usize]) -> f64 {
        if self.rows.is_empty() {
            return 0.0;
        }
        let hits = self
            .rows
            .iter()
            .filter(|row| itemset.iter().all(|&i| row[i]))
            .count();
        hits as f64 / self.rows.len() as f64
    }
}

/// A frequent itemset: sorted item indices plus observed support.
#[derive(Debug, Clone)]
pub struct Itemset {
    pub items: Vec<usize>,
    pub support: f64,
}

/// Discover all itemsets with support >= `min_support`.
///
/// Returns itemsets of every size, singletons included, in deterministic
/// order (by size, then lexicographically by item indices).
pub fn frequent_itemsets(matrix: &TransactionMatrix, min_support: f64) -> Vec<Itemset> {
    let mut all = Vec::new();

    // Level 1: frequent singletons
    let mut current: Vec<Vec<usize>> = (0..matrix.items().len())
        .filter(|&i| matrix.support(&[i]) >= min_support)
        .map(|i| vec![i])
        .collect();

    while !current.is_empty() {
        for itemset in &current {
            all.push(Itemset {
                items: itemset.clone(),
                support: matrix.support(itemset),
            });
        }

        let candidates = next_candidates(&current);
        current = candidates
            .into_iter()
            .filter(|candidate| matrix.support(candidate) >= min_support)
            .collect();
    }

    all
}

/// Generate (k+1)-candidates from frequent k-itemsets: join pairs sharing
/// their first k-1 items, then prune candidates with any infrequent
/// k-subset.
fn next_candidates(frequent: &[Vec<usize>]) -> Vec<Vec<usize>> {
    let frequent_set: HashSet<&[usize]> = frequent.iter().map(Vec::as_slice).collect();
    let mut candidates = Vec::new();

    for (pos, left) in frequent.iter().enumerate() {
        for right in &frequent[pos + 1..] {
            let k = left.len();
            if left[..k - 1] != right[..k - 1] {
                continue;
            }

            let mut candidate = left.clone();
            candidate.push(right[k - 1]);
            candidate.sort_unstable();

            if has_all_frequent_subsets(&candidate, &frequent_set) {
                candidates.push(candidate);
            }
        }
    }

    candidates.sort_unstable();
    candidates.dedup();
    candidates
}

fn has_all_frequent_subsets(candidate: &[usize], frequent: &HashSet<&[usize]>) -> bool {
    (0..candidate.len()).all(|skip| {
        let subset: Vec<usize> = candidate
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != skip)
            .map(|(_, &item)| item)
            .collect();
        frequent.contains(subset.as_slice())
    })
}
