//! Association-rule derivation from frequent itemsets.

use serde::{Deserialize, Serialize};

use crate::mining::apriori::{Itemset, TransactionMatrix};

/// A mined association between two disjoint sets of category labels.
///
/// Every emitted rule satisfies the configured minimum support,
/// confidence and lift; all metrics are finite.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoPurchaseRule {
    pub antecedent_categories: Vec<String>,
    pub consequent_categories: Vec<String>,
    /// Fraction of transactions containing antecedent and consequent
    pub support: f64,
    /// P(consequent | antecedent)
    pub confidence: f64,
    /// Observed / expected co-occurrence under independence
    pub lift: f64,
    /// Implication strength; 0 when undefined (confidence = 1)
    pub conviction: f64,
    /// Event-type filter the mining run was scoped to, if any
    pub event_context: Option<String>,
}

/// Derive rules from frequent itemsets of size >= 2.
///
/// Every antecedent/consequent split of each itemset is considered;
/// survivors are sorted by descending lift.
pub fn derive_rules(
    matrix: &TransactionMatrix,
    itemsets: &[Itemset],
    min_confidence: f64,
    min_lift: f64,
) -> Vec<CoPurchaseRule> {
    let mut rules = Vec::new();

    for itemset in itemsets.iter().filter(|s| s.items.len() >= 2) {
        for (antecedent, consequent) in splits(&itemset.items) {
            let antecedent_support = matrix.support(&antecedent);
            let consequent_support = matrix.support(&consequent);
            if antecedent_support <= 0.0 {
                continue;
            }

            let confidence = sanitize(itemset.support / antecedent_support);
            let lift = if consequent_support > 0.0 {
                sanitize(confidence / consequent_support)
            } else {
                0.0
            };

            if confidence < min_confidence || lift < min_lift {
                continue;
            }

            rules.push(CoPurchaseRule {
                antecedent_categories: labels(matrix, &antecedent),
                consequent_categories: labels(matrix, &consequent),
                support: sanitize(itemset.support),
                confidence,
                lift,
                conviction: conviction(consequent_support, confidence),
                event_context: None,
            });
        }
    }

    rules.sort_by(|a, b| {
        b.lift
            .partial_cmp(&a.lift)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    rules
}

/// Conviction of a rule: (1 - support(consequent)) / (1 - confidence).
///
/// At confidence = 1 the denominator vanishes and conviction is
/// mathematically undefined; it is reported as 0 so downstream consumers
/// never see NaN or infinity.
pub fn conviction(consequent_support: f64, confidence: f64) -> f64 {
    if confidence >= 1.0 {
        return 0.0;
    }
    sanitize((1.0 - consequent_support) / (1.0 - confidence))
}

/// Coerce non-finite values to 0 before they reach a rule.
fn sanitize(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

/// All (antecedent, consequent) partitions of an itemset into two
/// non-empty disjoint parts, enumerated by bitmask.
fn splits(items: &[usize]) -> Vec<(Vec<usize>, Vec<usize>)> {
    let n = items.len();
    let mut out = Vec::new();

    for mask in 1..(1u32 << n) - 1 {
        let mut antecedent = Vec::new();
        let mut consequent = Vec::new();
        for (bit, &item) in items.iter().enumerate() {
            if mask & (1 << bit) != 0 {
                antecedent.push(item);
            } else {
                consequent.push(item);
            }
        }
        out.push((antecedent, consequent));
    }

    out
}

fn labels(matrix: &TransactionMatrix, items: &[usize]) -> Vec<String> {
    items.iter().map(|&i| matrix.item(i).to_string()).collect()
}
