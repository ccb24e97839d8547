//! Batch entry point for co-purchase mining.

use std::sync::mpsc;
use std::sync::Arc;
use std::time::Duration;

use crate::config::MiningConfig;
use crate::mining::apriori::{frequent_itemsets, TransactionMatrix};
use crate::mining::rules::{derive_rules, CoPurchaseRule};
use crate::mining::source::{SourceError, TransactionSource};

/// Frequent-itemset statistics are unreliable below this volume; mining
/// is skipped rather than fabricating rules from noise.
pub const MIN_TRANSACTIONS: usize = 10;

#[derive(Debug, thiserror::Error)]
pub enum MiningError {
    #[error("Transaction fetch failed: {0}")]
    Source(#[from] SourceError),

    #[error("Transaction fetch worker disappeared")]
    FetchWorkerGone,
}

/// Mines co-purchase rules from booking transactions.
pub struct CoPurchasePatternMiner {
    min_support: f64,
    min_confidence: f64,
    min_lift: f64,
    fetch_timeout: Duration,
}

impl CoPurchasePatternMiner {
    pub fn new(config: &MiningConfig) -> Self {
        Self {
            min_support: config.min_support,
            min_confidence: config.min_confidence,
            min_lift: config.min_lift,
            fetch_timeout: Duration::from_secs(config.fetch_timeout_secs),
        }
    }

    /// Mine rules from the source over the trailing window.
    ///
    /// Returns an empty list (not an error) when fewer than
    /// [`MIN_TRANSACTIONS`] transactions are available, when no itemset
    /// clears the support threshold, or when the fetch times out. A
    /// failed fetch is an error for the caller to log and abandon.
    pub fn mine_patterns(
        &self,
        source: &Arc<dyn TransactionSource>,
        event_type: Option<&str>,
        window_days: i64,
    ) -> Result<Vec<CoPurchaseRule>, MiningError> {
        let Some(transactions) = self.fetch_with_timeout(source, window_days)? else {
            log::warn!(
                "transaction fetch exceeded {:?}, skipping mining run",
                self.fetch_timeout
            );
            return Ok(vec![]);
        };

        Ok(self.mine_transactions(&transactions, event_type))
    }

    /// CPU-bound mining over an already-fetched transaction snapshot.
    pub fn mine_transactions(
        &self,
        transactions: &[Vec<String>],
        event_type: Option<&str>,
    ) -> Vec<CoPurchaseRule> {
        if transactions.len() < MIN_TRANSACTIONS {
            log::info!(
                "only {} transactions in window (need {}), skipping pattern mining",
                transactions.len(),
                MIN_TRANSACTIONS
            );
            return vec![];
        }

        let matrix = TransactionMatrix::encode(transactions);
        let itemsets = frequent_itemsets(&matrix, self.min_support);
        if itemsets.is_empty() {
            log::info!("no itemset cleared min_support={}", self.min_support);
            return vec![];
        }

        let mut rules = derive_rules(&matrix, &itemsets, self.min_confidence, self.min_lift);
        for rule in &mut rules {
            rule.event_context = event_type.map(str::to_string);
        }

        log::info!(
            "mined {} co-purchase rules from {} transactions",
            rules.len(),
            transactions.len()
        );
        rules
    }

    /// Run the store query on a worker thread with a coarse timeout.
    /// `Ok(None)` means the timeout expired.
    fn fetch_with_timeout(
        &self,
        source: &Arc<dyn TransactionSource>,
        window_days: i64,
    ) -> Result<Option<Vec<Vec<String>>>, MiningError> {
        let (tx, rx) = mpsc::channel();
        let source = Arc::clone(source);
        std::thread::spawn(move || {
            let _ = tx.send(source.fetch_transactions(window_days));
        });

        match rx.recv_timeout(self.fetch_timeout) {
            Ok(result) => Ok(Some(result?)),
            Err(mpsc::RecvTimeoutError::Timeout) => Ok(None),
            Err(mpsc::RecvTimeoutError::Disconnected) => Err(MiningError::FetchWorkerGone),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mining::source::MemoryTransactionSource;

    fn miner() -> CoPurchasePatternMiner {
        CoPurchasePatternMiner::new(&MiningConfig::default())
    }

    fn pair(a: &str, b: &str) -> Vec<String> {
        vec![a.to_string(), b.to_string()]
    }

    #[test]
    fn fewer_than_ten_transactions_yields_empty() {
        let transactions: Vec<Vec<String>> =
            (0..9).map(|_| pair("venue", "catering")).collect();
        assert!(miner().mine_transactions(&transactions, None).is_empty());
    }

    #[test]
    fn emitted_rules_satisfy_all_thresholds() {
        let mut transactions: Vec<Vec<String>> =
            (0..10).map(|_| pair("venue", "catering")).collect();
        transactions.push(pair("photography", "florist"));
        transactions.push(pair("photography", "florist"));
        transactions.push(pair("decor", "makeup"));
        transactions.push(pair("decor", "makeup"));

        let config = MiningConfig::default();
        let rules = miner().mine_transactions(&transactions, None);

        assert!(!rules.is_empty());
        for rule in &rules {
            assert!(rule.support >= config.min_support);
            assert!(rule.confidence >= config.min_confidence);
            assert!(rule.lift >= config.min_lift);
            assert!(rule.conviction >= 0.0);
            assert!(rule.conviction.is_finite());
        }
    }

    #[test]
    fn event_context_attached_verbatim() {
        let transactions: Vec<Vec<String>> =
            (0..12).map(|_| pair("venue", "catering")).collect();
        let rules = miner().mine_transactions(&transactions, Some("wedding"));

        assert!(!rules.is_empty());
        for rule in &rules {
            assert_eq!(rule.event_context.as_deref(), Some("wedding"));
        }
    }

    #[test]
    fn fetch_timeout_returns_empty_not_error() {
        struct SlowSource;
        impl TransactionSource for SlowSource {
            fn fetch_transactions(
                &self,
                _window_days: i64,
            ) -> Result<Vec<Vec<String>>, SourceError> {
                std::thread::sleep(Duration::from_secs(5));
                Ok(vec![])
            }
        }

        let mut config = MiningConfig::default();
        config.fetch_timeout_secs = 1;
        // recv_timeout granularity is fine at this scale, but keep the
        // sleep well clear of the timeout
        let miner = CoPurchasePatternMiner {
            fetch_timeout: Duration::from_millis(50),
            ..CoPurchasePatternMiner::new(&config)
        };

        let source: Arc<dyn TransactionSource> = Arc::new(SlowSource);
        let rules = miner.mine_patterns(&source, None, 90).unwrap();
        assert!(rules.is_empty());
    }

    #[test]
    fn mine_patterns_pulls_from_source() {
        let transactions: Vec<Vec<String>> =
            (0..15).map(|_| pair("venue", "catering")).collect();
        let source: Arc<dyn TransactionSource> =
            Arc::new(MemoryTransactionSource::new(transactions));

        let rules = miner().mine_patterns(&source, None, 90).unwrap();
        assert!(!rules.is_empty());
    }
}
