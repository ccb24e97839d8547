//! Co-purchase pattern mining over historical booking data.
//!
//! Discovers statistically validated associations between service
//! categories ("people who book catering also book a venue") from
//! transaction snapshots.
//!
//! # Architecture
//!
//! - `source`: the transaction fetch contract and its file/memory backends
//! - `apriori`: one-hot transaction encoding and frequent-itemset discovery
//! - `rules`: association-rule derivation with support, confidence, lift
//!   and conviction
//! - `miner`: the batch entry point tying fetch, mining and filtering
//!   together
//! - `sink`: the replace-not-merge snapshot contract for mined rules

mod apriori;
mod miner;
mod rules;
mod sink;
mod source;

pub use miner::{CoPurchasePatternMiner, MiningError, MIN_TRANSACTIONS};
pub use rules::CoPurchaseRule;
pub use sink::{JsonFileSink, RuleSink, SinkError};
#[cfg(test)]
pub use sink::MemorySink;
pub use source::{CsvTransactionSource, SourceError, TransactionSource};
#[cfg(test)]
pub use source::MemoryTransactionSource;
