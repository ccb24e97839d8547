//! Transaction sources for pattern mining.
//!
//! A "transaction" is the set of distinct category labels touched by one
//! completed or confirmed booking group (grouped by project, or by user
//! when no project exists), restricted to a trailing time window. Groups
//! touching fewer than two distinct categories carry no co-purchase
//! signal and are excluded at the source.

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;

/// Booking statuses that count towards co-purchase history
pub const ALLOWED_STATUSES: [&str; 2] = ["completed", "confirmed"];

/// Minimum distinct categories for a group to qualify as a transaction
const MIN_CATEGORIES: usize = 2;

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed booking data: {0}")]
    Csv(#[from] csv::Error),
}

/// Contract for fetching mining transactions.
///
/// Implementations answer: "for each booking group within the last
/// `window_days`, where status is completed or confirmed and at least two
/// distinct categories are involved, return the distinct category
/// labels."
pub trait TransactionSource: Send + Sync {
    fn fetch_transactions(&self, window_days: i64) -> Result<Vec<Vec<String>>, SourceError>;
}

/// Pre-grouped transactions held in memory. Used by tests; the time
/// window does not apply since the data is already a snapshot.
#[cfg(test)]
pub struct MemoryTransactionSource {
    transactions: Vec<Vec<String>>,
}

#[cfg(test)]
impl MemoryTransactionSource {
    pub fn new(transactions: Vec<Vec<String>>) -> Self {
        Self { transactions }
    }
}

#[cfg(test)]
impl TransactionSource for MemoryTransactionSource {
    fn fetch_transactions(&self, _window_days: i64) -> Result<Vec<Vec<String>>, SourceError> {
        Ok(self
            .transactions
            .iter()
            .map(|transaction| {
                let distinct: BTreeSet<&str> =
                    transaction.iter().map(String::as_str).collect();
                distinct.into_iter().map(str::to_string).collect::<Vec<_>>()
            })
            .filter(|categories: &Vec<String>| categories.len() >= MIN_CATEGORIES)
            .collect())
    }
}

/// One row of a booking export file.
#[derive(Debug, Deserialize)]
struct BookingRow {
    /// Project id, or user id when the booking has no project
    group_id: String,
    status: String,
    category: String,
    created_at: DateTime<Utc>,
}

/// Booking export file in CSV form with columns
/// `group_id,status,category,created_at`.
///
/// Stands in for the relational booking store behind the same query
/// contract: status whitelist, trailing window, minimum category
/// cardinality of 2.
pub struct CsvTransactionSource {
    path: PathBuf,
}

impl CsvTransactionSource {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl TransactionSource for CsvTransactionSource {
    fn fetch_transactions(&self, window_days: i64) -> Result<Vec<Vec<String>>, SourceError> {
        let cutoff = Utc::now() - Duration::days(window_days);

        let mut reader = csv::Reader::from_path(&self.path)?;
        // BTreeMap keeps group order deterministic across runs
        let mut groups: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();

        for row in reader.deserialize() {
            let row: BookingRow = row?;

            if !ALLOWED_STATUSES.contains(&row.status.as_str()) {
                continue;
            }
            if row.created_at <= cutoff {
                continue;
            }

            groups.entry(row.group_id).or_default().insert(row.category);
        }

        Ok(groups
            .into_values()
            .filter(|categories| categories.len() >= MIN_CATEGORIES)
            .map(|categories| categories.into_iter().collect())
            .collect())
    }
}
