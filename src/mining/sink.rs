//! Persistence contract for mined rules.
//!
//! Each mining run produces a complete snapshot; sinks replace the
//! previous snapshot wholesale rather than merging into it.

use std::path::PathBuf;
use std::sync::Mutex;

use crate::mining::rules::CoPurchaseRule;

#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Consumer of mined rule snapshots.
pub trait RuleSink: Send + Sync {
    /// Replace the previous snapshot with `rules`.
    fn replace(&self, rules: &[CoPurchaseRule]) -> Result<(), SinkError>;
}

/// Writes each snapshot as a JSON file, replacing the previous one.
pub struct JsonFileSink {
    path: PathBuf,
}

impl JsonFileSink {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl RuleSink for JsonFileSink {
    fn replace(&self, rules: &[CoPurchaseRule]) -> Result<(), SinkError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(rules)?;
        std::fs::write(&self.path, json)?;
        Ok(())
    }
}

/// In-memory sink for tests.
#[cfg(test)]
#[derive(Default)]
pub struct MemorySink {
    rules: Mutex<Vec<CoPurchaseRule>>,
}

#[cfg(test)]
impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> Vec<CoPurchaseRule> {
        self.rules.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

#[cfg(test)]
impl RuleSink for MemorySink {
    fn replace(&self, rules: &[CoPurchaseRule]) -> Result<(), SinkError> {
        let mut guard = self
            .rules
            .lock()
            .map_err(|e| SinkError::Internal(format!("Lock poisoned: {}", e)))?;
        *guard = rules.to_vec();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(antecedent: &str, consequent: &str) -> CoPurchaseRule {
        CoPurchaseRule {
            antecedent_categories: vec![antecedent.to_string()],
            consequent_categories: vec![consequent.to_string()],
            support: 0.5,
            confidence: 0.8,
            lift: 1.5,
            conviction: 2.0,
            event_context: None,
        }
    }

    #[test]
    fn memory_sink_replaces_not_merges() {
        let sink = MemorySink::new();
        sink.replace(&[rule("a", "b"), rule("b", "c")]).unwrap();
        sink.replace(&[rule("x", "y")]).unwrap();

        let snapshot = sink.snapshot();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].antecedent_categories, vec!["x"]);
    }

    #[test]
    fn json_sink_writes_full_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rules.json");
        let sink = JsonFileSink::new(path.clone());

        sink.replace(&[rule("venue", "catering")]).unwrap();

        let loaded: Vec<CoPurchaseRule> =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].consequent_categories, vec!["catering"]);

        sink.replace(&[]).unwrap();
        let loaded: Vec<CoPurchaseRule> =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert!(loaded.is_empty());
    }
}
