//! Lifecycle owner for the ML components.
//!
//! Holds no algorithmic logic of its own: it sequences the batch mining
//! job and exposes the synchronous query surface (similarity lookup,
//! event detection) to callers. The query surface is stateless per call
//! and safe for concurrent use; the batch path is single-flight.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::config::Config;
use crate::embedding::{EmbeddingError, EmbeddingService, ServiceEmbedding};
use crate::events::{ArchetypeCatalog, DetectedEvent, EventDetector, UserSignals};
use crate::mining::{CoPurchasePatternMiner, RuleSink, TransactionSource};
use crate::similarity::Ranked;

/// Outcome of one batch mining invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MiningRun {
    /// Rules were mined and the sink snapshot replaced
    Completed { rules: usize },
    /// A run was already in flight; this invocation was rejected
    InFlight,
    /// Fetch or sink failure; the run was abandoned and the previous
    /// snapshot remains authoritative until the next scheduled run
    Aborted,
}

pub struct MlOrchestrator {
    embeddings: EmbeddingService,
    detector: EventDetector,
    miner: CoPurchasePatternMiner,
    source: Arc<dyn TransactionSource>,
    sink: Arc<dyn RuleSink>,
    window_days: i64,
    mining_in_flight: AtomicBool,
}

impl MlOrchestrator {
    pub fn new(
        config: &Config,
        cache_dir: PathBuf,
        source: Arc<dyn TransactionSource>,
        sink: Arc<dyn RuleSink>,
    ) -> Self {
        Self {
            embeddings: EmbeddingService::new(&config.embedding, cache_dir),
            detector: EventDetector::new(ArchetypeCatalog::builtin(), config.detection.clone()),
            miner: CoPurchasePatternMiner::new(&config.mining),
            source,
            sink,
            window_days: config.mining.time_window_days,
            mining_in_flight: AtomicBool::new(false),
        }
    }

    /// Build with pre-constructed components (tests, custom encoders).
    pub fn with_components(
        embeddings: EmbeddingService,
        detector: EventDetector,
        miner: CoPurchasePatternMiner,
        source: Arc<dyn TransactionSource>,
        sink: Arc<dyn RuleSink>,
        window_days: i64,
    ) -> Self {
        Self {
            embeddings,
            detector,
            miner,
            source,
            sink,
            window_days,
            mining_in_flight: AtomicBool::new(false),
        }
    }

    pub fn embeddings(&self) -> &EmbeddingService {
        &self.embeddings
    }

    /// Embed a query text and rank the supplied candidate pool.
    pub fn similar_services<'a>(
        &self,
        query_text: &str,
        pool: &'a [ServiceEmbedding],
        top_k: usize,
        exclude_ids: &[String],
    ) -> Result<Vec<Ranked<'a>>, EmbeddingError> {
        let query = self.embeddings.embed(query_text)?;
        Ok(self.embeddings.find_similar(&query, pool, top_k, exclude_ids))
    }

    /// Rank the supplied candidate pool against an existing vector.
    pub fn similar_by_vector<'a>(
        &self,
        query: &[f32],
        pool: &'a [ServiceEmbedding],
        top_k: usize,
        exclude_ids: &[String],
    ) -> Vec<Ranked<'a>> {
        self.embeddings.find_similar(query, pool, top_k, exclude_ids)
    }

    /// Score a user's signal window against the archetype catalog.
    pub fn detect_events(&self, signals: &UserSignals) -> Vec<DetectedEvent> {
        self.detector.detect(signals)
    }

    /// Run the periodic batch job: mine co-purchase rules and replace
    /// the sink snapshot.
    ///
    /// Single-flight: a second invocation while one is running is
    /// rejected with [`MiningRun::InFlight`] since concurrent writers
    /// would race on the replaced snapshot. Failures are logged and
    /// abandoned, never propagated as panics; the next scheduled run is
    /// unaffected.
    pub fn run_daily_jobs(&self, event_type: Option<&str>, window_days: Option<i64>) -> MiningRun {
        if self.mining_in_flight.swap(true, Ordering::SeqCst) {
            log::warn!("mining run already in flight, rejecting invocation");
            return MiningRun::InFlight;
        }

        let window = window_days.unwrap_or(self.window_days);
        log::info!(
            "starting daily ML jobs (window={}d, event_type={:?})",
            window,
            event_type
        );

        let run = match self.miner.mine_patterns(&self.source, event_type, window) {
            Ok(rules) => match self.sink.replace(&rules) {
                Ok(()) => {
                    log::info!("daily ML jobs completed, {} rules emitted", rules.len());
                    MiningRun::Completed { rules: rules.len() }
                }
                Err(e) => {
                    log::error!("failed to persist mined rules: {e}");
                    MiningRun::Aborted
                }
            },
            Err(e) => {
                log::error!("mining run abandoned: {e}");
                MiningRun::Aborted
            }
        };

        self.mining_in_flight.store(false, Ordering::SeqCst);
        run
    }
}
