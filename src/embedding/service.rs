//! High-level embedding service for marketplace services.
//!
//! Owns the encoding strategy and provides the service-level operations:
//! embedding a service's textual attributes and ranking a candidate pool
//! by similarity.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::config::EmbeddingConfig;
use crate::embedding::encoder::{Encoder, EmbeddingError, FallbackEncoder};
use crate::similarity::{BruteForceIndex, Ranked, SimilarityIndex};

/// Structured metadata carried alongside a service embedding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceMeta {
    pub name: String,
    pub category: String,
    pub tags: Vec<String>,
}

/// A service's semantic fingerprint.
///
/// Immutable once created; when the source text changes the caller
/// replaces the embedding rather than mutating it. Dimension is constant
/// across all instances ranked in one pool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceEmbedding {
    pub service_id: String,
    /// Resolved by the caller after embedding; the service does not map
    /// category names to ids
    pub category_id: String,
    pub vendor_id: String,
    pub vector: Vec<f32>,
    pub meta: ServiceMeta,
}

/// Service for generating embeddings and finding similar services.
pub struct EmbeddingService {
    encoder: Encoder,
    index: BruteForceIndex,
}

impl EmbeddingService {
    /// Create an embedding service from configuration.
    ///
    /// Model load failure is non-fatal: a warning is logged and the
    /// service permanently runs on the fallback encoder for the rest of
    /// its lifetime. There is no retry on later calls.
    pub fn new(config: &EmbeddingConfig, cache_dir: PathBuf) -> Self {
        let encoder = Self::build_encoder(config, cache_dir);
        Self::with_encoder(encoder)
    }

    /// Create a service with an explicitly chosen encoder.
    pub fn with_encoder(encoder: Encoder) -> Self {
        Self {
            encoder,
            index: BruteForceIndex,
        }
    }

    #[cfg(feature = "semantic")]
    fn build_encoder(config: &EmbeddingConfig, cache_dir: PathBuf) -> Encoder {
        use crate::embedding::encoder::SemanticEncoder;
        use std::time::Duration;

        if !config.semantic {
            log::info!("semantic embeddings disabled, using fallback encoder");
            return Encoder::Fallback(FallbackEncoder::new(config.fallback_dimensions));
        }

        let timeout = Duration::from_secs(config.download_timeout_secs);
        match SemanticEncoder::new(&config.model, cache_dir, Some(timeout)) {
            Ok(encoder) => {
                log::info!(
                    "loaded embedding model '{}' ({} dims)",
                    encoder.name(),
                    encoder.dimensions()
                );
                Encoder::Semantic(encoder)
            }
            Err(e) => {
                log::warn!(
                    "could not load embedding model '{}': {e}; \
                     falling back to deterministic vectors (degraded mode)",
                    config.model
                );
                Encoder::Fallback(FallbackEncoder::new(config.fallback_dimensions))
            }
        }
    }

    #[cfg(not(feature = "semantic"))]
    fn build_encoder(config: &EmbeddingConfig, _cache_dir: PathBuf) -> Encoder {
        if config.semantic {
            log::warn!("built without the semantic feature, using fallback encoder");
        }
        Encoder::Fallback(FallbackEncoder::new(config.fallback_dimensions))
    }

    /// Output dimension of generated vectors.
    pub fn dimensions(&self) -> usize {
        self.encoder.dimensions()
    }

    /// True when running on the fallback encoder. Similarity results in
    /// this mode carry no semantic meaning and should not be silently
    /// trusted.
    pub fn is_degraded(&self) -> bool {
        self.encoder.is_degraded()
    }

    /// Generate an embedding for arbitrary text.
    ///
    /// Deterministic across repeated calls within a process lifetime:
    /// the strategy is fixed at construction and both strategies produce
    /// stable output for the same text.
    pub fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        self.encoder.embed(text)
    }

    /// Generate embeddings for multiple texts.
    pub fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        self.encoder.embed_batch(texts)
    }

    /// Generate an embedding for a service from its textual attributes.
    ///
    /// Free-text fields are joined with single spaces, skipping empty
    /// ones. `category_id` is left empty for the caller to resolve.
    pub fn embed_service(
        &self,
        service_id: &str,
        name: &str,
        description: &str,
        category_name: &str,
        tags: &[String],
        vendor_id: &str,
    ) -> Result<ServiceEmbedding, EmbeddingError> {
        let joined_tags = tags.join(" ");
        let combined_text = [name, description, category_name, joined_tags.as_str()]
            .iter()
            .filter(|part| !part.is_empty())
            .copied()
            .collect::<Vec<_>>()
            .join(" ");

        let vector = self.embed(&combined_text)?;

        Ok(ServiceEmbedding {
            service_id: service_id.to_string(),
            category_id: String::new(),
            vendor_id: vendor_id.to_string(),
            vector,
            meta: ServiceMeta {
                name: name.to_string(),
                category: category_name.to_string(),
                tags: tags.to_vec(),
            },
        })
    }

    /// Rank a candidate pool against a query vector by cosine similarity.
    ///
    /// Candidates whose id appears in `exclude_ids` are skipped; an empty
    /// filtered pool returns an empty list.
    pub fn find_similar<'a>(
        &self,
        query: &[f32],
        pool: &'a [ServiceEmbedding],
        top_k: usize,
        exclude_ids: &[String],
    ) -> Vec<Ranked<'a>> {
        self.index.rank(query, pool, top_k, exclude_ids)
    }
}
