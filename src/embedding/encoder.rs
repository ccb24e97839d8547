//! Text-to-vector encoding strategies.
//!
//! Two strategies exist, selected at construction time:
//! - `SemanticEncoder` wraps a pretrained fastembed model and produces
//!   meaningful semantic vectors
//! - `FallbackEncoder` produces deterministic pseudo-random vectors keyed
//!   by a stable hash of the input text
//!
//! The fallback keeps the rest of the system functional when no model is
//! available (vectors still exist and are reproducible for the same text),
//! but its similarity scores carry no semantic meaning. Callers can check
//! `Encoder::is_degraded` to surface that.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sha2::{Digest, Sha256};

#[cfg(feature = "semantic")]
use fastembed::{InitOptions, TextEmbedding};
#[cfg(feature = "semantic")]
use std::path::PathBuf;
#[cfg(feature = "semantic")]
use std::sync::{mpsc, Mutex};
#[cfg(feature = "semantic")]
use std::time::Duration;

/// Default download timeout for model files (5 minutes)
#[cfg(feature = "semantic")]
const DEFAULT_DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(300);

/// Error type for embedding operations
#[derive(Debug, thiserror::Error)]
pub enum EmbeddingError {
    #[error("Model initialization failed: {0}")]
    InitFailed(String),

    #[error("Embedding generation failed: {0}")]
    EmbeddingFailed(String),

    #[error("Invalid model name: {0}")]
    InvalidModel(String),
}

/// Wrapper around fastembed's TextEmbedding model.
/// Uses a Mutex because fastembed's embed() requires &mut self.
#[cfg(feature = "semantic")]
pub struct SemanticEncoder {
    model: Mutex<TextEmbedding>,
    model_name: String,
    dimensions: usize,
}

#[cfg(feature = "semantic")]
impl SemanticEncoder {
    /// Create a new semantic encoder for the given model name.
    ///
    /// Model files are downloaded on first use into the `models/`
    /// subdirectory of `cache_dir`. Download and session setup run under
    /// `download_timeout`; on expiry init fails and the caller decides
    /// whether to fall back.
    pub fn new(
        model_name: &str,
        cache_dir: PathBuf,
        download_timeout: Option<Duration>,
    ) -> Result<Self, EmbeddingError> {
        let model = resolve_model(model_name)?;
        let timeout = download_timeout.unwrap_or(DEFAULT_DOWNLOAD_TIMEOUT);

        let models_dir = cache_dir.join("models");
        std::fs::create_dir_all(&models_dir)
            .map_err(|e| EmbeddingError::InitFailed(format!("models dir: {e}")))?;

        let options = InitOptions::new(model)
            .with_cache_dir(models_dir)
            .with_show_download_progress(false);

        let mut model = match run_with_deadline(timeout, || TextEmbedding::try_new(options)) {
            Ok(result) => result.map_err(|e| EmbeddingError::InitFailed(e.to_string()))?,
            Err(mpsc::RecvTimeoutError::Timeout) => {
                return Err(EmbeddingError::InitFailed(format!(
                    "model '{model_name}' not ready within {}s",
                    timeout.as_secs()
                )));
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => {
                return Err(EmbeddingError::InitFailed(
                    "model init worker terminated".to_string(),
                ));
            }
        };

        // The first inference doubles as the output-dimension probe
        let probe = model
            .embed(vec!["probe"], None)
            .map_err(|e| EmbeddingError::InitFailed(e.to_string()))?;
        let dimensions = probe
            .first()
            .map(Vec::len)
            .ok_or_else(|| EmbeddingError::InitFailed("model produced no output".to_string()))?;

        Ok(Self {
            model: Mutex::new(model),
            model_name: model_name.to_string(),
            dimensions,
        })
    }

    pub fn name(&self) -> &str {
        &self.model_name
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Generate an embedding for a single text.
    pub fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let mut vectors = self.run(vec![text])?;
        if vectors.is_empty() {
            return Err(EmbeddingError::EmbeddingFailed(
                "model returned no embedding".to_string(),
            ));
        }
        Ok(vectors.swap_remove(0))
    }

    /// Generate embeddings for multiple texts in one model pass.
    pub fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(vec![]);
        }
        self.run(texts.iter().map(String::as_str).collect())
    }

    fn run(&self, texts: Vec<&str>) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let mut model = self
            .model
            .lock()
            .map_err(|_| EmbeddingError::EmbeddingFailed("model lock poisoned".to_string()))?;
        model
            .embed(texts, None)
            .map_err(|e| EmbeddingError::EmbeddingFailed(e.to_string()))
    }
}

/// Map a configured model name onto the supported model set.
#[cfg(feature = "semantic")]
fn resolve_model(name: &str) -> Result<fastembed::EmbeddingModel, EmbeddingError> {
    use fastembed::EmbeddingModel;

    match name.to_lowercase().as_str() {
        "all-minilm-l6-v2" => Ok(EmbeddingModel::AllMiniLML6V2),
        "bge-small-en-v1.5" => Ok(EmbeddingModel::BGESmallENV15),
        "bge-base-en-v1.5" => Ok(EmbeddingModel::BGEBaseENV15),
        "bge-large-en-v1.5" => Ok(EmbeddingModel::BGELargeENV15),
        _ => Err(EmbeddingError::InvalidModel(format!(
            "unknown model '{name}', expected one of: all-MiniLM-L6-v2, \
             bge-small-en-v1.5, bge-base-en-v1.5, bge-large-en-v1.5"
        ))),
    }
}

/// Run `work` on a worker thread, waiting at most `timeout` for its
/// result. On expiry the worker is abandoned, not interrupted.
#[cfg(feature = "semantic")]
fn run_with_deadline<T: Send + 'static>(
    timeout: Duration,
    work: impl FnOnce() -> T + Send + 'static,
) -> Result<T, mpsc::RecvTimeoutError> {
    let (tx, rx) = mpsc::channel();
    std::thread::spawn(move || {
        let _ = tx.send(work());
    });
    rx.recv_timeout(timeout)
}

/// Deterministic pseudo-random encoder used when no semantic model is
/// available.
///
/// The vector is seeded from a SHA-256 hash of the input text, so the
/// same text always produces the same vector, across calls and across
/// processes.
pub struct FallbackEncoder {
    dimensions: usize,
}

impl FallbackEncoder {
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions }
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Generate a deterministic vector for the given text.
    pub fn embed(&self, text: &str) -> Vec<f32> {
        let mut rng = StdRng::seed_from_u64(text_seed(text));
        (0..self.dimensions)
            .map(|_| rng.random_range(-1.0f32..1.0f32))
            .collect()
    }

    /// Generate vectors for multiple texts, parallelized per text.
    pub fn embed_batch(&self, texts: &[String]) -> Vec<Vec<f32>> {
        use rayon::prelude::*;
        texts.par_iter().map(|t| self.embed(t)).collect()
    }
}

/// Stable 64-bit seed derived from the text content.
fn text_seed(text: &str) -> u64 {
    let digest = Sha256::digest(text.as_bytes());
    u64::from_le_bytes(digest[..8].try_into().expect("digest is at least 8 bytes"))
}

/// Encoding strategy, selected at construction time and injected into
/// the embedding service.
pub enum Encoder {
    #[cfg(feature = "semantic")]
    Semantic(SemanticEncoder),
    Fallback(FallbackEncoder),
}

impl Encoder {
    /// Output dimension of this encoder.
    pub fn dimensions(&self) -> usize {
        match self {
            #[cfg(feature = "semantic")]
            Encoder::Semantic(encoder) => encoder.dimensions(),
            Encoder::Fallback(encoder) => encoder.dimensions(),
        }
    }

    /// True when running on the fallback strategy. Similarity scores in
    /// this mode carry no semantic meaning.
    pub fn is_degraded(&self) -> bool {
        matches!(self, Encoder::Fallback(_))
    }

    pub fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        match self {
            #[cfg(feature = "semantic")]
            Encoder::Semantic(encoder) => encoder.embed(text),
            Encoder::Fallback(encoder) => Ok(encoder.embed(text)),
        }
    }

    pub fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        match self {
            #[cfg(feature = "semantic")]
            Encoder::Semantic(encoder) => encoder.embed_batch(texts),
            Encoder::Fallback(encoder) => Ok(encoder.embed_batch(texts)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallback_is_deterministic() {
        let encoder = FallbackEncoder::new(384);
        let a = encoder.embed("wedding photography");
        let b = encoder.embed("wedding photography");
        assert_eq!(a, b);
        assert_eq!(a.len(), 384);
    }

    #[test]
    fn fallback_differs_per_text() {
        let encoder = FallbackEncoder::new(64);
        let a = encoder.embed("catering");
        let b = encoder.embed("venue");
        assert_ne!(a, b);
    }

    #[test]
    fn fallback_handles_empty_text() {
        let encoder = FallbackEncoder::new(16);
        let v = encoder.embed("");
        assert_eq!(v.len(), 16);
        assert_eq!(v, encoder.embed(""));
    }

    #[test]
    fn fallback_batch_matches_single() {
        let encoder = FallbackEncoder::new(32);
        let texts = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let batch = encoder.embed_batch(&texts);
        assert_eq!(batch.len(), 3);
        for (text, vector) in texts.iter().zip(&batch) {
            assert_eq!(vector, &encoder.embed(text));
        }
    }

    #[test]
    fn text_seed_is_stable() {
        // Seeds must not change between processes, unlike DefaultHasher
        assert_eq!(text_seed("venue"), text_seed("venue"));
        assert_ne!(text_seed("venue"), text_seed("catering"));
    }

    #[cfg(feature = "semantic")]
    #[test]
    #[ignore = "requires model download"]
    fn semantic_encoder_dimensions() {
        let temp_dir = std::env::temp_dir().join("reco-encoder-test");
        let encoder = SemanticEncoder::new("all-MiniLM-L6-v2", temp_dir.clone(), None).unwrap();
        assert_eq!(encoder.dimensions(), 384);
        let _ = std::fs::remove_dir_all(&temp_dir);
    }

    #[cfg(feature = "semantic")]
    #[test]
    fn invalid_model_name_rejected() {
        let temp_dir = std::env::temp_dir().join("reco-encoder-invalid");
        let result = SemanticEncoder::new("nonexistent-model", temp_dir, None);
        assert!(matches!(result, Err(EmbeddingError::InvalidModel(_))));
    }

    #[cfg(feature = "semantic")]
    #[test]
    fn only_documented_models_resolve() {
        assert!(resolve_model("all-MiniLM-L6-v2").is_ok());
        assert!(resolve_model("bge-small-en-v1.5").is_ok());
        // quantized variants are not part of the supported set
        assert!(matches!(
            resolve_model("all-minilm-l6-v2-q"),
            Err(EmbeddingError::InvalidModel(_))
        ));
    }

    #[cfg(feature = "semantic")]
    #[test]
    fn deadline_returns_fast_results() {
        let value = run_with_deadline(Duration::from_secs(1), || 7).unwrap();
        assert_eq!(value, 7);
    }

    #[cfg(feature = "semantic")]
    #[test]
    fn deadline_abandons_slow_init() {
        let result = run_with_deadline(Duration::from_millis(50), || {
            std::thread::sleep(Duration::from_secs(5));
            7
        });
        assert!(matches!(result, Err(mpsc::RecvTimeoutError::Timeout)));
    }
}
