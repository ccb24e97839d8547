//! Embedding generation for marketplace services.
//!
//! Turns a service's textual attributes into a fixed-length vector that
//! the similarity index can rank against.
//!
//! # Architecture
//!
//! - `encoder`: the two encoding strategies (pretrained semantic model
//!   via fastembed, or a deterministic hash-seeded fallback)
//! - `service`: high-level embedding service and the `ServiceEmbedding`
//!   domain type

mod encoder;
mod service;

pub use encoder::{Encoder, EmbeddingError, FallbackEncoder};
#[cfg(feature = "semantic")]
pub use encoder::SemanticEncoder;
pub use service::{EmbeddingService, ServiceEmbedding, ServiceMeta};
