//! Life-event detection from user behavior signals.
//!
//! Scores recent searches, category views and bookings against a fixed
//! catalog of event archetypes (wedding, relocation, childbirth,
//! business launch). This is a rule-based linear scoring model, not a
//! trained classifier: every threshold is auditable and tunable without
//! retraining.

mod catalog;
mod detector;

pub use catalog::{ArchetypeCatalog, EventArchetype, EventType};
pub use detector::{DetectedEvent, EventDetector, UserSignals};
