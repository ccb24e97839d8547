//! The event archetype catalog.
//!
//! Static domain data: per event type, the search keywords and category
//! signals that indicate it, plus scoring parameters. The catalog is
//! built once and injected into the detector; it is closed at
//! configuration time, never mutated at runtime.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

/// The closed set of detectable life events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    Wedding,
    Relocation,
    Childbirth,
    BusinessLaunch,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Wedding => "wedding",
            EventType::Relocation => "relocation",
            EventType::Childbirth => "childbirth",
            EventType::BusinessLaunch => "business_launch",
        }
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Signal definition for one event type.
#[derive(Debug, Clone)]
pub struct EventArchetype {
    pub event_type: EventType,
    /// Search keywords matched as lowercase substrings
    pub keywords: Vec<String>,
    /// Category slugs that indicate this event
    pub category_signals: Vec<String>,
    /// Category views only contribute once this many signals match
    pub min_category_matches: usize,
    /// Confidence added per matched category view. Archetype-specific:
    /// some events are more reliably indicated by browsing than others.
    pub boost_per_match: f64,
}

/// Immutable, ordered set of archetypes.
///
/// Iteration order is the catalog order, which keeps detector output
/// deterministic for tied confidences.
#[derive(Debug, Clone)]
pub struct ArchetypeCatalog {
    archetypes: Vec<EventArchetype>,
}

impl ArchetypeCatalog {
    pub fn new(archetypes: Vec<EventArchetype>) -> Self {
        Self { archetypes }
    }

    /// The built-in catalog with the reference signal lists and weights.
    pub fn builtin() -> Self {
        BUILTIN.clone()
    }

    pub fn archetypes(&self) -> &[EventArchetype] {
        &self.archetypes
    }
}

static BUILTIN: Lazy<ArchetypeCatalog> = Lazy::new(|| {
    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    ArchetypeCatalog::new(vec![
        EventArchetype {
            event_type: EventType::Wedding,
            keywords: strings(&[
                "wedding",
                "bride",
                "groom",
                "reception",
                "engagement",
                "bridal",
                "ceremony",
                "vows",
                "honeymoon",
                "registry",
            ]),
            category_signals: strings(&[
                "venue",
                "catering",
                "photography",
                "decoration",
                "florist",
                "cake",
                "makeup",
            ]),
            min_category_matches: 2,
            boost_per_match: 0.15,
        },
        EventArchetype {
            event_type: EventType::Relocation,
            keywords: strings(&[
                "moving",
                "relocation",
                "new home",
                "apartment",
                "movers",
                "packing",
            ]),
            category_signals: strings(&[
                "moving",
                "cleaning",
                "painting",
                "electrical",
                "plumbing",
            ]),
            min_category_matches: 2,
            boost_per_match: 0.12,
        },
        EventArchetype {
            event_type: EventType::Childbirth,
            keywords: strings(&[
                "baby",
                "pregnancy",
                "newborn",
                "maternity",
                "nursery",
                "baby shower",
            ]),
            category_signals: strings(&["doula", "photographer", "catering", "decoration"]),
            min_category_matches: 1,
            boost_per_match: 0.20,
        },
        EventArchetype {
            event_type: EventType::BusinessLaunch,
            keywords: strings(&[
                "business",
                "company",
                "startup",
                "office",
                "registration",
                "branding",
            ]),
            category_signals: strings(&[
                "business_registration",
                "legal",
                "branding",
                "webdev",
            ]),
            min_category_matches: 2,
            boost_per_match: 0.15,
        },
    ])
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_catalog_has_four_archetypes_in_stable_order() {
        let catalog = ArchetypeCatalog::builtin();
        let order: Vec<EventType> = catalog
            .archetypes()
            .iter()
            .map(|a| a.event_type)
            .collect();
        assert_eq!(
            order,
            vec![
                EventType::Wedding,
                EventType::Relocation,
                EventType::Childbirth,
                EventType::BusinessLaunch,
            ]
        );
    }

    #[test]
    fn event_type_serializes_snake_case() {
        let json = serde_json::to_string(&EventType::BusinessLaunch).unwrap();
        assert_eq!(json, "\"business_launch\"");
        assert_eq!(EventType::Wedding.to_string(), "wedding");
    }
}
