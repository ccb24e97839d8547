//! Scoring of user signals against the archetype catalog.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::DetectionConfig;
use crate::events::catalog::{ArchetypeCatalog, EventArchetype, EventType};

/// A user's recent behavior window, supplied by the caller per request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserSignals {
    #[serde(default)]
    pub recent_searches: Vec<String>,
    #[serde(default)]
    pub viewed_categories: Vec<String>,
    #[serde(default)]
    pub booked_categories: Vec<String>,
}

/// A scored hypothesis that the user is undergoing a life event.
///
/// Not persisted by this subsystem; the caller decides retention.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectedEvent {
    pub event_type: EventType,
    /// Clamped to [0, 1]; always at or above the detection threshold
    pub confidence: f64,
    /// Human-readable provenance, in evaluation order
    pub trigger_signals: Vec<String>,
    pub detected_at: DateTime<Utc>,
}

/// Detects life events by scoring signals against each archetype
/// independently.
pub struct EventDetector {
    catalog: ArchetypeCatalog,
    config: DetectionConfig,
}

impl EventDetector {
    pub fn new(catalog: ArchetypeCatalog, config: DetectionConfig) -> Self {
        Self { catalog, config }
    }

    /// Score all archetypes against the signal window.
    ///
    /// Returns every archetype whose summed confidence reaches the
    /// detection threshold, sorted by descending confidence. Ties keep
    /// the catalog order (stable sort), so output is deterministic.
    pub fn detect(&self, signals: &UserSignals) -> Vec<DetectedEvent> {
        let search_text = signals.recent_searches.join(" ").to_lowercase();

        let mut detected: Vec<DetectedEvent> = self
            .catalog
            .archetypes()
            .iter()
            .filter_map(|archetype| self.score_archetype(archetype, &search_text, signals))
            .collect();

        detected.sort_by(|a, b| {
            b.confidence
                .partial_cmp(&a.confidence)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        detected
    }

    fn score_archetype(
        &self,
        archetype: &EventArchetype,
        search_text: &str,
        signals: &UserSignals,
    ) -> Option<DetectedEvent> {
        let mut confidence = 0.0;
        let mut trigger_signals = Vec::new();

        // Keyword score, capped so keyword spam cannot dominate
        let keyword_matches = archetype
            .keywords
            .iter()
            .filter(|keyword| search_text.contains(keyword.to_lowercase().as_str()))
            .count();
        if keyword_matches > 0 {
            confidence +=
                (keyword_matches as f64 * self.config.keyword_weight).min(self.config.keyword_cap);
            trigger_signals.push(format!("keyword_matches:{}", keyword_matches));
        }

        // Category views only count once the archetype's minimum is met
        let category_views = signals
            .viewed_categories
            .iter()
            .filter(|category| archetype.category_signals.contains(category))
            .count();
        if category_views >= archetype.min_category_matches {
            confidence += category_views as f64 * archetype.boost_per_match;
            trigger_signals.push(format!("category_views:{}", category_views));
        }

        // Any booking in a signal category counts
        let category_bookings = signals
            .booked_categories
            .iter()
            .filter(|category| archetype.category_signals.contains(category))
            .count();
        if category_bookings > 0 {
            confidence += category_bookings as f64 * self.config.booking_weight;
            trigger_signals.push(format!("category_bookings:{}", category_bookings));
        }

        if confidence < self.config.threshold {
            return None;
        }

        Some(DetectedEvent {
            event_type: archetype.event_type,
            confidence: confidence.clamp(0.0, 1.0),
            trigger_signals,
            detected_at: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detector() -> EventDetector {
        EventDetector::new(ArchetypeCatalog::builtin(), DetectionConfig::default())
    }

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn no_matching_signals_yields_no_events() {
        let signals = UserSignals {
            recent_searches: strings(&["lawn mowing", "gutter repair"]),
            viewed_categories: strings(&["landscaping"]),
            booked_categories: vec![],
        };
        assert!(detector().detect(&signals).is_empty());
    }

    #[test]
    fn single_keyword_plus_two_views_scores_0_4() {
        let signals = UserSignals {
            recent_searches: strings(&[
                "wedding venues near me",
                "wedding caterers",
                "outdoor wedding ideas",
            ]),
            viewed_categories: strings(&["venue", "catering"]),
            booked_categories: vec![],
        };

        let events = detector().detect(&signals);
        assert_eq!(events.len(), 1);

        let event = &events[0];
        assert_eq!(event.event_type, EventType::Wedding);
        // 1 keyword (0.1) + 2 category views (2 x 0.15)
        assert!((event.confidence - 0.4).abs() < 1e-9);
        assert!(event
            .trigger_signals
            .iter()
            .any(|s| s.starts_with("keyword_matches:")));
        assert!(event.trigger_signals.contains(&"category_views:2".to_string()));
    }

    #[test]
    fn keyword_contribution_is_capped() {
        let signals = UserSignals {
            recent_searches: strings(&[
                "wedding bride groom reception engagement bridal ceremony vows",
            ]),
            viewed_categories: vec![],
            booked_categories: vec![],
        };

        let events = detector().detect(&signals);
        assert_eq!(events.len(), 1);
        // 8 keyword matches, contribution capped at 0.3
        assert!((events[0].confidence - 0.3).abs() < 1e-9);
        assert_eq!(events[0].trigger_signals, vec!["keyword_matches:8"]);
    }

    #[test]
    fn views_below_minimum_do_not_contribute() {
        // Wedding requires 2 category matches; one view of "venue" alone
        // stays below the threshold and nothing is emitted
        let signals = UserSignals {
            recent_searches: strings(&["wedding"]),
            viewed_categories: strings(&["venue"]),
            booked_categories: vec![],
        };
        assert!(detector().detect(&signals).is_empty());
    }

    #[test]
    fn bookings_count_with_fixed_weight() {
        let signals = UserSignals {
            recent_searches: vec![],
            viewed_categories: vec![],
            booked_categories: strings(&["venue", "catering"]),
        };

        let events = detector().detect(&signals);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, EventType::Wedding);
        // 2 bookings x 0.25
        assert!((events[0].confidence - 0.5).abs() < 1e-9);
        assert_eq!(events[0].trigger_signals, vec!["category_bookings:2"]);
    }

    #[test]
    fn confidence_is_clamped_to_one() {
        let signals = UserSignals {
            recent_searches: strings(&["wedding bridal engagement"]),
            viewed_categories: strings(&[
                "venue",
                "catering",
                "photography",
                "decoration",
                "florist",
            ]),
            booked_categories: strings(&["venue", "catering", "cake"]),
        };

        let events = detector().detect(&signals);
        assert!(!events.is_empty());
        for event in &events {
            assert!(event.confidence <= 1.0);
            assert!(event.confidence >= 0.3);
        }
    }

    #[test]
    fn output_sorted_by_descending_confidence() {
        // Strong childbirth signal (booking) and weaker relocation signal
        let signals = UserSignals {
            recent_searches: strings(&["movers quote", "packing supplies", "baby shower"]),
            viewed_categories: strings(&["moving", "cleaning"]),
            booked_categories: strings(&["doula", "photographer"]),
        };

        let events = detector().detect(&signals);
        assert!(events.len() >= 2);
        for pair in events.windows(2) {
            assert!(pair[0].confidence >= pair[1].confidence);
        }
    }

    #[test]
    fn trigger_signals_follow_evaluation_order() {
        let signals = UserSignals {
            recent_searches: strings(&["wedding planning"]),
            viewed_categories: strings(&["venue", "catering"]),
            booked_categories: strings(&["cake"]),
        };

        let events = detector().detect(&signals);
        assert_eq!(events.len(), 1);
        assert_eq!(
            events[0].trigger_signals,
            vec!["keyword_matches:1", "category_views:2", "category_bookings:1"]
        );
    }
}
