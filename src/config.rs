use serde::{Deserialize, Serialize};

/// Default semantic embedding model (MiniLM: 384 dims, small download)
const DEFAULT_EMBEDDING_MODEL: &str = "all-MiniLM-L6-v2";
/// Dimension of fallback embeddings (matches the default model)
const DEFAULT_FALLBACK_DIMENSIONS: usize = 384;
/// Default model download timeout in seconds
const DEFAULT_DOWNLOAD_TIMEOUT_SECS: u64 = 300;

const DEFAULT_MIN_SUPPORT: f64 = 0.01;
const DEFAULT_MIN_CONFIDENCE: f64 = 0.1;
const DEFAULT_MIN_LIFT: f64 = 1.0;
const DEFAULT_TIME_WINDOW_DAYS: i64 = 90;
const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 60;

const DEFAULT_DETECTION_THRESHOLD: f64 = 0.3;
const DEFAULT_KEYWORD_WEIGHT: f64 = 0.1;
const DEFAULT_KEYWORD_CAP: f64 = 0.3;
const DEFAULT_BOOKING_WEIGHT: f64 = 0.25;

/// Configuration for the embedding service
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Use the pretrained semantic model when available.
    /// When false (or when the model fails to load) the deterministic
    /// fallback encoder is used instead.
    #[serde(default = "default_true")]
    pub semantic: bool,

    /// Model name for embeddings (e.g., "all-MiniLM-L6-v2")
    #[serde(default = "default_embedding_model")]
    pub model: String,

    /// Dimension of fallback vectors when no model is available
    #[serde(default = "default_fallback_dimensions")]
    pub fallback_dimensions: usize,

    /// Timeout for model download in seconds
    #[serde(default = "default_download_timeout_secs")]
    pub download_timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            semantic: true,
            model: DEFAULT_EMBEDDING_MODEL.to_string(),
            fallback_dimensions: DEFAULT_FALLBACK_DIMENSIONS,
            download_timeout_secs: DEFAULT_DOWNLOAD_TIMEOUT_SECS,
        }
    }
}

/// Configuration for co-purchase pattern mining
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MiningConfig {
    /// Minimum fraction of transactions an itemset must appear in
    #[serde(default = "default_min_support")]
    pub min_support: f64,

    /// Minimum P(consequent | antecedent) for an emitted rule
    #[serde(default = "default_min_confidence")]
    pub min_confidence: f64,

    /// Minimum lift for an emitted rule; below 1.0 means no positive
    /// correlation
    #[serde(default = "default_min_lift")]
    pub min_lift: f64,

    /// Trailing window of booking history to mine, in days
    #[serde(default = "default_time_window_days")]
    pub time_window_days: i64,

    /// Coarse timeout for the transaction fetch; on expiry the mining
    /// run yields empty results instead of blocking
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,
}

impl Default for MiningConfig {
    fn default() -> Self {
        Self {
            min_support: DEFAULT_MIN_SUPPORT,
            min_confidence: DEFAULT_MIN_CONFIDENCE,
            min_lift: DEFAULT_MIN_LIFT,
            time_window_days: DEFAULT_TIME_WINDOW_DAYS,
            fetch_timeout_secs: DEFAULT_FETCH_TIMEOUT_SECS,
        }
    }
}

/// Configuration for life-event detection.
///
/// The weights are hand-tuned defaults carried over from the reference
/// behavior; they have not been calibrated against labeled data.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DetectionConfig {
    /// Minimum summed confidence for an event to be emitted
    #[serde(default = "default_detection_threshold")]
    pub threshold: f64,

    /// Confidence contributed per matched search keyword
    #[serde(default = "default_keyword_weight")]
    pub keyword_weight: f64,

    /// Upper bound on the total keyword contribution
    #[serde(default = "default_keyword_cap")]
    pub keyword_cap: f64,

    /// Confidence contributed per booked category match.
    /// Bookings are a stronger signal than views, so this weight is
    /// uniform across archetypes rather than archetype-specific.
    #[serde(default = "default_booking_weight")]
    pub booking_weight: f64,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_DETECTION_THRESHOLD,
            keyword_weight: DEFAULT_KEYWORD_WEIGHT,
            keyword_cap: DEFAULT_KEYWORD_CAP,
            booking_weight: DEFAULT_BOOKING_WEIGHT,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_embedding_model() -> String {
    DEFAULT_EMBEDDING_MODEL.to_string()
}

fn default_fallback_dimensions() -> usize {
    DEFAULT_FALLBACK_DIMENSIONS
}

fn default_download_timeout_secs() -> u64 {
    DEFAULT_DOWNLOAD_TIMEOUT_SECS
}

fn default_min_support() -> f64 {
    DEFAULT_MIN_SUPPORT
}

fn default_min_confidence() -> f64 {
    DEFAULT_MIN_CONFIDENCE
}

fn default_min_lift() -> f64 {
    DEFAULT_MIN_LIFT
}

fn default_time_window_days() -> i64 {
    DEFAULT_TIME_WINDOW_DAYS
}

fn default_fetch_timeout_secs() -> u64 {
    DEFAULT_FETCH_TIMEOUT_SECS
}

fn default_detection_threshold() -> f64 {
    DEFAULT_DETECTION_THRESHOLD
}

fn default_keyword_weight() -> f64 {
    DEFAULT_KEYWORD_WEIGHT
}

fn default_keyword_cap() -> f64 {
    DEFAULT_KEYWORD_CAP
}

fn default_booking_weight() -> f64 {
    DEFAULT_BOOKING_WEIGHT
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub mining: MiningConfig,
    #[serde(default)]
    pub detection: DetectionConfig,

    #[serde(skip_serializing, skip_deserializing)]
    base_path: String,
}

impl Config {
    fn validate(&mut self) {
        if self.embedding.fallback_dimensions == 0 {
            panic!("embedding.fallback_dimensions must be greater than 0");
        }

        if self.embedding.download_timeout_secs == 0 {
            panic!("embedding.download_timeout_secs must be greater than 0");
        }

        let mining = &self.mining;
        if !(0.0..=1.0).contains(&mining.min_support) {
            panic!(
                "mining.min_support must be between 0.0 and 1.0, got {}",
                mining.min_support
            );
        }
        if !(0.0..=1.0).contains(&mining.min_confidence) {
            panic!(
                "mining.min_confidence must be between 0.0 and 1.0, got {}",
                mining.min_confidence
            );
        }
        if mining.min_lift < 0.0 {
            panic!(
                "mining.min_lift must be non-negative, got {}",
                mining.min_lift
            );
        }
        if mining.time_window_days <= 0 {
            panic!(
                "mining.time_window_days must be greater than 0, got {}",
                mining.time_window_days
            );
        }

        let detection = &self.detection;
        if !(0.0..=1.0).contains(&detection.threshold) {
            panic!(
                "detection.threshold must be between 0.0 and 1.0, got {}",
                detection.threshold
            );
        }
        if detection.keyword_weight < 0.0
            || detection.keyword_cap < 0.0
            || detection.booking_weight < 0.0
        {
            panic!("detection weights must be non-negative");
        }
    }

    pub fn load_with(base_path: &str) -> Self {
        let config_path = std::path::Path::new(base_path).join("config.yaml");

        // create new if does not exist
        if !config_path.exists() {
            if let Some(parent) = config_path.parent() {
                std::fs::create_dir_all(parent).expect("could not create config directory");
            }
            std::fs::write(
                &config_path,
                serde_yml::to_string(&Self::default()).unwrap().as_bytes(),
            )
            .expect("could not write default config");
        }

        let config_str =
            std::fs::read_to_string(&config_path).expect("config file is not readable");
        let mut config: Self = serde_yml::from_str(&config_str).expect("config is malformed");

        config.base_path = base_path.to_string();

        config.validate();

        // resave in case the config gained new fields since it was written
        if config_str != serde_yml::to_string(&config).unwrap() {
            config.save();
        }

        config
    }

    pub fn save(&self) {
        let config_path = std::path::Path::new(&self.base_path).join("config.yaml");
        let config_str = serde_yml::to_string(&self).unwrap();
        std::fs::write(config_path, config_str.as_bytes()).expect("could not write config");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference_thresholds() {
        let config = Config::default();
        assert!((config.mining.min_support - 0.01).abs() < f64::EPSILON);
        assert!((config.mining.min_confidence - 0.1).abs() < f64::EPSILON);
        assert!((config.mining.min_lift - 1.0).abs() < f64::EPSILON);
        assert_eq!(config.mining.time_window_days, 90);
        assert!((config.detection.threshold - 0.3).abs() < f64::EPSILON);
        assert_eq!(config.embedding.fallback_dimensions, 384);
    }

    #[test]
    fn partial_yaml_fills_defaults() {
        let config: Config = serde_yml::from_str("mining:\n  min_support: 0.05\n").unwrap();
        assert!((config.mining.min_support - 0.05).abs() < f64::EPSILON);
        assert!((config.mining.min_confidence - 0.1).abs() < f64::EPSILON);
        assert!(config.embedding.semantic);
    }

    #[test]
    fn load_with_upgrades_stale_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("config.yaml"),
            "mining:\n  min_support: 0.05\n",
        )
        .unwrap();

        let config = Config::load_with(dir.path().to_str().unwrap());
        assert!((config.mining.min_support - 0.05).abs() < f64::EPSILON);

        let rewritten = std::fs::read_to_string(dir.path().join("config.yaml")).unwrap();
        assert!(rewritten.contains("min_support: 0.05"));
        assert!(rewritten.contains("detection:"));
    }

    #[test]
    fn load_with_creates_default_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_with(dir.path().to_str().unwrap());
        assert!(dir.path().join("config.yaml").exists());
        assert!((config.detection.threshold - 0.3).abs() < f64::EPSILON);
    }
}
