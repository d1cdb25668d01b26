//! Configuration for extraction, merge, analytics and caching
//!
//! Loads configuration from config.yml file

use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::error::{Error, Result};
use crate::model::{MAX_NODE_SIZE, MIN_NODE_SIZE};

/// Default constants (fallback if config.yml not found)
pub const CONFIG_FILE: &str = "config.yml";
pub const DEFAULT_INCLUSION_THRESHOLD: f64 = 0.45;
pub const DEFAULT_PROXIMITY_DECAY: f64 = 0.1;
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;
pub const DEFAULT_CONCURRENCY: usize = 4;
pub const DEFAULT_MAX_DEPTH: usize = 5;
pub const DEFAULT_CACHE_CAPACITY: usize = 10;

/// Tunables for the entity normalizer. Extra word lists extend the built-in ones.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizerConfig {
    pub min_length: usize,
    pub max_length: usize,
    pub extra_stopwords: Vec<String>,
    pub extra_academic_terms: Vec<String>,
    pub extra_domain_terms: Vec<String>,
    pub extra_domain_stems: Vec<String>,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            min_length: 3,
            max_length: 25,
            extra_stopwords: Vec::new(),
            extra_academic_terms: Vec::new(),
            extra_domain_terms: Vec::new(),
            extra_domain_stems: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassifierConfig {
    /// Edges below this confidence are dropped by extractors
    pub inclusion_threshold: f64,
    /// Per-token decay of the proximity score
    pub proximity_decay: f64,
    pub evidence_max_chars: usize,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            inclusion_threshold: DEFAULT_INCLUSION_THRESHOLD,
            proximity_decay: DEFAULT_PROXIMITY_DECAY,
            evidence_max_chars: 300,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionConfig {
    pub concurrency: usize,
    pub timeout_ms: u64,
    pub chunk_words: usize,
    pub chunk_overlap_sentences: usize,
    pub max_entity_words: usize,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            chunk_words: 200,
            chunk_overlap_sentences: 1,
            max_entity_words: 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MergeConfig {
    pub min_node_size: f64,
    pub max_node_size: f64,
    /// Substitute the sample graph when a merge yields no nodes
    pub fallback_on_empty: bool,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            min_node_size: MIN_NODE_SIZE,
            max_node_size: MAX_NODE_SIZE,
            fallback_on_empty: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnalyticsConfig {
    pub max_depth: usize,
    pub top_n: usize,
    pub max_paths: usize,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            top_n: 10,
            max_paths: 100,
        }
    }
}

/// YAML config structures
#[derive(Debug, Default, Deserialize)]
struct YamlConfig {
    normalizer: Option<YamlNormalizer>,
    classifier: Option<YamlClassifier>,
    extraction: Option<YamlExtraction>,
    merge: Option<YamlMerge>,
    analytics: Option<YamlAnalytics>,
    cache: Option<YamlCache>,
}

#[derive(Debug, Default, Deserialize)]
struct YamlNormalizer {
    min_length: Option<usize>,
    max_length: Option<usize>,
    #[serde(default)]
    extra_stopwords: Vec<String>,
    #[serde(default)]
    extra_academic_terms: Vec<String>,
    #[serde(default)]
    extra_domain_terms: Vec<String>,
    #[serde(default)]
    extra_domain_stems: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
struct YamlClassifier {
    inclusion_threshold: Option<f64>,
    proximity_decay: Option<f64>,
    evidence_max_chars: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct YamlExtraction {
    #[serde(default, deserialize_with = "deserialize_string_or_number")]
    concurrency: Option<String>,
    #[serde(default, deserialize_with = "deserialize_string_or_number")]
    timeout_ms: Option<String>,
    chunk_words: Option<usize>,
    chunk_overlap_sentences: Option<usize>,
    max_entity_words: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct YamlMerge {
    min_node_size: Option<f64>,
    max_node_size: Option<f64>,
    fallback_on_empty: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
struct YamlAnalytics {
    max_depth: Option<usize>,
    top_n: Option<usize>,
    max_paths: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct YamlCache {
    #[serde(default, deserialize_with = "deserialize_string_or_number")]
    capacity: Option<String>,
}

/// Deserialize a value that can be either a string (e.g. `${VAR}`) or a number
fn deserialize_string_or_number<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::Error;
    let value: Option<serde_yaml::Value> = Option::deserialize(deserializer)?;
    match value {
        None => Ok(None),
        Some(serde_yaml::Value::String(s)) => Ok(Some(s)),
        Some(serde_yaml::Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(D::Error::custom(format!(
            "expected string or number, got {:?}",
            other
        ))),
    }
}

/// Main configuration struct
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub normalizer: NormalizerConfig,
    pub classifier: ClassifierConfig,
    pub extraction: ExtractionConfig,
    pub merge: MergeConfig,
    pub analytics: AnalyticsConfig,
    pub cache_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self::defaults()
    }
}

impl Config {
    /// Load configuration from config.yml or use defaults.
    /// Environment variables take precedence over config.yml values.
    pub fn new() -> Self {
        Self::load_from_file(CONFIG_FILE)
            .or_else(|_| Self::load_from_file(format!("../{}", CONFIG_FILE)))
            .unwrap_or_else(|_| Self::defaults())
    }

    /// Resolve a numeric value: `${VAR}` placeholders and `env_key` win over literals.
    fn resolve_env_number<T: std::str::FromStr>(value: Option<String>, env_key: &str) -> Option<T> {
        if let Ok(env_val) = std::env::var(env_key) {
            if let Ok(parsed) = env_val.parse::<T>() {
                return Some(parsed);
            }
        }
        let v = value?;
        if v.starts_with("${") && v.ends_with('}') {
            let var_name = &v[2..v.len() - 1];
            return std::env::var(var_name).ok()?.parse::<T>().ok();
        }
        v.parse::<T>().ok()
    }

    /// Load .env file into environment variables using dotenvy
    fn load_dotenv() {
        if dotenvy::dotenv().is_err() {
            let _ = dotenvy::from_filename("../.env");
        }
    }

    /// Load configuration from a specific file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::load_dotenv();

        let content = fs::read_to_string(path.as_ref())
            .map_err(|e| Error::ConfigError(format!("Failed to read config file: {}", e)))?;
        Self::from_yaml_str(&content)
    }

    /// Parse configuration from YAML text
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let yaml: YamlConfig = if content.trim().is_empty() {
            YamlConfig::default()
        } else {
            serde_yaml::from_str(content)?
        };
        let defaults = Self::defaults();

        let normalizer = yaml.normalizer.unwrap_or_default();
        let classifier = yaml.classifier.unwrap_or_default();
        let extraction = yaml.extraction.unwrap_or_default();
        let merge = yaml.merge.unwrap_or_default();
        let analytics = yaml.analytics.unwrap_or_default();
        let cache = yaml.cache.unwrap_or_default();

        let config = Self {
            normalizer: NormalizerConfig {
                min_length: normalizer.min_length.unwrap_or(defaults.normalizer.min_length),
                max_length: normalizer.max_length.unwrap_or(defaults.normalizer.max_length),
                extra_stopwords: normalizer.extra_stopwords,
                extra_academic_terms: normalizer.extra_academic_terms,
                extra_domain_terms: normalizer.extra_domain_terms,
                extra_domain_stems: normalizer.extra_domain_stems,
            },
            classifier: ClassifierConfig {
                inclusion_threshold: classifier
                    .inclusion_threshold
                    .unwrap_or(defaults.classifier.inclusion_threshold),
                proximity_decay: classifier
                    .proximity_decay
                    .unwrap_or(defaults.classifier.proximity_decay),
                evidence_max_chars: classifier
                    .evidence_max_chars
                    .unwrap_or(defaults.classifier.evidence_max_chars),
            },
            extraction: ExtractionConfig {
                concurrency: Self::resolve_env_number(
                    extraction.concurrency,
                    "CONCEPT_GRAPH_CONCURRENCY",
                )
                .unwrap_or(defaults.extraction.concurrency),
                timeout_ms: Self::resolve_env_number(
                    extraction.timeout_ms,
                    "CONCEPT_GRAPH_TIMEOUT_MS",
                )
                .unwrap_or(defaults.extraction.timeout_ms),
                chunk_words: extraction
                    .chunk_words
                    .unwrap_or(defaults.extraction.chunk_words),
                chunk_overlap_sentences: extraction
                    .chunk_overlap_sentences
                    .unwrap_or(defaults.extraction.chunk_overlap_sentences),
                max_entity_words: extraction
                    .max_entity_words
                    .unwrap_or(defaults.extraction.max_entity_words),
            },
            merge: MergeConfig {
                min_node_size: merge.min_node_size.unwrap_or(defaults.merge.min_node_size),
                max_node_size: merge.max_node_size.unwrap_or(defaults.merge.max_node_size),
                fallback_on_empty: merge
                    .fallback_on_empty
                    .unwrap_or(defaults.merge.fallback_on_empty),
            },
            analytics: AnalyticsConfig {
                max_depth: analytics.max_depth.unwrap_or(defaults.analytics.max_depth),
                top_n: analytics.top_n.unwrap_or(defaults.analytics.top_n),
                max_paths: analytics.max_paths.unwrap_or(defaults.analytics.max_paths),
            },
            cache_capacity: Self::resolve_env_number(cache.capacity, "CONCEPT_GRAPH_CACHE_CAPACITY")
                .unwrap_or(defaults.cache_capacity),
        };

        config.validate()?;
        Ok(config)
    }

    /// Built-in defaults, used when no config.yml is present
    pub fn defaults() -> Self {
        Self {
            normalizer: NormalizerConfig::default(),
            classifier: ClassifierConfig::default(),
            extraction: ExtractionConfig::default(),
            merge: MergeConfig::default(),
            analytics: AnalyticsConfig::default(),
            cache_capacity: DEFAULT_CACHE_CAPACITY,
        }
    }

    fn validate(&self) -> Result<()> {
        if self.normalizer.min_length > self.normalizer.max_length {
            return Err(Error::ConfigError(format!(
                "normalizer.min_length ({}) exceeds max_length ({})",
                self.normalizer.min_length, self.normalizer.max_length
            )));
        }
        if self.merge.min_node_size > self.merge.max_node_size {
            return Err(Error::ConfigError(format!(
                "merge.min_node_size ({}) exceeds max_node_size ({})",
                self.merge.min_node_size, self.merge.max_node_size
            )));
        }
        if !(0.0..=1.0).contains(&self.classifier.inclusion_threshold) {
            return Err(Error::ConfigError(format!(
                "classifier.inclusion_threshold must be within [0, 1], got {}",
                self.classifier.inclusion_threshold
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{LazyLock, Mutex};

    static ENV_LOCK: LazyLock<Mutex<()>> = LazyLock::new(|| Mutex::new(()));

    struct EnvGuard {
        key: String,
        original: Option<String>,
    }

    impl EnvGuard {
        fn set(key: &str, value: &str) -> Self {
            let original = std::env::var(key).ok();
            std::env::set_var(key, value);
            Self {
                key: key.to_string(),
                original,
            }
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            match &self.original {
                Some(value) => std::env::set_var(&self.key, value),
                None => std::env::remove_var(&self.key),
            }
        }
    }

    #[test]
    fn test_defaults() {
        let config = Config::defaults();
        assert_eq!(config.cache_capacity, 10);
        assert_eq!(config.analytics.max_depth, 5);
        assert_eq!(config.classifier.inclusion_threshold, 0.45);
        assert_eq!(config.normalizer.min_length, 3);
        assert_eq!(config.normalizer.max_length, 25);
        assert!(!config.merge.fallback_on_empty);
    }

    #[test]
    fn test_empty_yaml_yields_defaults() {
        let _lock = ENV_LOCK.lock().unwrap();
        assert_eq!(Config::from_yaml_str("").unwrap(), Config::defaults());
    }

    #[test]
    fn test_load_from_yaml() {
        let _lock = ENV_LOCK.lock().unwrap();
        let yaml = r#"
normalizer:
  max_length: 30
  extra_stopwords: ["sample"]
  extra_domain_terms: ["stomatal conductance"]

classifier:
  inclusion_threshold: 0.5

extraction:
  concurrency: 8
  chunk_words: 120

analytics:
  top_n: 3

cache:
  capacity: 4
"#;
        let temp_file = std::env::temp_dir().join("concept_graph_test_config.yml");
        std::fs::write(&temp_file, yaml).unwrap();

        let config = Config::load_from_file(&temp_file).unwrap();

        assert_eq!(config.normalizer.max_length, 30);
        assert_eq!(config.normalizer.extra_stopwords, vec!["sample".to_string()]);
        assert_eq!(config.classifier.inclusion_threshold, 0.5);
        assert_eq!(config.extraction.chunk_words, 120);
        assert_eq!(config.analytics.top_n, 3);
        assert_eq!(config.analytics.max_depth, 5);

        std::fs::remove_file(temp_file).ok();
    }

    #[test]
    fn env_placeholders_are_resolved_from_environment() {
        let _lock = ENV_LOCK.lock().unwrap();
        let _guard = EnvGuard::set("CONCEPT_GRAPH_TEST_TIMEOUT", "2500");

        let config = Config::from_yaml_str(
            r#"
extraction:
  timeout_ms: "${CONCEPT_GRAPH_TEST_TIMEOUT}"
"#,
        )
        .unwrap();

        assert_eq!(config.extraction.timeout_ms, 2500);
    }

    #[test]
    fn explicit_env_override_wins_over_yaml() {
        let _lock = ENV_LOCK.lock().unwrap();
        let _guard = EnvGuard::set("CONCEPT_GRAPH_CACHE_CAPACITY", "3");

        let config = Config::from_yaml_str("cache:\n  capacity: 20\n").unwrap();
        assert_eq!(config.cache_capacity, 3);
    }

    #[test]
    fn rejects_inverted_bounds() {
        let _lock = ENV_LOCK.lock().unwrap();
        let result = Config::from_yaml_str("normalizer:\n  min_length: 30\n  max_length: 5\n");
        assert!(matches!(result, Err(Error::ConfigError(_))));

        let result = Config::from_yaml_str("merge:\n  min_node_size: 60\n");
        assert!(result.is_err());
    }

    #[test]
    fn missing_file_is_a_config_error() {
        let result = Config::load_from_file("/definitely/not/here/config.yml");
        assert!(matches!(result, Err(Error::ConfigError(_))));
    }
}
