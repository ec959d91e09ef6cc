//! Engine configuration, loaded from `COURSE_RECS_*` environment variables.

use std::path::PathBuf;
use std::time::Duration;

use model_client::ClientOptions;
use serde::Deserialize;

use crate::error::{EngineError, Result};

/// Environment variable prefix for every setting
pub const ENV_PREFIX: &str = "COURSE_RECS_";

/// How a query is turned into the vector that gets ranked
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryExpansion {
    /// Embed the student's text as written
    #[default]
    Raw,
    /// Generate an "ideal course" description first and embed that
    IdealCourse,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    /// Course catalog file (`.jsonl` or `.json`)
    #[serde(default = "default_catalog_path")]
    pub catalog_path: PathBuf,

    /// Address of the inference service
    #[serde(default = "default_inference_addr")]
    pub inference_addr: String,

    /// Expected embedding dimension; checked against the catalog at startup
    #[serde(default)]
    pub embedding_dimension: Option<usize>,

    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Requests allowed per identity per window
    #[serde(default = "default_rate_limit_requests")]
    pub rate_limit_requests: u32,

    #[serde(default = "default_rate_limit_window_secs")]
    pub rate_limit_window_secs: u64,

    /// Identities idle this long are dropped from the rate limiter
    #[serde(default = "default_rate_limit_idle_evict_secs")]
    pub rate_limit_idle_evict_secs: u64,

    /// Longer queries are rejected, not truncated
    #[serde(default = "default_max_query_chars")]
    pub max_query_chars: usize,

    #[serde(default = "default_embed_timeout_ms")]
    pub embed_timeout_ms: u64,

    /// Bound on waiting for a generation stream to start
    #[serde(default = "default_generate_timeout_ms")]
    pub generate_timeout_ms: u64,

    /// Whole-request deadline, including streaming the explanation
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,

    /// Matches scoring below this are dropped before top-K
    #[serde(default)]
    pub min_similarity: Option<f32>,

    #[serde(default)]
    pub query_expansion: QueryExpansion,

    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,

    /// Model used for query expansion
    #[serde(default = "default_generator_model")]
    pub generator_model: String,

    /// Model used for the streamed explanation
    #[serde(default = "default_recommender_model")]
    pub recommender_model: String,

    #[serde(default)]
    pub generation_max_tokens: Option<u32>,
}

fn default_catalog_path() -> PathBuf {
    PathBuf::from("data/courses.jsonl")
}

fn default_inference_addr() -> String {
    "http://localhost:50051".to_string()
}

fn default_top_k() -> usize {
    10
}

fn default_rate_limit_requests() -> u32 {
    10
}

fn default_rate_limit_window_secs() -> u64 {
    60
}

fn default_rate_limit_idle_evict_secs() -> u64 {
    600
}

fn default_max_query_chars() -> usize {
    1000
}

fn default_embed_timeout_ms() -> u64 {
    10_000
}

fn default_generate_timeout_ms() -> u64 {
    60_000
}

fn default_embedding_model() -> String {
    "text-embedding-ada-002".to_string()
}

fn default_generator_model() -> String {
    "gpt-35-turbo".to_string()
}

fn default_recommender_model() -> String {
    "gpt-4o".to_string()
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            catalog_path: default_catalog_path(),
            inference_addr: default_inference_addr(),
            embedding_dimension: None,
            top_k: default_top_k(),
            rate_limit_requests: default_rate_limit_requests(),
            rate_limit_window_secs: default_rate_limit_window_secs(),
            rate_limit_idle_evict_secs: default_rate_limit_idle_evict_secs(),
            max_query_chars: default_max_query_chars(),
            embed_timeout_ms: default_embed_timeout_ms(),
            generate_timeout_ms: default_generate_timeout_ms(),
            request_timeout_secs: None,
            min_similarity: None,
            query_expansion: QueryExpansion::default(),
            embedding_model: default_embedding_model(),
            generator_model: default_generator_model(),
            recommender_model: default_recommender_model(),
            generation_max_tokens: None,
        }
    }
}

impl EngineConfig {
    /// Load configuration from the environment, reading `.env` if present
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_vars(std::env::vars())
    }

    /// Load configuration from explicit key/value pairs
    pub fn from_vars<I>(vars: I) -> anyhow::Result<Self>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let config = envy::prefixed(ENV_PREFIX)
            .from_iter::<_, EngineConfig>(vars)
            .map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.top_k == 0 {
            return Err(EngineError::Configuration("top_k must be positive".into()));
        }
        if self.rate_limit_requests == 0 {
            return Err(EngineError::Configuration(
                "rate_limit_requests must be positive".into(),
            ));
        }
        if self.rate_limit_window_secs == 0 {
            return Err(EngineError::Configuration(
                "rate_limit_window_secs must be positive".into(),
            ));
        }
        if self.max_query_chars == 0 {
            return Err(EngineError::Configuration(
                "max_query_chars must be positive".into(),
            ));
        }
        if self.embedding_dimension == Some(0) {
            return Err(EngineError::Configuration(
                "embedding_dimension must be positive".into(),
            ));
        }
        if let Some(floor) = self.min_similarity {
            if !(-1.0..=1.0).contains(&floor) {
                return Err(EngineError::Configuration(format!(
                    "min_similarity must be within [-1, 1], got {}",
                    floor
                )));
            }
        }
        Ok(())
    }

    pub fn rate_limit_window(&self) -> Duration {
        Duration::from_secs(self.rate_limit_window_secs)
    }

    pub fn rate_limit_idle_evict(&self) -> Duration {
        Duration::from_secs(self.rate_limit_idle_evict_secs)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }

    pub fn client_options(&self) -> ClientOptions {
        ClientOptions {
            embed_timeout: Duration::from_millis(self.embed_timeout_ms),
            generate_timeout: Duration::from_millis(self.generate_timeout_ms),
            embedding_model: self.embedding_model.clone(),
            ..ClientOptions::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults() {
        let config = EngineConfig::from_vars(Vec::new()).unwrap();

        assert_eq!(config.top_k, 10);
        assert_eq!(config.rate_limit_requests, 10);
        assert_eq!(config.rate_limit_window(), Duration::from_secs(60));
        assert_eq!(config.max_query_chars, 1000);
        assert_eq!(config.query_expansion, QueryExpansion::Raw);
        assert_eq!(config.request_timeout(), None);
        assert_eq!(config.min_similarity, None);
    }

    #[test]
    fn test_prefixed_overrides() {
        let config = EngineConfig::from_vars(vars(&[
            ("COURSE_RECS_TOP_K", "5"),
            ("COURSE_RECS_RATE_LIMIT_REQUESTS", "3"),
            ("COURSE_RECS_EMBEDDING_DIMENSION", "1536"),
            ("COURSE_RECS_REQUEST_TIMEOUT_SECS", "30"),
            ("COURSE_RECS_QUERY_EXPANSION", "ideal_course"),
            ("COURSE_RECS_MIN_SIMILARITY", "0.5"),
            ("UNRELATED_TOP_K", "99"),
        ]))
        .unwrap();

        assert_eq!(config.top_k, 5);
        assert_eq!(config.rate_limit_requests, 3);
        assert_eq!(config.embedding_dimension, Some(1536));
        assert_eq!(config.request_timeout(), Some(Duration::from_secs(30)));
        assert_eq!(config.query_expansion, QueryExpansion::IdealCourse);
        assert_eq!(config.min_similarity, Some(0.5));
    }

    #[test]
    fn test_validation_rejects_zero_limits() {
        assert!(EngineConfig::from_vars(vars(&[("COURSE_RECS_TOP_K", "0")])).is_err());

        let config = EngineConfig {
            rate_limit_window_secs: 0,
            ..EngineConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(EngineError::Configuration(_))
        ));

        let config = EngineConfig {
            min_similarity: Some(1.5),
            ..EngineConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_client_options_follow_config() {
        let config = EngineConfig {
            embed_timeout_ms: 250,
            embedding_model: "small-embedder".to_string(),
            ..EngineConfig::default()
        };
        let options = config.client_options();

        assert_eq!(options.embed_timeout, Duration::from_millis(250));
        assert_eq!(options.embedding_model, "small-embedder");
    }
}
