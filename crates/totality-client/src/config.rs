//! Client configuration.
//!
//! Settings can come from code, from environment variables or from a YAML
//! file. Every source goes through [`ClientConfig::validate`].

use std::env;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use observation_common::{ObservationError, ObservationResult};
use observation_protocol::CollectionType;

/// Default service root; collections live under `/observations/{type}`.
pub const DEFAULT_BASE_URL: &str = "https://totality.str8d8a.info/dev";

/// Number of pending records that triggers an automatic flush.
pub const DEFAULT_BATCH_SIZE: usize = 20;

/// When adding a record may trigger a flush.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AutoFlush {
    /// Only while the batch is inside a scope.
    #[default]
    ScopedOnly,
    /// On every add, scoped or not.
    Always,
}

impl FromStr for AutoFlush {
    type Err = ObservationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "scoped" | "scoped_only" => Ok(AutoFlush::ScopedOnly),
            "always" => Ok(AutoFlush::Always),
            other => Err(ObservationError::Config(format!(
                "auto flush mode must be 'scoped' or 'always', got '{}'",
                other
            ))),
        }
    }
}

/// What happens to pending records when a flush is not accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Drop them. Delivery is at-most-once.
    #[default]
    Discard,
    /// Keep them pending for the next flush.
    ///
    /// The backlog is unbounded while the service keeps rejecting. After a
    /// rejection, automatic flushing waits for another full threshold of
    /// new records before retrying.
    Requeue,
}

impl FromStr for FailurePolicy {
    type Err = ObservationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "discard" => Ok(FailurePolicy::Discard),
            "requeue" => Ok(FailurePolicy::Requeue),
            other => Err(ObservationError::Config(format!(
                "failure policy must be 'discard' or 'requeue', got '{}'",
                other
            ))),
        }
    }
}

/// Batch flush behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlushPolicy {
    /// Pending count at which an automatic flush fires
    #[serde(default = "default_threshold")]
    pub threshold: usize,
    #[serde(default)]
    pub auto_flush: AutoFlush,
    #[serde(default)]
    pub on_failure: FailurePolicy,
}

fn default_threshold() -> usize {
    DEFAULT_BATCH_SIZE
}

impl Default for FlushPolicy {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_BATCH_SIZE,
            auto_flush: AutoFlush::default(),
            on_failure: FailurePolicy::default(),
        }
    }
}

impl FlushPolicy {
    pub fn with_threshold(mut self, threshold: usize) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_auto_flush(mut self, auto_flush: AutoFlush) -> Self {
        self.auto_flush = auto_flush;
        self
    }

    pub fn with_on_failure(mut self, on_failure: FailurePolicy) -> Self {
        self.on_failure = on_failure;
        self
    }
}

/// Configuration for a [`Totality`](crate::Totality) client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Sent as the `x-api-key` header when set
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// HTTP request timeout (seconds)
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    #[serde(default)]
    pub flush: FlushPolicy,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_request_timeout() -> u64 {
    60
}

fn default_connect_timeout() -> u64 {
    10
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_base_url(),
            request_timeout_secs: default_request_timeout(),
            connect_timeout_secs: default_connect_timeout(),
            flush: FlushPolicy::default(),
        }
    }
}

impl ClientConfig {
    /// Default configuration with an API key.
    pub fn with_api_key(api_key: impl Into<String>) -> Self {
        Self {
            api_key: Some(api_key.into()),
            ..Default::default()
        }
    }

    /// Load configuration from `TOTALITY_*` environment variables.
    ///
    /// Unset variables fall back to defaults.
    pub fn from_env() -> ObservationResult<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> ObservationResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self {
            api_key: lookup("TOTALITY_API_KEY").filter(|k| !k.is_empty()),
            ..Default::default()
        };

        if let Some(url) = lookup("TOTALITY_BASE_URL") {
            config.base_url = url;
        }
        if let Some(size) = lookup("TOTALITY_BATCH_SIZE") {
            config.flush.threshold = parse_number("TOTALITY_BATCH_SIZE", &size)?;
        }
        if let Some(secs) = lookup("TOTALITY_TIMEOUT_SECS") {
            config.request_timeout_secs = parse_number("TOTALITY_TIMEOUT_SECS", &secs)?;
        }
        if let Some(mode) = lookup("TOTALITY_AUTO_FLUSH") {
            config.flush.auto_flush = mode.parse()?;
        }
        if let Some(policy) = lookup("TOTALITY_ON_FAILURE") {
            config.flush.on_failure = policy.parse()?;
        }

        config.validate()?;
        debug!(base_url = %config.base_url, threshold = config.flush.threshold, "Loaded client config from environment");
        Ok(config)
    }

    /// Load configuration from a YAML file.
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> ObservationResult<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            ObservationError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let config = Self::from_yaml_str(&contents)?;
        debug!(path = %path.display(), "Loaded client config");
        Ok(config)
    }

    /// Parse configuration from YAML text.
    pub fn from_yaml_str(contents: &str) -> ObservationResult<Self> {
        let config: Self = serde_yaml::from_str(contents)
            .map_err(|e| ObservationError::Config(format!("Invalid client config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Check that the settings are usable.
    pub fn validate(&self) -> ObservationResult<()> {
        if self.flush.threshold == 0 {
            return Err(ObservationError::Config(
                "flush threshold must be at least 1".to_string(),
            ));
        }
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(ObservationError::Config(format!(
                "base_url must be an http(s) URL, got '{}'",
                self.base_url
            )));
        }
        if self.request_timeout_secs == 0 {
            return Err(ObservationError::Config(
                "request timeout must be at least 1 second".to_string(),
            ));
        }
        Ok(())
    }

    /// Endpoint that accepts documents of the given collection type.
    pub fn endpoint(&self, collection_type: CollectionType) -> String {
        format!(
            "{}/observations/{}",
            self.base_url.trim_end_matches('/'),
            collection_type
        )
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

fn parse_number<T: FromStr>(key: &str, value: &str) -> ObservationResult<T> {
    value
        .trim()
        .parse()
        .map_err(|_| ObservationError::Config(format!("{} must be a number, got '{}'", key, value)))
}
