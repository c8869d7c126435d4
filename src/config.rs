//! Selection configuration.
//!
//! This module provides the options recognized by the subset selection
//! engine: the retained fraction, the coverage significance threshold, the
//! block size used for pairwise similarity, the number of runs and the
//! verbosity of progress reporting.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An environment variable has an invalid value.
    #[error("Invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    /// Configuration validation failed.
    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),

    /// IO error while reading configuration.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The configuration file could not be parsed.
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Default fraction of each partition retained in the subset.
pub const DEFAULT_SUBSET_FRACTION: f64 = 0.5;

/// Default block size for pairwise similarity and encoding batches.
pub const DEFAULT_PAIRWISE_DISTANCE_BLOCK_SIZE: usize = 1024;

/// Configuration for a subset selection run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SelectionConfig {
    /// Fraction of each latent class partition to keep, in (0, 1].
    pub subset_fraction: f64,
    /// Minimum similarity for an entry to count as coverage.
    pub threshold: f64,
    /// Block size for pairwise similarity. Affects memory use only.
    pub pairwise_distance_block_size: usize,
    /// Number of independent selection runs requested by the caller.
    pub num_runs: usize,
    /// Report per-partition progress at info level.
    pub verbose: bool,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            subset_fraction: DEFAULT_SUBSET_FRACTION,
            threshold: 0.0,
            pairwise_distance_block_size: DEFAULT_PAIRWISE_DISTANCE_BLOCK_SIZE,
            num_runs: 1,
            verbose: false,
        }
    }
}

impl SelectionConfig {
    /// Creates a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `SAS_SUBSET_FRACTION`: Retained fraction (default: 0.5)
    /// - `SAS_THRESHOLD`: Coverage significance threshold (default: 0.0)
    /// - `SAS_PAIRWISE_BLOCK_SIZE`: Pairwise similarity block size (default: 1024)
    /// - `SAS_NUM_RUNS`: Number of selection runs (default: 1)
    /// - `SAS_VERBOSE`: Progress reporting (default: false)
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable cannot be parsed or the resulting
    /// configuration is invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("SAS_SUBSET_FRACTION") {
            config.subset_fraction = parse_env_value(&val, "SAS_SUBSET_FRACTION")?;
        }

        if let Ok(val) = std::env::var("SAS_THRESHOLD") {
            config.threshold = parse_env_value(&val, "SAS_THRESHOLD")?;
        }

        if let Ok(val) = std::env::var("SAS_PAIRWISE_BLOCK_SIZE") {
            config.pairwise_distance_block_size =
                parse_env_value(&val, "SAS_PAIRWISE_BLOCK_SIZE")?;
        }

        if let Ok(val) = std::env::var("SAS_NUM_RUNS") {
            config.num_runs = parse_env_value(&val, "SAS_NUM_RUNS")?;
        }

        if let Ok(val) = std::env::var("SAS_VERBOSE") {
            config.verbose = parse_env_bool(&val, "SAS_VERBOSE")?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from a YAML file. Missing keys take their defaults.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file cannot be read or parsed, or if the
    /// resulting configuration is invalid.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_yaml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationFailed` if any values are invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.subset_fraction.is_finite()
            || self.subset_fraction <= 0.0
            || self.subset_fraction > 1.0
        {
            return Err(ConfigError::ValidationFailed(format!(
                "subset_fraction must be in (0, 1], got {}",
                self.subset_fraction
            )));
        }

        if !self.threshold.is_finite() {
            return Err(ConfigError::ValidationFailed(
                "threshold must be a finite number".to_string(),
            ));
        }

        if self.pairwise_distance_block_size == 0 {
            return Err(ConfigError::ValidationFailed(
                "pairwise_distance_block_size must be greater than 0".to_string(),
            ));
        }

        if self.num_runs == 0 {
            return Err(ConfigError::ValidationFailed(
                "num_runs must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Builder method to set the retained fraction.
    pub fn with_subset_fraction(mut self, fraction: f64) -> Self {
        self.subset_fraction = fraction;
        self
    }

    /// Builder method to set the coverage threshold.
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    /// Builder method to set the pairwise similarity block size.
    pub fn with_block_size(mut self, block_size: usize) -> Self {
        self.pairwise_distance_block_size = block_size;
        self
    }

    /// Builder method to set the number of runs.
    pub fn with_num_runs(mut self, num_runs: usize) -> Self {
        self.num_runs = num_runs;
        self
    }

    /// Builder method to enable or disable progress reporting.
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }
}

/// Parse an environment variable value into a type.
fn parse_env_value<T: std::str::FromStr>(value: &str, key: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        message: format!("could not parse '{}'", value),
    })
}

/// Parse an environment variable as a boolean.
fn parse_env_bool(value: &str, key: &str) -> Result<bool, ConfigError> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("expected boolean value, got '{}'", value),
        }),
    }
}
