// crates/quality-gate-config/src/config.rs
// ============================================================================
// Module: Engine Configuration
// Description: TOML configuration schema, defaults, and boundary validation.
// Purpose: Produce validated limit structs for engine and store construction.
// Dependencies: quality-gate-core, quality-gate-runner, quality-gate-store-sqlite, serde, toml
// ============================================================================

//! ## Overview
//! One configuration document covers the engine limits, the enabled detector
//! list (ordered; absent means no detectors, never a hidden default), the
//! store section, and the runner section. Unknown keys anywhere in the
//! document are load errors.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;

use quality_gate_core::ScorerId;
use quality_gate_core::engine::EngineLimits;
use quality_gate_runner::PooledRunnerConfig;
use quality_gate_store_sqlite::SqliteStoreConfig;
use serde::Deserialize;
use thiserror::Error;

// ============================================================================
// SECTION: Defaults
// ============================================================================

/// Default minimum review duration in seconds.
const fn default_min_review_duration_seconds() -> u64 {
    300
}

/// Default fast-approval threshold in seconds.
const fn default_fast_approval_threshold_seconds() -> u64 {
    30
}

/// Default per-blog rewrite cycle cap.
const fn default_max_rewrite_cycles() -> u32 {
    10
}

/// Default per-blog review cycle cap.
const fn default_max_review_cycles_per_blog() -> u64 {
    5
}

/// Default rewriter deadline in seconds.
const fn default_rewriter_timeout_seconds() -> u64 {
    120
}

/// Default runner worker count.
const fn default_runner_workers() -> usize {
    4
}

/// Default runner queue capacity.
const fn default_runner_queue_capacity() -> usize {
    256
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Configuration file could not be read.
    #[error("config io error: {0}")]
    Io(String),
    /// Document failed to parse (including unknown keys).
    #[error("config parse error: {0}")]
    Parse(String),
    /// A value violates its boundary contract.
    #[error("config invalid: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Sections
// ============================================================================

/// Workflow runner section.
///
/// # Invariants
/// - `workers` and `queue_capacity` are greater than zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunnerSection {
    /// Worker thread count.
    #[serde(default = "default_runner_workers")]
    pub workers: usize,
    /// Bounded queue capacity.
    #[serde(default = "default_runner_queue_capacity")]
    pub queue_capacity: usize,
}

impl Default for RunnerSection {
    fn default() -> Self {
        Self {
            workers: default_runner_workers(),
            queue_capacity: default_runner_queue_capacity(),
        }
    }
}

impl From<RunnerSection> for PooledRunnerConfig {
    fn from(section: RunnerSection) -> Self {
        Self {
            workers: section.workers,
            queue_capacity: section.queue_capacity,
        }
    }
}

// ============================================================================
// SECTION: Engine Config
// ============================================================================

/// Full engine configuration document.
///
/// # Invariants
/// - Unknown keys anywhere in the document fail the load.
/// - `enabled_detectors` order is the scorer execution order.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EngineConfig {
    /// Minimum review duration in seconds.
    #[serde(default = "default_min_review_duration_seconds")]
    pub min_review_duration_seconds: u64,
    /// Fast-approval threshold in seconds.
    #[serde(default = "default_fast_approval_threshold_seconds")]
    pub fast_approval_threshold_seconds: u64,
    /// Per-blog rewrite cycle cap.
    #[serde(default = "default_max_rewrite_cycles")]
    pub max_rewrite_cycles: u32,
    /// Per-blog review cycle cap.
    #[serde(default = "default_max_review_cycles_per_blog")]
    pub max_review_cycles_per_blog: u64,
    /// Rewriter deadline in seconds.
    #[serde(default = "default_rewriter_timeout_seconds")]
    pub rewriter_timeout_seconds: u64,
    /// Enabled detectors by id, in execution order. Absent means none.
    #[serde(default)]
    pub enabled_detectors: Option<Vec<String>>,
    /// Durable store section; absent for in-memory deployments.
    #[serde(default)]
    pub store: Option<SqliteStoreConfig>,
    /// Workflow runner section.
    #[serde(default)]
    pub runner: RunnerSection,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            min_review_duration_seconds: default_min_review_duration_seconds(),
            fast_approval_threshold_seconds: default_fast_approval_threshold_seconds(),
            max_rewrite_cycles: default_max_rewrite_cycles(),
            max_review_cycles_per_blog: default_max_review_cycles_per_blog(),
            rewriter_timeout_seconds: default_rewriter_timeout_seconds(),
            enabled_detectors: None,
            store: None,
            runner: RunnerSection::default(),
        }
    }
}

impl EngineConfig {
    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed documents or unknown
    /// keys and [`ConfigError::Invalid`] for out-of-range values.
    pub fn from_toml_str(document: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(document).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Loads and validates a configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] when the file cannot be read, plus the
    /// parse/validation errors of [`Self::from_toml_str`].
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let document =
            std::fs::read_to_string(path).map_err(|err| ConfigError::Io(err.to_string()))?;
        Self::from_toml_str(&document)
    }

    /// Validates every boundary contract.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the violated key.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_review_duration_seconds == 0 {
            return Err(ConfigError::Invalid(
                "min_review_duration_seconds must be greater than zero".to_string(),
            ));
        }
        if self.fast_approval_threshold_seconds == 0 {
            return Err(ConfigError::Invalid(
                "fast_approval_threshold_seconds must be greater than zero".to_string(),
            ));
        }
        if self.max_rewrite_cycles == 0 {
            return Err(ConfigError::Invalid(
                "max_rewrite_cycles must be greater than zero".to_string(),
            ));
        }
        if self.max_review_cycles_per_blog == 0 {
            return Err(ConfigError::Invalid(
                "max_review_cycles_per_blog must be greater than zero".to_string(),
            ));
        }
        if self.rewriter_timeout_seconds == 0 {
            return Err(ConfigError::Invalid(
                "rewriter_timeout_seconds must be greater than zero".to_string(),
            ));
        }
        if self.runner.workers == 0 {
            return Err(ConfigError::Invalid(
                "runner.workers must be greater than zero".to_string(),
            ));
        }
        if self.runner.queue_capacity == 0 {
            return Err(ConfigError::Invalid(
                "runner.queue_capacity must be greater than zero".to_string(),
            ));
        }
        if let Some(detectors) = &self.enabled_detectors {
            for (index, id) in detectors.iter().enumerate() {
                if id.trim().is_empty() {
                    return Err(ConfigError::Invalid(format!(
                        "enabled_detectors[{index}] must not be empty"
                    )));
                }
                if detectors[..index].contains(id) {
                    return Err(ConfigError::Invalid(format!(
                        "enabled_detectors contains a duplicate: {id}"
                    )));
                }
            }
        }
        if let Some(store) = &self.store
            && store.busy_timeout_ms == 0
        {
            return Err(ConfigError::Invalid(
                "store.busy_timeout_ms must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Returns the engine limits derived from this configuration.
    #[must_use]
    pub const fn limits(&self) -> EngineLimits {
        EngineLimits {
            min_review_duration_seconds: self.min_review_duration_seconds,
            fast_approval_threshold_seconds: self.fast_approval_threshold_seconds,
            max_rewrite_cycles: self.max_rewrite_cycles,
            max_review_cycles_per_blog: self.max_review_cycles_per_blog,
            rewriter_timeout_seconds: self.rewriter_timeout_seconds,
        }
    }

    /// Returns the enabled detector ids as typed identifiers, in order.
    #[must_use]
    pub fn detector_ids(&self) -> Option<Vec<ScorerId>> {
        self.enabled_detectors
            .as_ref()
            .map(|ids| ids.iter().map(|id| ScorerId::new(id.as_str())).collect())
    }

    /// Returns the runner configuration.
    #[must_use]
    pub fn runner_config(&self) -> PooledRunnerConfig {
        self.runner.into()
    }
}
