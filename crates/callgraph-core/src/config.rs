//! Engine configuration.
//!
//! Defaults match the sequential behaviour of the engine; the fan-out
//! resolver and other switches are opt-in through [`EngineConfig`] setters
//! or environment variables via [`EngineConfig::from_env`].

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::ConfigError;

/// How dependency values are fetched from the result store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolverMode {
    /// One lookup after another on the calling task.
    #[default]
    Sequential,
    /// One spawned task per dependency, joined before returning.
    FanOut,
}

impl FromStr for ResolverMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sequential" => Ok(ResolverMode::Sequential),
            "fanout" | "fan_out" | "fan-out" | "parallel" => Ok(ResolverMode::FanOut),
            other => Err(ConfigError::InvalidValue {
                key: "resolver mode",
                value: other.to_string(),
                reason: "expected `sequential` or `fanout`".to_string(),
            }),
        }
    }
}

impl std::fmt::Display for ResolverMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResolverMode::Sequential => write!(f, "sequential"),
            ResolverMode::FanOut => write!(f, "fanout"),
        }
    }
}

/// Configuration for dependency value resolution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolverConfig {
    pub mode: ResolverMode,
    /// Upper bound on in-flight lookups in fan-out mode
    pub max_concurrent: usize,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            mode: ResolverMode::Sequential,
            max_concurrent: 8,
        }
    }
}

/// Top-level engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    pub resolver: ResolverConfig,
    /// Fail a build whose schedule does not cover every registered call.
    pub verify_acyclic: bool,
    /// Keep parsed stub expressions in the process-local cache.
    pub memoize_parsed: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            resolver: ResolverConfig::default(),
            verify_acyclic: true,
            memoize_parsed: true,
        }
    }
}

pub const ENV_RESOLVER: &str = "CALLGRAPH_RESOLVER";
pub const ENV_MAX_CONCURRENT: &str = "CALLGRAPH_MAX_CONCURRENT";
pub const ENV_VERIFY_ACYCLIC: &str = "CALLGRAPH_VERIFY_ACYCLIC";
pub const ENV_MEMOIZE_PARSED: &str = "CALLGRAPH_MEMOIZE_PARSED";

impl EngineConfig {
    pub fn with_resolver_mode(mut self, mode: ResolverMode) -> Self {
        self.resolver.mode = mode;
        self
    }

    pub fn with_max_concurrent(mut self, max_concurrent: usize) -> Self {
        self.resolver.max_concurrent = max_concurrent;
        self
    }

    pub fn with_verify_acyclic(mut self, verify: bool) -> Self {
        self.verify_acyclic = verify;
        self
    }

    pub fn with_memoize_parsed(mut self, memoize: bool) -> Self {
        self.memoize_parsed = memoize;
        self
    }

    /// Create from environment variables
    ///
    /// Reads:
    /// - CALLGRAPH_RESOLVER (optional, default: "sequential") - or "fanout"
    /// - CALLGRAPH_MAX_CONCURRENT (optional, default: 8)
    /// - CALLGRAPH_VERIFY_ACYCLIC (optional, default: "true")
    /// - CALLGRAPH_MEMOIZE_PARSED (optional, default: "true")
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`EngineConfig::from_env`] over an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(value) = lookup(ENV_RESOLVER) {
            config.resolver.mode = value.parse()?;
        }
        if let Some(value) = lookup(ENV_MAX_CONCURRENT) {
            config.resolver.max_concurrent = match value.trim().parse::<usize>() {
                Ok(n) if n > 0 => n,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        key: ENV_MAX_CONCURRENT,
                        value,
                        reason: "expected a positive integer".to_string(),
                    })
                }
            };
        }
        if let Some(value) = lookup(ENV_VERIFY_ACYCLIC) {
            config.verify_acyclic = parse_flag(ENV_VERIFY_ACYCLIC, &value)?;
        }
        if let Some(value) = lookup(ENV_MEMOIZE_PARSED) {
            config.memoize_parsed = parse_flag(ENV_MEMOIZE_PARSED, &value)?;
        }

        Ok(config)
    }
}

fn parse_flag(key: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key,
            value: value.to_string(),
            reason: "expected a boolean".to_string(),
        }),
    }
}
