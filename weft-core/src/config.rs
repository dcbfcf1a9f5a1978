//! Runtime Configuration
//!
//! [`ReactiveConfig`] holds the knobs that decide how the kernel behaves at
//! its hazard points: reentrant notification and cyclic object graphs.
//! Every primitive has a `new` constructor that uses [`ReactiveConfig::default`]
//! and a `with_config` constructor for hosts that load their own.
//!
//! # Example
//!
//! ```rust
//! use weft_core::{NotifyPolicy, ReactiveConfig};
//!
//! let config = ReactiveConfig::from_json_str(r#"{ "notify_policy": "queued" }"#).unwrap();
//! assert_eq!(config.notify_policy, NotifyPolicy::Queued);
//! assert_eq!(config.max_reentrant_depth, 32);
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{ReactiveError, Result};

/// Default limit for reentrant notification on a single cell.
pub const DEFAULT_MAX_REENTRANT_DEPTH: usize = 32;

/// How a write that happens while its own cell is notifying is handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotifyPolicy {
    /// The reentrant write runs a nested pass that completes before the outer
    /// pass resumes. Nesting is bounded by `max_reentrant_depth`.
    #[default]
    Immediate,

    /// The reentrant write stores its value and defers its pass to a pending
    /// queue that the outermost write drains after its own pass completes.
    Queued,
}

/// Configuration shared by cells, signals and proxies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReactiveConfig {
    /// Reentrant notification strategy.
    pub notify_policy: NotifyPolicy,

    /// Immediate: maximum nested passes on one cell.
    /// Queued: maximum deferred passes drained by one outer write.
    pub max_reentrant_depth: usize,

    /// Return the same proxy wrapper for the same nested node.
    pub stable_proxy_identity: bool,

    /// Refuse to wrap cyclic graphs and refuse assignments that close a cycle.
    pub reject_cyclic_graphs: bool,
}

impl Default for ReactiveConfig {
    fn default() -> Self {
        Self {
            notify_policy: NotifyPolicy::Immediate,
            max_reentrant_depth: DEFAULT_MAX_REENTRANT_DEPTH,
            stable_proxy_identity: true,
            reject_cyclic_graphs: true,
        }
    }
}

impl ReactiveConfig {
    /// Parse a configuration from JSON. Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| ReactiveError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check that the configuration is usable.
    pub fn validate(&self) -> Result<()> {
        if self.max_reentrant_depth == 0 {
            return Err(ReactiveError::Config(
                "max_reentrant_depth must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
