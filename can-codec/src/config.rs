//! Compiler configuration types
//!
//! This module defines the knobs a compilation run accepts. Everything has a
//! default, so `CompilerConfig::default()` reproduces the standard behavior.

use serde::{Deserialize, Serialize};

/// What to do when two simultaneously active signals share frame bits
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverlapPolicy {
    /// Accept silently
    Ignore,
    /// Accept and log a warning
    #[default]
    Warn,
    /// Fail with a configuration error
    Reject,
}

/// Configuration for the codec compiler
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompilerConfig {
    /// Handling of overlapping signals
    #[serde(default)]
    pub overlap_policy: OverlapPolicy,

    /// Abort the whole run on the first configuration error (false = skip
    /// the offending message and keep going)
    #[serde(default = "default_true")]
    pub abort_on_error: bool,

    /// Refuse frames shorter than the message DLC when unpacking
    #[serde(default = "default_true")]
    pub check_dlc: bool,
}

fn default_true() -> bool {
    true
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            overlap_policy: OverlapPolicy::default(),
            abort_on_error: true,
            check_dlc: true,
        }
    }
}

impl CompilerConfig {
    /// Create a new compiler configuration with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method: set the overlap policy
    pub fn with_overlap_policy(mut self, policy: OverlapPolicy) -> Self {
        self.overlap_policy = policy;
        self
    }

    /// Builder method: abort or skip on configuration errors
    pub fn with_abort_on_error(mut self, enabled: bool) -> Self {
        self.abort_on_error = enabled;
        self
    }

    /// Builder method: enable or disable the DLC check
    pub fn with_dlc_check(mut self, enabled: bool) -> Self {
        self.check_dlc = enabled;
        self
    }
}
