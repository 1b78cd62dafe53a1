//! Engine configuration.

use serde::{Deserialize, Serialize};

/// Ceilings on the number of ranges a document may carry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RangesConfig {
    pub max_comments: usize,
    pub max_changes: usize,
}

impl Default for RangesConfig {
    fn default() -> Self {
        Self {
            max_comments: 500,
            max_changes: 2000,
        }
    }
}

impl RangesConfig {
    pub fn builder() -> RangesConfigBuilder {
        RangesConfigBuilder::new()
    }
}

/// Builder for [`RangesConfig`].
pub struct RangesConfigBuilder {
    config: RangesConfig,
}

impl RangesConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: RangesConfig::default(),
        }
    }

    pub fn max_comments(mut self, max: usize) -> Self {
        self.config.max_comments = max;
        self
    }

    pub fn max_changes(mut self, max: usize) -> Self {
        self.config.max_changes = max;
        self
    }

    pub fn build(self) -> RangesConfig {
        self.config
    }
}

impl Default for RangesConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-call switches for [`apply_update`](crate::RangesManager::apply_update).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplyOptions {
    /// Produce annotated history ops instead of passing edits through.
    pub history_ranges_support: bool,
}

impl ApplyOptions {
    pub fn with_history() -> Self {
        Self {
            history_ranges_support: true,
        }
    }
}
