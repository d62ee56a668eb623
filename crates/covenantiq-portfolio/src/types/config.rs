//! Configuration for portfolio analytics computation.

use serde::{Deserialize, Serialize};

/// Controls parallelism and period lengths for portfolio analytics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsConfig {
    /// Enable parallel processing (requires 'parallel' feature).
    pub parallel: bool,

    /// Minimum item count to trigger parallel processing.
    /// Below this threshold, sequential is faster due to thread overhead.
    pub parallel_threshold: usize,

    /// Months per period for value and trend series.
    pub trend_months: u32,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            parallel: true,
            parallel_threshold: 100,
            trend_months: 6,
        }
    }
}

impl AnalyticsConfig {
    /// Creates a new config with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a config that always uses sequential processing.
    #[must_use]
    pub fn sequential() -> Self {
        Self {
            parallel: false,
            ..Self::default()
        }
    }

    /// Sets the trend period length.
    #[must_use]
    pub fn with_trend_months(mut self, months: u32) -> Self {
        self.trend_months = months;
        self
    }

    /// Whether a collection of `len` items should be processed in parallel.
    #[must_use]
    pub fn should_parallelize(&self, len: usize) -> bool {
        self.parallel && len > self.parallel_threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_parallelize() {
        let config = AnalyticsConfig::default();
        assert!(!config.should_parallelize(100));
        assert!(config.should_parallelize(101));
        assert!(!AnalyticsConfig::sequential().should_parallelize(10_000));
    }
}
