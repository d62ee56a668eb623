//! Parallel processing utilities for portfolio analytics.
//!
//! Provides conditional parallel iteration based on configuration
//! and collection size. Uses rayon when the `parallel` feature is enabled.

use crate::types::AnalyticsConfig;

/// Maps a function over items, conditionally using parallel iteration.
///
/// Uses parallel iteration when:
/// - The `parallel` feature is enabled
/// - `config.parallel` is true
/// - The collection size exceeds `config.parallel_threshold`
///
/// Output order always matches input order.
#[allow(unused_variables)]
pub fn maybe_parallel_map<T, U, F>(items: &[T], config: &AnalyticsConfig, f: F) -> Vec<U>
where
    T: Sync,
    U: Send,
    F: Fn(&T) -> U + Sync + Send,
{
    #[cfg(feature = "parallel")]
    {
        use rayon::prelude::*;
        if config.should_parallelize(items.len()) {
            return items.par_iter().map(f).collect();
        }
    }

    items.iter().map(f).collect()
}

/// Folds over items with a reduce step, conditionally using parallel iteration.
///
/// `reduce` must be associative and `identity` neutral for it, so the result
/// does not depend on how rayon splits the work.
#[allow(unused_variables)]
pub fn maybe_parallel_fold<T, U, F, R>(
    items: &[T],
    config: &AnalyticsConfig,
    identity: U,
    fold: F,
    reduce: R,
) -> U
where
    T: Sync,
    U: Send + Sync + Clone,
    F: Fn(U, &T) -> U + Sync + Send,
    R: Fn(U, U) -> U + Sync + Send,
{
    #[cfg(feature = "parallel")]
    {
        use rayon::prelude::*;
        if config.should_parallelize(items.len()) {
            return items
                .par_iter()
                .fold(|| identity.clone(), &fold)
                .reduce(|| identity.clone(), reduce);
        }
    }

    items.iter().fold(identity, fold)
}
