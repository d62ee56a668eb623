//! Calculation context derived from the engine configuration.

use covenantiq_analytics::{
    BreachPredictor, EvaluationSettings, PredictionSettings, ThresholdEvaluator, TrendAggregator,
};
use covenantiq_portfolio::types::AnalyticsConfig;
use covenantiq_traits::config::{EngineConfig, EvaluationConfig, PredictionConfig};

/// Pure calculators configured once per engine.
#[derive(Debug, Clone)]
pub(crate) struct CalcContext {
    pub evaluator: ThresholdEvaluator,
    pub predictor: BreachPredictor,
    pub aggregator: TrendAggregator,
    pub analytics: AnalyticsConfig,
}

impl CalcContext {
    pub fn from_config(config: &EngineConfig) -> Self {
        let evaluator = ThresholdEvaluator::new(evaluation_settings(&config.evaluation));
        let predictor = BreachPredictor::new(prediction_settings(&config.prediction), evaluator);
        Self {
            evaluator,
            predictor,
            aggregator: TrendAggregator::new().with_max_gap_days(config.trends.max_gap_days),
            analytics: AnalyticsConfig::default().with_trend_months(config.trends.months),
        }
    }
}

fn evaluation_settings(config: &EvaluationConfig) -> EvaluationSettings {
    EvaluationSettings {
        warning_band_pct: config.warning_band_pct,
        equality_tolerance_pct: config.equality_tolerance_pct,
    }
}

fn prediction_settings(config: &PredictionConfig) -> PredictionSettings {
    PredictionSettings {
        min_samples: config.min_samples,
        noise_floor_pct: config.noise_floor_pct,
        noise_window_days: f64::from(config.noise_window_days),
        max_horizon_days: config.max_horizon_days,
        full_confidence_samples: config.full_confidence_samples,
        noisy_fit_r_squared: config.noisy_fit_r_squared,
    }
}
