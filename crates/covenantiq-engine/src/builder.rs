//! Builder pattern for the covenant engine.

use std::sync::Arc;

use covenantiq_traits::config::EngineConfig;
use covenantiq_traits::storage::{
    AlertStore, CovenantStore, LoanStore, MeasurementStore, StorageProvider,
};

use crate::engine::CovenantEngine;
use crate::error::EngineError;

/// Builder for constructing a [`CovenantEngine`].
#[derive(Default)]
pub struct CovenantEngineBuilder {
    config: Option<EngineConfig>,
    loans: Option<Arc<dyn LoanStore>>,
    covenants: Option<Arc<dyn CovenantStore>>,
    measurements: Option<Arc<dyn MeasurementStore>>,
    alerts: Option<Arc<dyn AlertStore>>,
}

impl CovenantEngineBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the engine configuration.
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set all four stores at once.
    pub fn with_storage(self, storage: StorageProvider) -> Self {
        self.with_loans(storage.loans)
            .with_covenants(storage.covenants)
            .with_measurements(storage.measurements)
            .with_alerts(storage.alerts)
    }

    /// Set the loan store.
    pub fn with_loans(mut self, store: Arc<dyn LoanStore>) -> Self {
        self.loans = Some(store);
        self
    }

    /// Set the covenant store.
    pub fn with_covenants(mut self, store: Arc<dyn CovenantStore>) -> Self {
        self.covenants = Some(store);
        self
    }

    /// Set the measurement store.
    pub fn with_measurements(mut self, store: Arc<dyn MeasurementStore>) -> Self {
        self.measurements = Some(store);
        self
    }

    /// Set the alert store.
    pub fn with_alerts(mut self, store: Arc<dyn AlertStore>) -> Self {
        self.alerts = Some(store);
        self
    }

    /// Build the engine.
    pub fn build(self) -> Result<CovenantEngine, EngineError> {
        let config = self.config.unwrap_or_default();
        config.validate().map_err(EngineError::ConfigError)?;

        let loans = self
            .loans
            .ok_or_else(|| EngineError::ConfigError("loan store not configured".into()))?;

        let covenants = self
            .covenants
            .ok_or_else(|| EngineError::ConfigError("covenant store not configured".into()))?;

        let measurements = self
            .measurements
            .ok_or_else(|| EngineError::ConfigError("measurement store not configured".into()))?;

        let alerts = self
            .alerts
            .ok_or_else(|| EngineError::ConfigError("alert store not configured".into()))?;

        Ok(CovenantEngine::new(
            config,
            StorageProvider {
                loans,
                covenants,
                measurements,
                alerts,
            },
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use covenantiq_ext_file::create_memory_storage;

    #[test]
    fn test_missing_store_is_config_error() {
        let storage = create_memory_storage();
        let result = CovenantEngineBuilder::new()
            .with_loans(storage.loans)
            .with_covenants(storage.covenants)
            .with_measurements(storage.measurements)
            .build();
        assert!(matches!(result, Err(EngineError::ConfigError(_))));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = EngineConfig::default();
        config.alerts.high_days = 100;
        let result = CovenantEngineBuilder::new()
            .with_config(config)
            .with_storage(create_memory_storage())
            .build();
        assert!(matches!(result, Err(EngineError::ConfigError(_))));
    }

    #[test]
    fn test_build_with_defaults() {
        let engine = CovenantEngineBuilder::new()
            .with_storage(create_memory_storage())
            .build()
            .unwrap();
        assert_eq!(engine.config().alerts.horizon_days, 90);
    }
}
