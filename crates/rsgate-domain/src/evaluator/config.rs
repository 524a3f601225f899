//! Configuration for the permission evaluator.

use std::time::Duration;

use crate::model::PermissionConvention;

/// Configuration for the permission evaluator.
#[derive(Debug, Clone)]
pub struct EvaluatorConfig {
    /// How entity/action pairs map onto permission names.
    pub convention: PermissionConvention,
    /// Upper bound on any single persistence fetch. Exceeding it is a
    /// lookup failure, so the check fails closed.
    pub fetch_timeout: Duration,
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        Self {
            convention: PermissionConvention::default(),
            fetch_timeout: Duration::from_secs(5),
        }
    }
}

impl EvaluatorConfig {
    /// Sets the permission naming convention.
    pub fn with_convention(mut self, convention: PermissionConvention) -> Self {
        self.convention = convention;
        self
    }

    /// Sets the persistence fetch timeout.
    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }
}
