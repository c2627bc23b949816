//! Engine configuration.

/// Order of the two halves of a reconciliation pass.
///
/// Resources kept across the pass are never torn down and rebuilt in either
/// order. The choice only matters when activations or cleanups of different
/// resources have side effects on each other.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReconcileOrder {
    /// Acquire newly desired resources, then release stale ones.
    #[default]
    AcquireFirst,
    /// Release stale resources, then acquire newly desired ones.
    ReleaseFirst,
}

/// Configuration shared by every consumer of one engine.
///
/// # Example
///
/// ```
/// use tether_engine::config::{EngineConfig, ReconcileOrder};
///
/// let config = EngineConfig::default()
///     .with_reconcile_order(ReconcileOrder::ReleaseFirst)
///     .with_leak_warnings(false);
///
/// assert_eq!(config.reconcile_order, ReconcileOrder::ReleaseFirst);
/// assert!(!config.leak_warnings);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    /// Order of acquisitions and releases within one reconciliation.
    pub reconcile_order: ReconcileOrder,
    /// Whether an activation returning no cleanup logs a warning.
    ///
    /// Leaks are counted in the registry statistics either way.
    pub leak_warnings: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            reconcile_order: ReconcileOrder::AcquireFirst,
            leak_warnings: true,
        }
    }
}

impl EngineConfig {
    /// Creates a configuration with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the reconciliation order.
    #[must_use]
    pub fn with_reconcile_order(mut self, order: ReconcileOrder) -> Self {
        self.reconcile_order = order;
        self
    }

    /// Enables or disables the leak warning.
    #[must_use]
    pub fn with_leak_warnings(mut self, enabled: bool) -> Self {
        self.leak_warnings = enabled;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_acquire_first_with_warnings() {
        let config = EngineConfig::new();
        assert_eq!(config.reconcile_order, ReconcileOrder::AcquireFirst);
        assert!(config.leak_warnings);
    }
}
