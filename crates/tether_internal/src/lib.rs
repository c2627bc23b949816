//! # Tether Internal Library
//!
//! Re-exports the core Tether crates for convenience.

/// Layer 1: Subscription reconciliation engine.
pub use tether_engine;

/// Layer 1: Logging infrastructure.
pub use tether_core;

/// Re-export all common types for easy access.
pub mod prelude {
    pub use tether_core::{TracingConfig, TracingFormat};
    pub use tether_engine::prelude::*;
}
