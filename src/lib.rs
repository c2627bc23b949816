//! Declarative, reference-counted lifecycles for resources that reactive read
//! paths declare while they are evaluated.
//!

pub use tether_internal::*;

/// Re-export all common types for easy access.
pub mod prelude {
    pub use tether_internal::prelude::*;
}
