//! The subscription reconciliation engine for Tether (Layer 1).
//!
//! `tether_engine` lets a reactive read path, a function evaluated again and
//! again over changing state, declare the external resources it depends on
//! (subscriptions, polling loops, live connections) while it is being
//! evaluated. The engine activates each distinct resource once while anyone
//! needs it and cleans it up once when the last consumer lets go.
//!
//! - [`intent`] - Resource types and the `(type, key)` identity of intents
//! - [`memo`] - Identity-stable intents built from typed arguments
//! - [`collector`] - Gathering the intents declared by one evaluation
//! - [`registry`] - The shared, reference-counted table of active resources
//! - [`subscriber`] - Per-consumer diffing of desired against held resources
//! - [`context`] - The context value handed to activations
//! - [`engine`] - The provider scope tying the above together
//! - [`site`] - Host lifecycle hooks for one read-path instance
//! - [`selector`] - Lifting plain state selectors into read functions
//!
//! # Data flow
//!
//! ```text
//! evaluate ─▶ Collector ─▶ Subscriber (diff) ─▶ Registry ─▶ activation / cleanup
//! ```
//!
//! Everything is single-threaded: engine handles are `!Send` and shared with
//! `Rc`. Reentrancy is guarded instead of locked against.
//!
//! # Example
//!
//! ```
//! use tether_engine::prelude::*;
//! use std::cell::Cell;
//! use std::rc::Rc;
//!
//! let live = Rc::new(Cell::new(0));
//! let counter = Rc::clone(&live);
//! let room = ResourceType::new("room", move |_key: &str, _ctx: &()| {
//!     counter.set(counter.get() + 1);
//!     let counter = Rc::clone(&counter);
//!     Cleanup::new(move || counter.set(counter.get() - 1))
//! });
//!
//! let engine = Engine::new();
//! engine.provide(());
//!
//! let mut first = engine.create_site();
//! let mut second = engine.create_site();
//! for site in [&mut first, &mut second] {
//!     site.evaluate(&(), |_: &(), c| c.declare(&room.intent("42"))).unwrap();
//!     site.mount().unwrap();
//! }
//! assert_eq!(live.get(), 1);
//!
//! first.unmount();
//! assert_eq!(live.get(), 1);
//! second.unmount();
//! assert_eq!(live.get(), 0);
//! ```

/// Cleanup values returned by activations.
pub mod cleanup;

/// Per-evaluation intent collection.
pub mod collector;

/// Engine configuration.
pub mod config;

/// Context provider.
pub mod context;

/// Provider scope.
pub mod engine;

/// Error types.
pub mod error;

/// Resource types and intents.
pub mod intent;

/// Parameterized intent memoization.
pub mod memo;

/// Shared resource registry.
pub mod registry;

/// Selector adapters.
pub mod selector;

/// Host-facing reactive sites.
pub mod site;

/// Per-consumer reconciliation.
pub mod subscriber;

/// Re-export all common types for easy access.
pub mod prelude {
    pub use crate::cleanup::Cleanup;
    pub use crate::collector::{Collector, IntentSet};
    pub use crate::config::{EngineConfig, ReconcileOrder};
    pub use crate::context::ContextProvider;
    pub use crate::engine::Engine;
    pub use crate::error::{BoxError, EngineError, EvaluateError};
    pub use crate::intent::{Intent, IntentId, ResourceType};
    pub use crate::memo::{ParameterizedIntent, define_parameterized_intent};
    pub use crate::registry::{ConsumerId, Registry, RegistryStats};
    pub use crate::selector::{declaring, select};
    pub use crate::site::ReactiveSite;
    pub use crate::subscriber::Subscriber;
}
