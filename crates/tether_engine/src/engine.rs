//! The provider scope.
//!
//! An [`Engine`] bundles everything one host needs: the shared [`Registry`],
//! the collector slot, the [`ContextProvider`] and the [`EngineConfig`]. It is
//! constructed and owned by the host (one per logical provider scope) and
//! handed to the places that create reactive sites; nothing is global.
//!
//! # Example
//!
//! ```
//! use tether_engine::cleanup::Cleanup;
//! use tether_engine::engine::Engine;
//! use tether_engine::intent::ResourceType;
//!
//! let engine = Engine::<()>::new();
//! engine.provide(());
//!
//! let room = ResourceType::new("room", |_key: &str, _ctx: &()| Cleanup::new(|| ()));
//!
//! let mut slot = None;
//! let value = engine
//!     .use_reactive_value(&mut slot, &41, |state: &i32, collector| {
//!         collector.declare(&room.intent("42"));
//!         state + 1
//!     })
//!     .unwrap();
//! assert_eq!(value, 42);
//!
//! let site = slot.as_mut().unwrap();
//! site.mount().unwrap();
//! assert_eq!(engine.registry().active_count(), 1);
//!
//! site.unmount();
//! assert!(engine.registry().is_empty());
//! ```

use crate::collector::{ActiveCollector, Collector};
use crate::config::EngineConfig;
use crate::context::ContextProvider;
use crate::error::EngineError;
use crate::intent::Intent;
use crate::registry::Registry;
use crate::site::ReactiveSite;
use core::fmt;
use std::rc::Rc;

struct EngineInner<C> {
    config: EngineConfig,
    registry: Registry,
    collector: Rc<ActiveCollector<C>>,
    context: ContextProvider<C>,
}

/// A provider scope: registry, collector slot, context and configuration.
///
/// Cloning yields another handle to the same scope.
pub struct Engine<C> {
    inner: Rc<EngineInner<C>>,
}

impl<C> Clone for Engine<C> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<C> Default for Engine<C> {
    fn default() -> Self {
        Self::with_config(EngineConfig::default())
    }
}

impl<C> fmt::Debug for Engine<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("config", &self.inner.config)
            .field("registry", &self.inner.registry)
            .field("collector", &self.inner.collector)
            .field("context", &self.inner.context)
            .finish()
    }
}

impl<C> Engine<C> {
    /// Creates an engine with default configuration and no context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an engine with the given configuration.
    #[must_use]
    pub fn with_config(config: EngineConfig) -> Self {
        tracing::debug!(?config, "engine created");
        Self {
            inner: Rc::new(EngineInner {
                config,
                registry: Registry::with_leak_warnings(config.leak_warnings),
                collector: Rc::new(ActiveCollector::new()),
                context: ContextProvider::new(),
            }),
        }
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.inner.config
    }

    /// Returns the shared registry.
    #[must_use]
    pub fn registry(&self) -> &Registry {
        &self.inner.registry
    }

    /// Returns the context provider.
    #[must_use]
    pub fn context(&self) -> &ContextProvider<C> {
        &self.inner.context
    }

    /// Returns the collector slot.
    #[must_use]
    pub fn collector(&self) -> &Rc<ActiveCollector<C>> {
        &self.inner.collector
    }

    /// Sets the root context value, returning the previous one.
    pub fn provide(&self, value: C) -> Option<C> {
        self.inner.context.provide(value)
    }

    /// Runs `scope` with `value` as the visible context.
    pub fn with_context<R>(&self, value: C, scope: impl FnOnce() -> R) -> R {
        self.inner.context.with_context(value, scope)
    }

    /// Declares an intent on the evaluation currently in progress.
    ///
    /// This is the ambient form of [`Collector::declare`], for helpers that are
    /// called from a read function without access to its collector.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::NotCollecting`] outside of an evaluation.
    pub fn declare_intent(&self, intent: &Intent<C>) -> Result<(), EngineError> {
        self.inner.collector.declare(intent)
    }

    /// Returns `true` while a read function is being evaluated.
    #[must_use]
    pub fn is_collecting(&self) -> bool {
        self.inner.collector.is_active()
    }

    /// Creates a reactive site: the "instance created" hook.
    #[must_use]
    pub fn create_site(&self) -> ReactiveSite<C> {
        ReactiveSite::new(self.clone())
    }

    /// Evaluates `read` for the site stored in `slot`, creating the site on
    /// first use.
    ///
    /// `slot` plays the part of a per-call-site hook state: keep it alongside
    /// the UI element that owns the read path, and drop it (or call
    /// [`ReactiveSite::dispose`]) when the element goes away.
    ///
    /// # Errors
    ///
    /// See [`ReactiveSite::evaluate`].
    pub fn use_reactive_value<S, T, F>(
        &self,
        slot: &mut Option<ReactiveSite<C>>,
        state: &S,
        read: F,
    ) -> Result<T, EngineError>
    where
        C: Clone,
        S: ?Sized,
        F: FnOnce(&S, &Collector<C>) -> T,
    {
        let site = slot.get_or_insert_with(|| self.create_site());
        site.evaluate(state, read)
    }
}
