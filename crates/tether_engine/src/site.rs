//! Reactive sites: the host-facing integration point.
//!
//! A [`ReactiveSite`] is one instance of a reactive read path, for example one
//! mounted UI element that reads from the state store. The host's binding
//! layer calls into it at fixed lifecycle points:
//!
//! | Host event | Call |
//! |------------|------|
//! | instance created | [`Engine::create_site`](crate::engine::Engine::create_site) |
//! | instance evaluated | [`ReactiveSite::evaluate`] / [`ReactiveSite::try_evaluate`] |
//! | instance mounted | [`ReactiveSite::mount`] |
//! | instance unmounted | [`ReactiveSite::unmount`] |
//! | instance disposed | [`ReactiveSite::dispose`] (or drop) |
//!
//! Every evaluation refreshes the subscriber's context from the provider,
//! runs the read function under a fresh collector, and reconciles the
//! collected intents. Mounting refreshes the context too, so acquisitions
//! made at mount see the value visible at that moment.

use crate::collector::Collector;
use crate::engine::Engine;
use crate::error::{EngineError, EvaluateError};
use crate::intent::IntentId;
use crate::registry::ConsumerId;
use crate::subscriber::Subscriber;
use core::fmt;

/// One instance of a reactive read path.
pub struct ReactiveSite<C> {
    engine: Engine<C>,
    subscriber: Subscriber<C>,
    evaluations: u64,
}

impl<C> fmt::Debug for ReactiveSite<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReactiveSite")
            .field("subscriber", &self.subscriber)
            .field("evaluations", &self.evaluations)
            .finish()
    }
}

impl<C> ReactiveSite<C> {
    pub(crate) fn new(engine: Engine<C>) -> Self {
        let subscriber = Subscriber::new(engine.registry().clone(), engine.config().reconcile_order);
        tracing::trace!(consumer = %subscriber.id(), "site created");
        Self {
            engine,
            subscriber,
            evaluations: 0,
        }
    }

    /// Returns the consumer identifier of this site.
    #[must_use]
    pub fn consumer_id(&self) -> ConsumerId {
        self.subscriber.id()
    }

    /// Returns `true` while mounted.
    #[must_use]
    pub fn is_mounted(&self) -> bool {
        self.subscriber.is_mounted()
    }

    /// Returns the number of completed evaluations.
    #[must_use]
    pub fn evaluations(&self) -> u64 {
        self.evaluations
    }

    /// Iterates the identities currently held.
    pub fn held(&self) -> impl Iterator<Item = &IntentId> {
        self.subscriber.held()
    }

    /// Returns the number of resources currently held.
    #[must_use]
    pub fn held_count(&self) -> usize {
        self.subscriber.held_count()
    }

    /// Returns the underlying subscriber.
    #[must_use]
    pub fn subscriber(&self) -> &Subscriber<C> {
        &self.subscriber
    }

    /// Marks the site unmounted and releases everything it holds.
    pub fn unmount(&mut self) {
        self.subscriber.handle_unmounted();
    }

    /// Releases everything and consumes the site.
    pub fn dispose(self) {
        tracing::trace!(consumer = %self.subscriber.id(), "site disposed");
        self.subscriber.dispose();
    }
}

impl<C: Clone> ReactiveSite<C> {
    /// Marks the site mounted and acquires what the last evaluation declared.
    ///
    /// Acquisitions use the context visible now, not the one seen by the last
    /// evaluation.
    ///
    /// # Errors
    ///
    /// - [`EngineError::MissingProvider`] if something must be acquired and no
    ///   context is visible
    /// - any other acquisition failure
    pub fn mount(&mut self) -> Result<(), EngineError> {
        match self.engine.context().current() {
            Ok(context) => self.subscriber.set_context(context),
            Err(_) => self.subscriber.clear_context(),
        }
        self.subscriber.handle_mounted()
    }

    /// Evaluates `read` against `state`, collecting the intents it declares,
    /// and reconciles them.
    ///
    /// The collector is cleared even if `read` panics.
    ///
    /// # Errors
    ///
    /// - [`EngineError::MissingProvider`] if no context is provided
    /// - [`EngineError::ReentrantCollection`] if called from inside another
    ///   evaluation of the same engine
    /// - any acquisition failure of the reconciliation
    pub fn evaluate<S, T, F>(&mut self, state: &S, read: F) -> Result<T, EngineError>
    where
        S: ?Sized,
        F: FnOnce(&S, &Collector<C>) -> T,
    {
        self.refresh_context()?;
        let collector = Collector::begin(self.engine.collector())?;
        let value = read(state, &collector);
        self.finish(collector)?;
        Ok(value)
    }

    /// Like [`evaluate`](Self::evaluate), for read functions that can fail.
    ///
    /// The intents declared before the failure are still reconciled.
    ///
    /// # Errors
    ///
    /// [`EvaluateError::Read`] carries the read function's error;
    /// [`EvaluateError::Engine`] carries engine failures, which take
    /// precedence.
    pub fn try_evaluate<S, T, E, F>(&mut self, state: &S, read: F) -> Result<T, EvaluateError<E>>
    where
        S: ?Sized,
        F: FnOnce(&S, &Collector<C>) -> Result<T, E>,
    {
        self.refresh_context()?;
        let collector = Collector::begin(self.engine.collector())?;
        let value = read(state, &collector);
        self.finish(collector)?;
        value.map_err(EvaluateError::Read)
    }

    fn refresh_context(&mut self) -> Result<(), EngineError> {
        let context = self.engine.context().current()?;
        self.subscriber.set_context(context);
        Ok(())
    }

    fn finish(&mut self, collector: Collector<C>) -> Result<(), EngineError> {
        let desired = collector.end();
        self.evaluations += 1;
        tracing::trace!(
            consumer = %self.subscriber.id(),
            declared = desired.len(),
            "evaluated"
        );
        self.subscriber.handle_evaluated(desired)
    }
}
