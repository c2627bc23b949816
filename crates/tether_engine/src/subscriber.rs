//! Per-consumer reconciliation.
//!
//! A [`Subscriber`] belongs to one reactive read-path instance. It remembers
//! the intents desired by the latest evaluation, whether the instance is
//! mounted, and the resources it currently holds. Reconciliation diffs the
//! held set against the target set and asks the [`Registry`] to acquire or
//! release only the difference.
//!
//! # States
//!
//! ```text
//! Unmounted (holds nothing)
//!    │ handle_mounted()
//!    ▼
//! Mounted, holds ∅ ──handle_evaluated(S)──▶ Mounted, holds S
//!    ▲                                           │
//!    └────────────── handle_unmounted() ─────────┘ (releases everything)
//! ```
//!
//! The target set is the desired set while mounted and empty otherwise.
//! Reconciling with an unchanged target makes no registry calls.

use crate::collector::IntentSet;
use crate::config::ReconcileOrder;
use crate::error::EngineError;
use crate::intent::IntentId;
use crate::registry::{ConsumerId, Registry, ResourceRef};
use core::fmt;
use indexmap::IndexMap;

/// Reconciles one consumer's desired intents against the shared registry.
///
/// Dropping a subscriber releases everything it holds.
pub struct Subscriber<C> {
    id: ConsumerId,
    registry: Registry,
    order: ReconcileOrder,
    mounted: bool,
    desired: Option<IntentSet<C>>,
    current: IndexMap<IntentId, ResourceRef>,
    context: Option<C>,
}

impl<C> fmt::Debug for Subscriber<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscriber")
            .field("id", &self.id)
            .field("mounted", &self.mounted)
            .field("desired", &self.desired.as_ref().map(IntentSet::len))
            .field("held", &self.current.len())
            .finish()
    }
}

impl<C> Subscriber<C> {
    /// Creates an unmounted subscriber holding nothing.
    #[must_use]
    pub fn new(registry: Registry, order: ReconcileOrder) -> Self {
        Self {
            id: ConsumerId::next(),
            registry,
            order,
            mounted: false,
            desired: None,
            current: IndexMap::new(),
            context: None,
        }
    }

    /// Returns this subscriber's consumer identifier.
    #[must_use]
    pub fn id(&self) -> ConsumerId {
        self.id
    }

    /// Returns `true` while mounted.
    #[must_use]
    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    /// Returns the context used for the next acquisition.
    #[must_use]
    pub fn context(&self) -> Option<&C> {
        self.context.as_ref()
    }

    /// Replaces the context used for future acquisitions.
    ///
    /// Resources already held are left alone; only the next activation sees
    /// the new value.
    pub fn set_context(&mut self, context: C) {
        self.context = Some(context);
    }

    /// Forgets the context. A later acquisition fails with
    /// [`EngineError::MissingProvider`] until a new value is set.
    pub fn clear_context(&mut self) {
        self.context = None;
    }

    /// Returns the intents desired by the latest evaluation.
    #[must_use]
    pub fn desired(&self) -> Option<&IntentSet<C>> {
        self.desired.as_ref()
    }

    /// Iterates the identities currently held.
    pub fn held(&self) -> impl Iterator<Item = &IntentId> {
        self.current.keys()
    }

    /// Returns the number of resources currently held.
    #[must_use]
    pub fn held_count(&self) -> usize {
        self.current.len()
    }

    /// Returns `true` if the resource for `id` is held.
    #[must_use]
    pub fn holds(&self, id: &IntentId) -> bool {
        self.current.contains_key(id)
    }

    /// Marks the consumer mounted and reconciles.
    ///
    /// # Errors
    ///
    /// Propagates acquisition failures, see [`reconcile`](Self::reconcile).
    pub fn handle_mounted(&mut self) -> Result<(), EngineError> {
        self.mounted = true;
        self.reconcile()
    }

    /// Marks the consumer unmounted and releases everything it holds.
    pub fn handle_unmounted(&mut self) {
        self.mounted = false;
        let released = self.release_stale();
        tracing::debug!(consumer = %self.id, released, "unmounted");
    }

    /// Stores the intents collected by a new evaluation and reconciles.
    ///
    /// # Errors
    ///
    /// Propagates acquisition failures, see [`reconcile`](Self::reconcile).
    pub fn handle_evaluated(&mut self, desired: IntentSet<C>) -> Result<(), EngineError> {
        self.desired = Some(desired);
        self.reconcile()
    }

    /// Brings the held set in line with the target set.
    ///
    /// Stale resources are always released, even if an acquisition fails.
    ///
    /// # Errors
    ///
    /// - [`EngineError::MissingProvider`] if something must be acquired and no
    ///   context has been set
    /// - any error of [`Registry::acquire`]
    pub fn reconcile(&mut self) -> Result<(), EngineError> {
        let (acquired, released) = match self.order {
            ReconcileOrder::AcquireFirst => {
                let acquired = self.acquire_missing();
                let released = self.release_stale();
                (acquired, released)
            }
            ReconcileOrder::ReleaseFirst => {
                let released = self.release_stale();
                (self.acquire_missing(), released)
            }
        };
        let acquired = acquired?;
        if acquired > 0 || released > 0 {
            tracing::debug!(
                consumer = %self.id,
                acquired,
                released,
                held = self.current.len(),
                "reconciled"
            );
        }
        Ok(())
    }

    /// Releases everything and consumes the subscriber.
    pub fn dispose(self) {
        drop(self);
    }

    fn wants(&self, id: &IntentId) -> bool {
        self.mounted && self.desired.as_ref().is_some_and(|set| set.contains(id))
    }

    fn release_stale(&mut self) -> usize {
        let stale: Vec<IntentId> = self
            .current
            .keys()
            .filter(|id| !self.wants(id))
            .cloned()
            .collect();
        for id in &stale {
            if let Some(held) = self.current.shift_remove(id) {
                self.registry.release(held);
            }
        }
        stale.len()
    }

    fn acquire_missing(&mut self) -> Result<usize, EngineError> {
        if !self.mounted {
            return Ok(0);
        }
        let Some(desired) = self.desired.as_ref() else {
            return Ok(0);
        };

        let mut acquired = 0;
        for (id, intent) in desired.iter() {
            if self.current.contains_key(id) {
                continue;
            }
            let context = self.context.as_ref().ok_or(EngineError::MissingProvider)?;
            let held = self.registry.acquire(self.id, intent, context)?;
            self.current.insert(id.clone(), held);
            acquired += 1;
        }
        Ok(acquired)
    }
}

impl<C> Drop for Subscriber<C> {
    fn drop(&mut self) {
        if self.current.is_empty() {
            return;
        }
        tracing::debug!(consumer = %self.id, held = self.current.len(), "disposing");
        for (_, held) in self.current.drain(..) {
            self.registry.release(held);
        }
    }
}
