//! Shared, reference-counted resource registry.
//!
//! The [`Registry`] is the sole owner of resource lifetimes. It maps each
//! [`IntentId`] to an active resource: the cleanup returned by the activation
//! plus the set of consumers currently holding it.
//!
//! # Invariants
//!
//! 1. A resource is present iff its holder set is non-empty.
//! 2. The activation of an identity runs at most once while the resource is
//!    active, however many consumers acquire it.
//! 3. A consumer appears at most once in a resource's holder set.
//! 4. The cleanup runs exactly once, when the last holder releases.
//!
//! Activation and cleanup functions run while the registry is not borrowed,
//! so they may acquire or release other resources. An activation that
//! re-enters the registry for its own identity is rejected with
//! [`EngineError::ReentrantActivation`].
//!
//! # Example
//!
//! ```
//! use tether_engine::cleanup::Cleanup;
//! use tether_engine::intent::ResourceType;
//! use tether_engine::registry::{ConsumerId, Registry};
//!
//! let registry = Registry::new();
//! let room = ResourceType::new("room", |_key: &str, _ctx: &()| Cleanup::new(|| ()));
//! let intent = room.intent("42");
//!
//! let (first, second) = (ConsumerId::next(), ConsumerId::next());
//! let a = registry.acquire(first, &intent, &()).unwrap();
//! let b = registry.acquire(second, &intent, &()).unwrap();
//! assert_eq!(registry.stats().activations, 1);
//! assert_eq!(registry.holders(&intent.id()), 2);
//!
//! registry.release(a);
//! assert!(registry.contains(&intent.id()));
//! registry.release(b);
//! assert!(!registry.contains(&intent.id()));
//! assert_eq!(registry.stats().cleanups, 1);
//! ```

use crate::cleanup::Cleanup;
use crate::error::EngineError;
use crate::intent::{Intent, IntentId};
use core::fmt;
use core::sync::atomic::{AtomicU64, Ordering};
use hashbrown::{HashMap, HashSet};
use std::cell::RefCell;
use std::rc::Rc;

static NEXT_CONSUMER: AtomicU64 = AtomicU64::new(0);

/// Identifies one consumer (one reactive read-path instance).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConsumerId(u64);

impl ConsumerId {
    /// Allocates a fresh consumer identifier.
    #[must_use]
    pub fn next() -> Self {
        Self(NEXT_CONSUMER.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for ConsumerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "consumer#{}", self.0)
    }
}

/// A consumer's claim on an active resource.
///
/// Non-owning: the registry owns the resource. Hand the reference back to
/// [`Registry::release`] to drop the claim.
#[derive(Debug, PartialEq, Eq)]
#[must_use = "a resource reference must be released, or the resource stays active"]
pub struct ResourceRef {
    id: IntentId,
    consumer: ConsumerId,
}

impl ResourceRef {
    /// Returns the identity of the referenced resource.
    #[must_use]
    pub fn id(&self) -> &IntentId {
        &self.id
    }

    /// Returns the consumer holding this reference.
    #[must_use]
    pub fn consumer(&self) -> ConsumerId {
        self.consumer
    }
}

/// Counters of registry activity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegistryStats {
    /// Activation functions invoked successfully.
    pub activations: u64,
    /// Cleanups run after the last holder released.
    pub cleanups: u64,
    /// Activations that returned no cleanup.
    pub leaks: u64,
}

struct ActiveResource {
    name: String,
    cleanup: Cleanup,
    holders: HashSet<ConsumerId>,
}

#[derive(Default)]
struct RegistryInner {
    resources: HashMap<IntentId, ActiveResource>,
    // Identities whose activation is currently running.
    activating: HashSet<IntentId>,
    stats: RegistryStats,
}

/// Table of active resources, shared by every consumer of one engine.
///
/// `Registry` is a cheap handle; clones refer to the same table.
#[derive(Clone)]
pub struct Registry {
    inner: Rc<RefCell<RegistryInner>>,
    leak_warnings: bool,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("Registry")
            .field("active", &inner.resources.len())
            .field("stats", &inner.stats)
            .finish()
    }
}

impl Registry {
    /// Creates an empty registry that logs leak warnings.
    #[must_use]
    pub fn new() -> Self {
        Self::with_leak_warnings(true)
    }

    /// Creates an empty registry, choosing whether leaks are logged.
    #[must_use]
    pub fn with_leak_warnings(leak_warnings: bool) -> Self {
        Self {
            inner: Rc::new(RefCell::new(RegistryInner::default())),
            leak_warnings,
        }
    }

    /// Adds `consumer` as a holder of the resource for `intent`, activating it
    /// first if it is not active yet.
    ///
    /// Acquiring an identity the consumer already holds leaves the holder set
    /// unchanged and returns another reference to the same claim; the claim
    /// ends with whichever reference is released first.
    ///
    /// # Errors
    ///
    /// Fails when the activation fails, returns an invalid cleanup, or
    /// re-enters the registry for the same identity. Nothing is recorded for a
    /// failed acquisition.
    pub fn acquire<C>(
        &self,
        consumer: ConsumerId,
        intent: &Intent<C>,
        context: &C,
    ) -> Result<ResourceRef, EngineError> {
        let id = intent.id();
        {
            let mut inner = self.inner.borrow_mut();
            if let Some(active) = inner.resources.get_mut(&id) {
                if active.holders.insert(consumer) {
                    tracing::debug!(
                        resource = %active.name,
                        %consumer,
                        holders = active.holders.len(),
                        "joined active resource"
                    );
                } else {
                    tracing::debug!(resource = %active.name, %consumer, "already held");
                }
                return Ok(ResourceRef { id, consumer });
            }
            if !inner.activating.insert(id.clone()) {
                return Err(EngineError::ReentrantActivation {
                    resource: intent.to_string(),
                });
            }
        }

        let guard = ActivationGuard {
            inner: &self.inner,
            id: &id,
        };
        let cleanup = intent.resource_type().activate(intent.key(), context)?;
        drop(guard);

        let name = intent.to_string();
        let leaked = cleanup.is_none();
        if leaked && self.leak_warnings {
            tracing::warn!(
                resource = %name,
                "activation returned no cleanup; substituting a no-op, the resource may leak"
            );
        }
        tracing::debug!(resource = %name, %consumer, "activated");

        let mut inner = self.inner.borrow_mut();
        inner.stats.activations += 1;
        if leaked {
            inner.stats.leaks += 1;
        }
        let mut holders = HashSet::new();
        holders.insert(consumer);
        inner.resources.insert(
            id.clone(),
            ActiveResource {
                name,
                cleanup,
                holders,
            },
        );

        Ok(ResourceRef { id, consumer })
    }

    /// Drops a claim. Runs the cleanup if it was the last one.
    ///
    /// Releasing a reference whose claim already ended is a no-op.
    pub fn release(&self, resource: ResourceRef) {
        let ResourceRef { id, consumer } = resource;
        let removed = {
            let mut inner = self.inner.borrow_mut();
            let Some(active) = inner.resources.get_mut(&id) else {
                tracing::debug!(%id, %consumer, "release of inactive resource ignored");
                return;
            };
            if !active.holders.remove(&consumer) {
                tracing::debug!(resource = %active.name, %consumer, "release by non-holder ignored");
                return;
            }
            if !active.holders.is_empty() {
                tracing::debug!(
                    resource = %active.name,
                    %consumer,
                    holders = active.holders.len(),
                    "released"
                );
                return;
            }
            inner.stats.cleanups += 1;
            inner.resources.remove(&id)
        };

        if let Some(active) = removed {
            tracing::debug!(resource = %active.name, %consumer, "last holder released; cleaning up");
            active.cleanup.run();
        }
    }

    /// Returns `true` if the resource for `id` is active.
    #[must_use]
    pub fn contains(&self, id: &IntentId) -> bool {
        self.inner.borrow().resources.contains_key(id)
    }

    /// Returns the number of consumers holding the resource for `id`.
    #[must_use]
    pub fn holders(&self, id: &IntentId) -> usize {
        self.inner
            .borrow()
            .resources
            .get(id)
            .map_or(0, |active| active.holders.len())
    }

    /// Returns the number of active resources.
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.inner.borrow().resources.len()
    }

    /// Returns `true` if no resource is active.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.borrow().resources.is_empty()
    }

    /// Returns the identities of all active resources.
    #[must_use]
    pub fn active_ids(&self) -> Vec<IntentId> {
        self.inner.borrow().resources.keys().cloned().collect()
    }

    /// Returns a snapshot of the activity counters.
    #[must_use]
    pub fn stats(&self) -> RegistryStats {
        self.inner.borrow().stats
    }
}

// Clears the in-flight marker even if the activation unwinds.
struct ActivationGuard<'a> {
    inner: &'a RefCell<RegistryInner>,
    id: &'a IntentId,
}

impl Drop for ActivationGuard<'_> {
    fn drop(&mut self) {
        self.inner.borrow_mut().activating.remove(self.id);
    }
}
