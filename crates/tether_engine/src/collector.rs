//! Collection of intents during one evaluation pass.
//!
//! Each evaluation of a read function runs under a fresh [`Collector`]. The
//! read function declares intents on it (directly, or through
//! [`Engine::declare_intent`](crate::engine::Engine::declare_intent)), and the
//! finished [`IntentSet`] is handed to the consumer's subscriber.
//!
//! # Exclusivity
//!
//! Only one collector may be active per [`ActiveCollector`] slot at a time.
//! [`Collector::begin`] fails with [`EngineError::ReentrantCollection`] while
//! another collector holds the slot. The slot is released by
//! [`Collector::end`], or by dropping the collector, so a read function that
//! fails or panics never leaves collection state behind.

use crate::error::EngineError;
use crate::intent::{Intent, IntentId};
use core::fmt;
use indexmap::IndexMap;
use std::cell::RefCell;
use std::rc::Rc;

/// The set of intents declared during one evaluation, in declaration order.
///
/// Duplicates collapse onto their first declaration.
pub struct IntentSet<C> {
    intents: IndexMap<IntentId, Intent<C>>,
}

impl<C> Default for IntentSet<C> {
    fn default() -> Self {
        Self {
            intents: IndexMap::new(),
        }
    }
}

impl<C> Clone for IntentSet<C> {
    fn clone(&self) -> Self {
        Self {
            intents: self.intents.clone(),
        }
    }
}

impl<C> fmt::Debug for IntentSet<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.intents.values()).finish()
    }
}

impl<C> IntentSet<C> {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts an intent. Returns `false` if an equal intent was present.
    pub fn insert(&mut self, intent: Intent<C>) -> bool {
        let id = intent.id();
        if self.intents.contains_key(&id) {
            return false;
        }
        self.intents.insert(id, intent);
        true
    }

    /// Returns `true` if an intent with this identity is present.
    #[must_use]
    pub fn contains(&self, id: &IntentId) -> bool {
        self.intents.contains_key(id)
    }

    /// Returns the intent with this identity.
    #[must_use]
    pub fn get(&self, id: &IntentId) -> Option<&Intent<C>> {
        self.intents.get(id)
    }

    /// Returns the number of distinct intents.
    #[must_use]
    pub fn len(&self) -> usize {
        self.intents.len()
    }

    /// Returns `true` if nothing was declared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.intents.is_empty()
    }

    /// Iterates identities and intents in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&IntentId, &Intent<C>)> {
        self.intents.iter()
    }

    /// Iterates identities in declaration order.
    pub fn ids(&self) -> impl Iterator<Item = &IntentId> {
        self.intents.keys()
    }
}

impl<C> FromIterator<Intent<C>> for IntentSet<C> {
    fn from_iter<I: IntoIterator<Item = Intent<C>>>(iter: I) -> Self {
        let mut set = Self::new();
        for intent in iter {
            set.insert(intent);
        }
        set
    }
}

type SharedSet<C> = Rc<RefCell<IntentSet<C>>>;

/// The "current collector" slot of one engine.
///
/// Holds the set of the collector that is currently active, if any.
pub struct ActiveCollector<C> {
    current: RefCell<Option<SharedSet<C>>>,
}

impl<C> Default for ActiveCollector<C> {
    fn default() -> Self {
        Self {
            current: RefCell::new(None),
        }
    }
}

impl<C> fmt::Debug for ActiveCollector<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActiveCollector")
            .field("active", &self.is_active())
            .finish()
    }
}

impl<C> ActiveCollector<C> {
    /// Creates an empty slot.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` while a collector is active.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.current.borrow().is_some()
    }

    /// Declares an intent on the active collector.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::NotCollecting`] if no collector is active.
    pub fn declare(&self, intent: &Intent<C>) -> Result<(), EngineError> {
        let current = self.current.borrow().clone();
        let set = current.ok_or(EngineError::NotCollecting)?;
        if set.borrow_mut().insert(intent.clone()) {
            tracing::trace!(intent = %intent, "declared");
        }
        Ok(())
    }
}

/// Gathers the intents declared during one evaluation.
///
/// Created active by [`Collector::begin`] and finished by [`Collector::end`].
/// Dropping an unfinished collector discards its set and frees the slot.
pub struct Collector<C> {
    slot: Rc<ActiveCollector<C>>,
    set: SharedSet<C>,
}

impl<C> fmt::Debug for Collector<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collector")
            .field("intents", &self.set.borrow().len())
            .finish()
    }
}

impl<C> Collector<C> {
    /// Installs a new collector as the active one of `slot`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::ReentrantCollection`] if `slot` already has an
    /// active collector.
    pub fn begin(slot: &Rc<ActiveCollector<C>>) -> Result<Self, EngineError> {
        let mut current = slot.current.borrow_mut();
        if current.is_some() {
            return Err(EngineError::ReentrantCollection);
        }
        let set: SharedSet<C> = Rc::new(RefCell::new(IntentSet::new()));
        *current = Some(Rc::clone(&set));
        drop(current);

        Ok(Self {
            slot: Rc::clone(slot),
            set,
        })
    }

    /// Records an intent. Declaring an equal intent twice is a no-op.
    pub fn collect(&self, intent: &Intent<C>) {
        if self.set.borrow_mut().insert(intent.clone()) {
            tracing::trace!(intent = %intent, "declared");
        }
    }

    /// Alias of [`collect`](Self::collect) for use inside read functions.
    pub fn declare(&self, intent: &Intent<C>) {
        self.collect(intent);
    }

    /// Returns the number of distinct intents collected so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.set.borrow().len()
    }

    /// Returns `true` if nothing has been collected yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.set.borrow().is_empty()
    }

    /// Deactivates the collector and returns the finished set.
    #[must_use]
    pub fn end(self) -> IntentSet<C> {
        let set = Rc::clone(&self.set);
        // Drop clears the slot.
        drop(self);
        Rc::try_unwrap(set).map_or_else(
            |shared| shared.borrow().clone(),
            RefCell::into_inner,
        )
    }
}

impl<C> Drop for Collector<C> {
    fn drop(&mut self) {
        let mut current = self.slot.current.borrow_mut();
        if current
            .as_ref()
            .is_some_and(|active| Rc::ptr_eq(active, &self.set))
        {
            *current = None;
        }
    }
}
