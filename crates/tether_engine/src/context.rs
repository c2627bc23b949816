//! Context provider.
//!
//! The context is the value handed to every activation, typically a
//! dispatcher the resource uses to push data back into the host's state store.
//! It is resolved when a consumer evaluates or mounts, so a changed value
//! reaches the next acquisition without disturbing resources that are already
//! active.
//!
//! Lookup order for [`ContextProvider::current`]:
//!
//! 1. The innermost [`with_context`](ContextProvider::with_context) scope
//! 2. The root value set by [`provide`](ContextProvider::provide)
//! 3. Otherwise [`EngineError::MissingProvider`]

use crate::error::EngineError;
use core::fmt;
use std::cell::RefCell;

/// Supplies the context value visible to acquisitions.
pub struct ContextProvider<C> {
    root: RefCell<Option<C>>,
    scopes: RefCell<Vec<C>>,
}

impl<C> Default for ContextProvider<C> {
    fn default() -> Self {
        Self {
            root: RefCell::new(None),
            scopes: RefCell::new(Vec::new()),
        }
    }
}

impl<C> fmt::Debug for ContextProvider<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContextProvider")
            .field("root", &self.root.borrow().is_some())
            .field("scopes", &self.scopes.borrow().len())
            .finish()
    }
}

impl<C> ContextProvider<C> {
    /// Creates a provider with no value.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the root value, returning the previous one.
    pub fn provide(&self, value: C) -> Option<C> {
        self.root.borrow_mut().replace(value)
    }

    /// Removes the root value.
    pub fn withdraw(&self) -> Option<C> {
        self.root.borrow_mut().take()
    }

    /// Returns `true` if any value is visible.
    #[must_use]
    pub fn is_provided(&self) -> bool {
        !self.scopes.borrow().is_empty() || self.root.borrow().is_some()
    }

    /// Runs `scope` with `value` as the visible context.
    ///
    /// Scopes nest. The previous value becomes visible again when `scope`
    /// returns or unwinds.
    pub fn with_context<R>(&self, value: C, scope: impl FnOnce() -> R) -> R {
        self.scopes.borrow_mut().push(value);
        let _guard = ScopeGuard {
            scopes: &self.scopes,
        };
        scope()
    }
}

impl<C: Clone> ContextProvider<C> {
    /// Returns the visible context value.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::MissingProvider`] if no value is visible.
    pub fn current(&self) -> Result<C, EngineError> {
        if let Some(value) = self.scopes.borrow().last() {
            return Ok(value.clone());
        }
        self.root
            .borrow()
            .clone()
            .ok_or(EngineError::MissingProvider)
    }
}

struct ScopeGuard<'a, C> {
    scopes: &'a RefCell<Vec<C>>,
}

impl<C> Drop for ScopeGuard<'_, C> {
    fn drop(&mut self) {
        self.scopes.borrow_mut().pop();
    }
}
