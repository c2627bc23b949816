//! Intent identity.
//!
//! An [`Intent`] is a declared need for a resource, identified by its
//! [`ResourceType`] and a string key. Two intents with the same type and key
//! denote the same resource no matter which consumer declared them or which
//! evaluation pass produced them, so intents are freely recreated on every pass
//! and still deduplicate.
//!
//! # Example
//!
//! ```
//! use tether_engine::cleanup::Cleanup;
//! use tether_engine::intent::ResourceType;
//!
//! let room = ResourceType::new("room", |key: &str, _ctx: &()| {
//!     let key = key.to_string();
//!     Cleanup::new(move || drop(key))
//! });
//!
//! assert_eq!(room.intent("42"), room.intent("42"));
//! assert_ne!(room.intent("42"), room.intent("43"));
//! ```

use crate::cleanup::Cleanup;
use crate::error::{BoxError, EngineError};
use core::any::Any;
use core::fmt;
use core::hash::{Hash, Hasher};
use core::sync::atomic::{AtomicU64, Ordering};
use std::rc::Rc;

static NEXT_RESOURCE_TYPE: AtomicU64 = AtomicU64::new(0);

/// Unique identifier of a [`ResourceType`].
///
/// Allocated once per [`ResourceType`] construction. Clones of a resource type
/// share its identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceTypeId(u64);

impl ResourceTypeId {
    fn next() -> Self {
        Self(NEXT_RESOURCE_TYPE.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for ResourceTypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "type#{}", self.0)
    }
}

/// Type-erased activation: `(key, context) -> cleanup`.
type ActivationFn<C> = dyn Fn(&str, &C) -> Result<Cleanup, EngineError>;

struct ResourceTypeInner<C> {
    id: ResourceTypeId,
    name: String,
    activate: Box<ActivationFn<C>>,
}

/// A kind of resource: a diagnostic name plus the activation function that
/// brings one instance into existence.
///
/// The activation receives the intent key and the context value current at
/// acquisition time, and returns the [`Cleanup`] that tears the instance down.
///
/// `ResourceType` is a cheap, reference-counted handle. Cloning it does not
/// create a new resource kind.
pub struct ResourceType<C> {
    inner: Rc<ResourceTypeInner<C>>,
}

impl<C> Clone for ResourceType<C> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<C> fmt::Debug for ResourceType<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceType")
            .field("id", &self.inner.id)
            .field("name", &self.inner.name)
            .finish()
    }
}

impl<C: 'static> ResourceType<C> {
    /// Creates a resource type with an infallible activation.
    #[must_use]
    pub fn new<F>(name: impl Into<String>, activation: F) -> Self
    where
        F: Fn(&str, &C) -> Cleanup + 'static,
    {
        Self::from_boxed(
            name.into(),
            Box::new(move |key, ctx| Ok(activation(key, ctx))),
        )
    }

    /// Creates a resource type whose activation may fail.
    ///
    /// A failed activation surfaces as [`EngineError::Activation`] from the
    /// acquisition that triggered it, and leaves no trace in the registry.
    #[must_use]
    pub fn try_new<F>(name: impl Into<String>, activation: F) -> Self
    where
        F: Fn(&str, &C) -> Result<Cleanup, BoxError> + 'static,
    {
        let name = name.into();
        let resource = name.clone();
        Self::from_boxed(
            name,
            Box::new(move |key, ctx| {
                activation(key, ctx).map_err(|source| EngineError::Activation {
                    resource: display_name(&resource, key),
                    source,
                })
            }),
        )
    }

    /// Creates a resource type whose activation returns a type-erased value.
    ///
    /// The value is checked with [`Cleanup::from_any`]. Anything that is not
    /// "no cleanup" or a cleanup function fails the acquisition with
    /// [`EngineError::InvalidCleanup`].
    #[must_use]
    pub fn dynamic<F>(name: impl Into<String>, activation: F) -> Self
    where
        F: Fn(&str, &C) -> Box<dyn Any> + 'static,
    {
        let name = name.into();
        let resource = name.clone();
        Self::from_boxed(
            name,
            Box::new(move |key, ctx| {
                Cleanup::from_any(activation(key, ctx), &display_name(&resource, key))
            }),
        )
    }

    fn from_boxed(name: String, activate: Box<ActivationFn<C>>) -> Self {
        Self {
            inner: Rc::new(ResourceTypeInner {
                id: ResourceTypeId::next(),
                name,
                activate,
            }),
        }
    }

    /// Creates an intent for the instance of this type identified by `key`.
    #[must_use]
    pub fn intent(&self, key: impl Into<Rc<str>>) -> Intent<C> {
        Intent {
            ty: self.clone(),
            key: key.into(),
        }
    }
}

impl<C> ResourceType<C> {
    /// Returns this type's identifier.
    #[must_use]
    pub fn id(&self) -> ResourceTypeId {
        self.inner.id
    }

    /// Returns the diagnostic name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Returns `true` if both handles refer to the same resource type object.
    #[must_use]
    pub fn ptr_eq(a: &Self, b: &Self) -> bool {
        Rc::ptr_eq(&a.inner, &b.inner)
    }

    /// Runs the activation for `key` with `context`.
    pub(crate) fn activate(&self, key: &str, context: &C) -> Result<Cleanup, EngineError> {
        (self.inner.activate)(key, context)
    }
}

/// Identity of an [`Intent`]: resource type plus key.
///
/// This is the dedup key used by collectors, subscribers and the registry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IntentId {
    ty: ResourceTypeId,
    key: Rc<str>,
}

impl IntentId {
    /// Returns the resource type component.
    #[must_use]
    pub fn resource_type(&self) -> ResourceTypeId {
        self.ty
    }

    /// Returns the key component.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl fmt::Display for IntentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.ty, self.key)
    }
}

/// A declared need for a resource.
///
/// Equality and hashing follow [`IntentId`]: the resource type and the key.
pub struct Intent<C> {
    ty: ResourceType<C>,
    key: Rc<str>,
}

impl<C> Intent<C> {
    /// Returns the identity of this intent.
    #[must_use]
    pub fn id(&self) -> IntentId {
        IntentId {
            ty: self.ty.id(),
            key: Rc::clone(&self.key),
        }
    }

    /// Returns the resource type.
    #[must_use]
    pub fn resource_type(&self) -> &ResourceType<C> {
        &self.ty
    }

    /// Returns the key.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Returns `true` if both intents share the same resource type object and
    /// key allocation, i.e. one was cloned from the other.
    #[must_use]
    pub fn ptr_eq(a: &Self, b: &Self) -> bool {
        ResourceType::ptr_eq(&a.ty, &b.ty) && Rc::ptr_eq(&a.key, &b.key)
    }
}

impl<C> Clone for Intent<C> {
    fn clone(&self) -> Self {
        Self {
            ty: self.ty.clone(),
            key: Rc::clone(&self.key),
        }
    }
}

impl<C> PartialEq for Intent<C> {
    fn eq(&self, other: &Self) -> bool {
        self.ty.id() == other.ty.id() && self.key == other.key
    }
}

impl<C> Eq for Intent<C> {}

impl<C> Hash for Intent<C> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.ty.id().hash(state);
        self.key.hash(state);
    }
}

impl<C> fmt::Debug for Intent<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Intent")
            .field("type", &self.ty.name())
            .field("key", &&*self.key)
            .finish()
    }
}

impl<C> fmt::Display for Intent<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&display_name(self.ty.name(), &self.key))
    }
}

/// `name(key)`, or just `name` for unkeyed intents.
pub(crate) fn display_name(name: &str, key: &str) -> String {
    if key.is_empty() {
        name.to_string()
    } else {
        format!("{name}({key})")
    }
}
