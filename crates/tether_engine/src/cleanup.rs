//! The teardown half of an activation.
//!
//! Activation functions return a [`Cleanup`]: either nothing, or a one-shot
//! function that tears the resource down. Hosts that bridge untyped callbacks
//! can hand the engine a type-erased value instead, which is checked once at
//! the boundary by [`Cleanup::from_any`].

use crate::error::EngineError;
use core::any::Any;
use core::fmt;

/// Teardown returned by an activation function.
///
/// [`Cleanup::None`] means the activation has nothing to tear down. The
/// registry treats it as a no-op and reports a leak diagnostic, since a
/// resource with no teardown usually means a forgotten unsubscribe.
#[derive(Default)]
pub enum Cleanup {
    /// Nothing to tear down.
    #[default]
    None,
    /// Tears the resource down. Invoked at most once.
    Some(Box<dyn FnOnce()>),
}

impl Cleanup {
    /// Wraps a teardown function.
    #[must_use]
    pub fn new(teardown: impl FnOnce() + 'static) -> Self {
        Self::Some(Box::new(teardown))
    }

    /// Returns `true` if there is nothing to tear down.
    #[must_use]
    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    /// Runs the teardown, if any.
    pub fn run(self) {
        if let Self::Some(teardown) = self {
            teardown();
        }
    }

    /// Converts a type-erased activation result into a [`Cleanup`].
    ///
    /// Accepted values:
    ///
    /// | Value | Result |
    /// |-------|--------|
    /// | `()` | [`Cleanup::None`] |
    /// | `Cleanup` | itself |
    /// | `Option<Cleanup>` | the inner cleanup, or [`Cleanup::None`] |
    /// | `Box<dyn FnOnce()>` | [`Cleanup::Some`] |
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidCleanup`] for any other value.
    pub fn from_any(value: Box<dyn Any>, resource: &str) -> Result<Self, EngineError> {
        let value = match value.downcast::<Self>() {
            Ok(cleanup) => return Ok(*cleanup),
            Err(value) => value,
        };
        let value = match value.downcast::<Option<Self>>() {
            Ok(cleanup) => return Ok(cleanup.unwrap_or_default()),
            Err(value) => value,
        };
        let value = match value.downcast::<()>() {
            Ok(_) => return Ok(Self::None),
            Err(value) => value,
        };
        match value.downcast::<Box<dyn FnOnce()>>() {
            Ok(teardown) => Ok(Self::Some(*teardown)),
            Err(value) => Err(EngineError::InvalidCleanup {
                resource: resource.to_string(),
                found: describe_any(value.as_ref()),
            }),
        }
    }
}

impl From<()> for Cleanup {
    fn from((): ()) -> Self {
        Self::None
    }
}

impl From<Option<Box<dyn FnOnce()>>> for Cleanup {
    fn from(teardown: Option<Box<dyn FnOnce()>>) -> Self {
        teardown.map_or(Self::None, Self::Some)
    }
}

impl fmt::Debug for Cleanup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("Cleanup::None"),
            Self::Some(_) => f.write_str("Cleanup::Some(..)"),
        }
    }
}

// Best-effort description of a rejected value for the error message.
fn describe_any(value: &dyn Any) -> String {
    if let Some(text) = value.downcast_ref::<&'static str>() {
        format!("the string {text:?}")
    } else if let Some(text) = value.downcast_ref::<String>() {
        format!("the string {text:?}")
    } else if value.is::<bool>() {
        "a bool".to_string()
    } else if value.is::<i32>() || value.is::<i64>() || value.is::<u32>() || value.is::<u64>() {
        "a number".to_string()
    } else {
        format!("a value of unsupported type ({:?})", value.type_id())
    }
}
