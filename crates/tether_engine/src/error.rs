//! Error types for the reconciliation engine.

/// Boxed error returned by fallible activation functions.
pub type BoxError = Box<dyn core::error::Error + Send + Sync + 'static>;

/// Errors raised synchronously by engine operations.
///
/// Every variant is reported at the call site that triggered it (an
/// acquisition, an evaluation or a declaration). Nothing is deferred or
/// swallowed.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Context was requested but no provider value is established.
    #[error(
        "no context provider is established; call `provide` or wrap the scope in `with_context`"
    )]
    MissingProvider,

    /// A dynamic activation returned something that is neither "no cleanup"
    /// nor a cleanup function.
    #[error(
        "activation of '{resource}' returned {found}; expected nothing or a cleanup function"
    )]
    InvalidCleanup {
        /// Display name of the resource being activated.
        resource: String,
        /// Description of the rejected value.
        found: String,
    },

    /// A collector tried to become active while another one already was.
    #[error("a collector is already active; evaluations of read functions cannot nest")]
    ReentrantCollection,

    /// An intent was declared outside of a read-function evaluation.
    #[error("intents can only be declared while a read function is being evaluated")]
    NotCollecting,

    /// An activation function re-entered the registry for the very resource it
    /// is activating.
    #[error("activation of '{resource}' re-entered the registry for the same resource")]
    ReentrantActivation {
        /// Display name of the resource being activated.
        resource: String,
    },

    /// A fallible activation function reported failure.
    #[error("activation of '{resource}' failed: {source}")]
    Activation {
        /// Display name of the resource being activated.
        resource: String,
        /// The error reported by the activation function.
        #[source]
        source: BoxError,
    },
}

/// Error returned by fallible evaluations.
///
/// Distinguishes failures of the engine from failures of the read function
/// itself.
#[derive(Debug, thiserror::Error)]
pub enum EvaluateError<E> {
    /// The engine failed to evaluate or reconcile.
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// The read function returned an error.
    #[error("read function failed")]
    Read(#[source] E),
}

impl<E> EvaluateError<E> {
    /// Returns the read function's error, if that is what failed.
    #[must_use]
    pub fn into_read(self) -> Option<E> {
        match self {
            Self::Read(err) => Some(err),
            Self::Engine(_) => None,
        }
    }
}
