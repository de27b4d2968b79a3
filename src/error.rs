//! Error types
//!
//! Two families of errors live here. [`FutureError`] is what a future
//! resolves with when it fails: either one of the distinguished failures
//! raised by the future machinery itself, or an opaque domain error handed
//! over by a producer. [`ExecutorError`] covers misuse and resource
//! failures of the scheduling side (queues, executors, batches).

use std::error::Error;
use std::fmt;
use std::io;
use std::sync::Arc;
use thiserror::Error;


/// Failure carried by a future
///
/// Futures must be able to replay their error to several consumers
/// (reactive deliveries, hubs, observers), so the error is cheap to clone:
/// producer-supplied errors are reference counted.
///
#[derive(Clone, Error)]
pub enum FutureError {
    /// A non-reactive future was resolved a second time
    #[error("content already set: cannot set new content once it is set")]
    AlreadyCompleted,

    /// A single-shot future already has a continuation
    #[error("continuation already set: a single-shot future feeds one consumer")]
    ContinuationAlreadySet,

    /// The synchronous accessor found no value to return
    #[error("no value available")]
    NoValue,

    /// An optional value could not be unwrapped because it was empty
    #[error("cannot unwrap because value is none")]
    NilValue,

    /// A bounded wait elapsed before the future was resolved
    #[error("timed out waiting for the future to be resolved")]
    Timeout,

    /// Application-specific error, opaque to this crate
    #[error(transparent)]
    Custom(Arc<dyn Error + Send + Sync + 'static>),
}
//
impl FutureError {
    /// Wrap a producer-supplied error
    pub fn custom<E>(error: E) -> Self
        where E: Error + Send + Sync + 'static
    {
        FutureError::Custom(Arc::new(error))
    }

    /// Try to view the producer-supplied error as a concrete type
    pub fn downcast_ref<E: Error + 'static>(&self) -> Option<&E> {
        match self {
            FutureError::Custom(inner) => inner.downcast_ref::<E>(),
            _ => None,
        }
    }
}
//
impl fmt::Debug for FutureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FutureError::AlreadyCompleted => write!(f, "AlreadyCompleted"),
            FutureError::ContinuationAlreadySet => write!(f, "ContinuationAlreadySet"),
            FutureError::NoValue => write!(f, "NoValue"),
            FutureError::NilValue => write!(f, "NilValue"),
            FutureError::Timeout => write!(f, "Timeout"),
            FutureError::Custom(inner) => write!(f, "Custom({:?})", inner),
        }
    }
}
//
impl PartialEq for FutureError {
    /// Custom errors compare equal when they are the same allocation, or
    /// failing that when they render identically
    fn eq(&self, other: &Self) -> bool {
        use self::FutureError::*;
        match (self, other) {
            (AlreadyCompleted, AlreadyCompleted)
            | (ContinuationAlreadySet, ContinuationAlreadySet)
            | (NoValue, NoValue)
            | (NilValue, NilValue)
            | (Timeout, Timeout) => true,
            (Custom(a), Custom(b)) => {
                Arc::ptr_eq(a, b) || a.to_string() == b.to_string()
            }
            _ => false,
        }
    }
}


/// Failure of the scheduling machinery
#[derive(Debug, Error)]
pub enum ExecutorError {
    /// The worker thread backing a serial queue could not be started
    #[error("failed to spawn the worker thread of queue {name}")]
    Spawn {
        name: String,
        #[source]
        source: io::Error,
    },

    /// A future was added to a batch whose overall callback already fired
    #[error("batch already completed: cannot add more futures")]
    BatchCompleted,

    /// A future could not be tracked because it rejected the continuation
    #[error("future cannot be batched: {0}")]
    Unbatchable(#[from] FutureError),
}
