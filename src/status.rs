//! Facilities to represent the status of futures
//!
//! A future is modelled as a small state machine. It starts blank, then
//! receives its two ingredients, a result and a continuation, in either
//! order. Once both are present the result is sent to the continuation.
//! Single-shot futures stop there, whereas reactive futures go back to
//! waiting for their next result.
//!
//! Alongside the state lives the result slot, which holds what the
//! producer has delivered so far.

use crate::error::FutureError;


/// Lifecycle of a future
///
/// Here are the possible state transitions:
///
/// - Blank -> WaitingForContinuation (result set first)
/// - Blank -> WaitingForResult (continuation attached first)
/// - WaitingForContinuation / WaitingForResult -> Completed (single-shot)
/// - WaitingForContinuation / WaitingForResult -> WaitingForResult (reactive)
/// - any -> Completed (explicit neutralization)
/// - any -> Blank (explicit clear)
///
/// Once a future is Completed, it won't fire any continuation anymore,
/// whether it is reactive or not.
///
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FutureState {
    /// Neither a result nor a continuation has been provided
    Blank,

    /// A result is stored and waits for a continuation to be attached
    WaitingForContinuation,

    /// A continuation is attached and waits for a result
    WaitingForResult,

    /// The result has been sent, or the future was neutralized
    Completed,
}
//
impl FutureState {
    /// State to go back to after a reactive future has sent a result
    pub fn after_reactive_send(has_continuation: bool) -> Self {
        if has_continuation {
            FutureState::WaitingForResult
        } else {
            FutureState::WaitingForContinuation
        }
    }
}


/// Check if a state is final (i.e. won't change anymore on its own)
pub fn is_final(state: FutureState) -> bool {
    match state {
        FutureState::Completed => true,
        FutureState::Blank
        | FutureState::WaitingForContinuation
        | FutureState::WaitingForResult => false,
    }
}


/// Storage for what the producer has delivered
///
/// At most one of a value or an error is present at any time. An empty
/// slot means the future is still pending.
///
#[derive(Clone, Debug, PartialEq)]
pub enum ResultSlot<T> {
    /// Nothing has been delivered yet
    Pending,

    /// The producer delivered a value
    Value(T),

    /// The producer delivered an error
    Error(FutureError),
}
//
impl<T> Default for ResultSlot<T> {
    fn default() -> Self {
        ResultSlot::Pending
    }
}
//
impl<T> ResultSlot<T> {
    /// Truth that nothing has been delivered yet
    pub fn is_pending(&self) -> bool {
        matches!(self, ResultSlot::Pending)
    }

    /// Access the stored value, if any
    pub fn value(&self) -> Option<&T> {
        match self {
            ResultSlot::Value(value) => Some(value),
            _ => None,
        }
    }

    /// Access the stored error, if any
    pub fn error(&self) -> Option<&FutureError> {
        match self {
            ResultSlot::Error(error) => Some(error),
            _ => None,
        }
    }
}
//
impl<T: Clone> ResultSlot<T> {
    /// Copy out the delivered result, or None while pending
    pub fn to_result(&self) -> Option<Result<T, FutureError>> {
        match self {
            ResultSlot::Pending => None,
            ResultSlot::Value(value) => Some(Ok(value.clone())),
            ResultSlot::Error(error) => Some(Err(error.clone())),
        }
    }
}
//
impl<T> From<Result<T, FutureError>> for ResultSlot<T> {
    fn from(result: Result<T, FutureError>) -> Self {
        match result {
            Ok(value) => ResultSlot::Value(value),
            Err(error) => ResultSlot::Error(error),
        }
    }
}
