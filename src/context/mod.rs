//! Execution contexts
//!
//! Whenever a future delivers its result to a continuation, one important
//! design issue is to decide where that continuation should run.
//!
//! The traditional answer is to run it directly on the producer, as part of
//! resolving the future. This approach, also known as inline execution, has
//! minimal scheduling overhead, but long-running continuations then stall
//! the producer, and code which must run on a specific thread (think user
//! interface updates) cannot be expressed.
//!
//! For this reason, a future may be given a return context: a component in
//! charge of receiving jobs from producers and running them in the right
//! place. This module defines the interface of such contexts and provides
//! two implementations, inline execution and serial queues.

pub mod inline;
pub mod queue;

pub use self::inline::Inline;
pub use self::queue::SerialQueue;

use crate::error::ExecutorError;
use std::sync::{Arc, OnceLock};


/// Unit of work handed over to an execution context
pub type Job = Box<dyn FnOnce() + Send + 'static>;


/// Scheduling domain on which continuations can be run
pub trait ExecutionContext: Send + Sync {
    /// Human-readable name, used in traces
    fn name(&self) -> &str;

    /// Schedule a job for execution
    ///
    /// Jobs dispatched from a single thread must run in dispatch order if
    /// the context is serial.
    ///
    fn dispatch(&self, job: Job);

    /// Truth that the calling thread is currently running this context
    fn is_current(&self) -> bool {
        false
    }
}


/// Process-wide serial queue standing in for the main thread
static MAIN_QUEUE: OnceLock<Arc<SerialQueue>> = OnceLock::new();

/// Name of the main queue
pub const MAIN_QUEUE_NAME: &str = "main";


/// Access the main queue, starting it on first use
///
/// Continuations which must not race with each other (typically, anything
/// touching application state owned by a user interface) should be sent
/// there.
///
/// # Panics
///
/// If the worker thread of the main queue cannot be started. Use
/// [`try_main_queue`] to handle that case.
///
pub fn main_queue() -> Arc<SerialQueue> {
    match try_main_queue() {
        Ok(queue) => queue,
        Err(error) => panic!("the main queue could not be started: {}", error),
    }
}


/// Access the main queue, reporting failures to start it
pub fn try_main_queue() -> Result<Arc<SerialQueue>, ExecutorError> {
    if let Some(queue) = MAIN_QUEUE.get() {
        return Ok(queue.clone());
    }

    // Racing initializers drop their queue, whose worker then exits
    let queue = Arc::new(SerialQueue::new(MAIN_QUEUE_NAME)?);
    Ok(MAIN_QUEUE.get_or_init(|| queue).clone())
}


/// Unit tests
#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::time::Duration;

    /// The main queue is a single shared instance
    #[test]
    fn main_queue_is_shared() {
        let first = main_queue();
        let second = main_queue();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.name(), MAIN_QUEUE_NAME);
    }

    /// The fallible accessor hands out the same queue
    #[test]
    fn try_main_queue_is_shared() {
        let queue = try_main_queue().unwrap();
        assert!(Arc::ptr_eq(&queue, &main_queue()));
        assert!(Arc::ptr_eq(&queue, &try_main_queue().unwrap()));
    }

    /// Jobs sent to the main queue run there
    #[test]
    fn main_queue_runs_jobs() {
        let (sender, receiver) = mpsc::channel();
        let queue = main_queue();
        let c_queue = queue.clone();
        queue.dispatch(Box::new(move || {
            sender.send(c_queue.is_current()).unwrap();
        }));
        let ran_on_queue = receiver.recv_timeout(Duration::from_secs(1))
                                   .unwrap();
        assert!(ran_on_queue);
        assert!(!queue.is_current());
    }
}
