//! Serializing executors
//!
//! An executor is a FIFO queue of units of work, which runs them one at a
//! time and tells whether some work is still outstanding. A unit of work
//! may finish asynchronously, long after the closure which started it has
//! returned, so completion is not inferred from the closure returning.
//! Instead, each unit of work receives an [`EndGuard`], and the next unit of
//! work only starts once that guard has been released.
//!
//! Releasing the guard is either explicit, through [`EndGuard::end`], or
//! implicit when the guard is dropped. A unit of work which panics or forgets
//! about its guard thus cannot stall the executor forever.
//!
//! An executor without a queue does not serialize anything: work then runs
//! immediately on the caller's thread, and the guard only tracks the
//! outstanding count.

pub mod factory;

pub use self::factory::{ExecutorFactory, Scope};

use crate::context::{ExecutionContext, SerialQueue};
use crate::error::ExecutorError;
use crate::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};


/// Serializing queue of units of work
#[derive(Clone)]
pub struct Executor {
    /// Name of the executor, also used for its queue
    name: String,

    /// Queue on which work runs, or None for direct execution
    queue: Option<Arc<SerialQueue>>,

    /// Units of work whose guard was not released yet
    outstanding: Arc<AtomicUsize>,
}
//
impl Executor {
    /// Create an executor backed by its own serial queue
    pub fn new(name: impl Into<String>) -> Result<Self, ExecutorError> {
        let name = name.into();
        let queue = SerialQueue::new(name.clone())?;
        Ok(Self::with_queue(name, Arc::new(queue)))
    }

    /// Create an executor serializing work on an existing queue
    ///
    /// The queue may be shared with other users, whose jobs then interleave
    /// with the units of work of this executor.
    ///
    pub fn with_queue(name: impl Into<String>, queue: Arc<SerialQueue>) -> Self {
        let name = name.into();
        event!(DEBUG, executor = %name, queue = queue.name(), "executor created");
        Executor {
            name,
            queue: Some(queue),
            outstanding: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Create an executor running work immediately on the caller's thread
    pub fn direct() -> Self {
        Executor {
            name: String::from("executor.direct"),
            queue: None,
            outstanding: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Generate a process-unique executor name
    pub fn next_name() -> String {
        static COUNTER: AtomicUsize = AtomicUsize::new(0);
        format!("executor.{}", COUNTER.fetch_add(1, Ordering::Relaxed) + 1)
    }

    /// Name of the executor
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Truth that some submitted work has not ended yet
    pub fn executing(&self) -> bool {
        self.outstanding() > 0
    }

    /// Number of units of work which have not ended yet
    pub fn outstanding(&self) -> usize {
        self.outstanding.load(Ordering::SeqCst)
    }

    /// Truth that two handles refer to the same executor
    pub fn ptr_eq(&self, other: &Executor) -> bool {
        Arc::ptr_eq(&self.outstanding, &other.outstanding)
    }

    /// Submit a unit of work
    ///
    /// The work receives a guard, which must be released (explicitly or by
    /// dropping it) once the work is done. On a serializing executor, the
    /// next unit of work will not start before that.
    ///
    /// Work which ends asynchronously must not wait for a later unit of
    /// work of the same executor, as that would deadlock its queue.
    ///
    pub fn submit<F>(&self, work: F)
        where F: FnOnce(EndGuard) + Send + 'static
    {
        let pending = self.outstanding.fetch_add(1, Ordering::SeqCst) + 1;
        event!(TRACE, executor = %self.name, outstanding = pending, "work submitted");

        let outstanding = self.outstanding.clone();
        let name = self.name.clone();
        match &self.queue {
            None => work(EndGuard { outstanding, signal: None, name }),
            Some(queue) => queue.dispatch(Box::new(move || {
                // Hold the queue until the work signals its end...
                let (signal, ended) = flume::bounded(1);
                work(EndGuard { outstanding, signal: Some(signal), name });

                // ...which also happens if the guard is dropped
                let _ = ended.recv();
            })),
        }
    }

    /// Submit a unit of work which resolves a future
    ///
    /// The work ends as soon as the future is resolved (or dropped without
    /// being resolved), so producers only need to resolve the future. The
    /// returned future mirrors the one handed to the work, and runs its
    /// continuation on the main queue.
    ///
    /// The end itself is signalled on the thread which resolves the future,
    /// not on the main queue, before the continuation is dispatched. The
    /// executor is thus already idle when the continuation runs.
    ///
    pub fn submit_future<T, F>(&self, work: F) -> Future<T>
        where T: Clone + Send + 'static,
              F: FnOnce(Future<T>) + Send + 'static
    {
        let producer = Future::new();
        let result = Future::mirroring(&producer).in_main_queue();
        self.submit(move |guard| {
            let mut guard = Some(guard);
            producer.on_set(move || {
                if let Some(guard) = guard.take() {
                    guard.end();
                }
            });
            work(producer);
        });
        result
    }
}
//
impl Default for Executor {
    fn default() -> Self {
        Self::direct()
    }
}
//
impl std::fmt::Debug for Executor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Executor")
         .field("name", &self.name)
         .field("serial", &self.queue.is_some())
         .field("outstanding", &self.outstanding())
         .finish()
    }
}


/// Proof that a unit of work is in progress
///
/// The work is considered done once the guard is released, either through
/// [`EndGuard::end`] or by dropping it.
///
#[must_use = "dropping the guard ends the unit of work immediately"]
pub struct EndGuard {
    /// Outstanding work counter of the executor
    outstanding: Arc<AtomicUsize>,

    /// Wakes up the queue waiting for this work to end
    signal: Option<flume::Sender<()>>,

    /// Name of the executor, for traces
    name: String,
}
//
impl EndGuard {
    /// Signal that the unit of work is done
    pub fn end(self) {}
}
//
impl Drop for EndGuard {
    /// Release the executor, whether the work ended normally or not
    fn drop(&mut self) {
        // Update the counter first, so that the next unit of work sees it
        let left = self.outstanding.fetch_sub(1, Ordering::SeqCst) - 1;
        event!(TRACE, executor = %self.name, outstanding = left, "work ended");
        if let Some(signal) = self.signal.take() {
            let _ = signal.try_send(());
        }
    }
}
