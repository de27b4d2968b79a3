//! Serial queue execution context
//!
//! A serial queue owns one worker thread which runs the jobs it receives
//! one at a time, in the order in which they were dispatched. It is the
//! building block for both return contexts (e.g. the main queue) and
//! serializing executors.

use super::{ExecutionContext, Job};
use crate::error::ExecutorError;
use std::panic::{self, AssertUnwindSafe};
use std::thread::{self, ThreadId};


/// ExecutionContext implementation running jobs on a dedicated thread
pub struct SerialQueue {
    /// Name of the queue, also given to its worker thread
    name: String,

    /// Jobs are sent to the worker through this channel
    jobs: flume::Sender<Job>,

    /// Identifier of the worker thread
    worker: ThreadId,
}
//
impl SerialQueue {
    /// Start a new serial queue with its own worker thread
    ///
    /// The worker thread exits once every handle to the queue is dropped
    /// and all pending jobs have run.
    ///
    pub fn new(name: impl Into<String>) -> Result<Self, ExecutorError> {
        let name = name.into();
        let (sender, receiver) = flume::unbounded::<Job>();

        let worker_name = name.clone();
        let handle = thread::Builder::new()
            .name(name.clone())
            .spawn(move || {
                while let Ok(job) = receiver.recv() {
                    // A panicking job must not take the queue down with it
                    if panic::catch_unwind(AssertUnwindSafe(job)).is_err() {
                        event!(ERROR, queue = %worker_name, "job panicked");
                    }
                }
                event!(DEBUG, queue = %worker_name, "serial queue stopped");
            })
            .map_err(|source| ExecutorError::Spawn { name: name.clone(),
                                                     source })?;

        event!(DEBUG, queue = %name, "serial queue started");
        Ok(SerialQueue {
            name,
            jobs: sender,
            worker: handle.thread().id(),
        })
    }
}
//
impl ExecutionContext for SerialQueue {
    fn name(&self) -> &str {
        &self.name
    }

    fn dispatch(&self, job: Job) {
        // The worker only stops after the sender is gone, so this can only
        // fail if the worker thread itself died
        if self.jobs.send(job).is_err() {
            event!(WARN, queue = %self.name,
                   "serial queue worker is gone, job dropped");
        }
    }

    fn is_current(&self) -> bool {
        thread::current().id() == self.worker
    }
}


/// Unit tests
#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex, mpsc};
    use std::time::Duration;

    /// Jobs run in dispatch order
    #[test]
    fn fifo_order() {
        let queue = SerialQueue::new("test.fifo").unwrap();
        let order = Arc::new(Mutex::new(Vec::new()));
        for i in 0..10 {
            let c_order = order.clone();
            queue.dispatch(Box::new(move || c_order.lock().unwrap().push(i)));
        }

        // Wait for a marker job to know that the others are done
        let (sender, receiver) = mpsc::channel();
        queue.dispatch(Box::new(move || sender.send(()).unwrap()));
        receiver.recv_timeout(Duration::from_secs(1)).unwrap();
        assert_eq!(*order.lock().unwrap(), (0..10).collect::<Vec<_>>());
    }

    /// Jobs run on the worker thread, which carries the queue name
    #[test]
    fn worker_thread() {
        let queue = Arc::new(SerialQueue::new("test.worker").unwrap());
        let c_queue = queue.clone();
        let (sender, receiver) = mpsc::channel();
        queue.dispatch(Box::new(move || {
            let name = thread::current().name().map(String::from);
            sender.send((c_queue.is_current(), name)).unwrap();
        }));
        let (current, name) = receiver.recv_timeout(Duration::from_secs(1))
                                      .unwrap();
        assert!(current);
        assert_eq!(name.as_deref(), Some("test.worker"));
        assert!(!queue.is_current());
    }

    /// A panicking job does not stop later jobs from running
    #[test]
    fn survives_panics() {
        let queue = SerialQueue::new("test.panic").unwrap();
        queue.dispatch(Box::new(|| panic!("job failure")));
        let (sender, receiver) = mpsc::channel();
        queue.dispatch(Box::new(move || sender.send(42).unwrap()));
        assert_eq!(receiver.recv_timeout(Duration::from_secs(1)), Ok(42));
    }
}
