//! Asynchronous use cases
//!
//! An interactor is the building block of one asynchronous use case, such as
//! "fetch the user profile" or "submit the order". Concrete use cases own an
//! [`Interactor`] and run their work through it: the work is serialized on
//! the interactor's executor, and its outcome is handed back to the caller
//! as a future whose continuation runs on the main queue.
//!
//! Use cases of the same type usually share an executor, so that two
//! instances of "submit the order" never race with each other. The
//! [`Interactor::for_use_case`] constructor does that.
//!
//! Callers may also ask a use case to bypass its caches on the next run
//! through [`Interactor::set_needs_refresh`]. The request is taken at the
//! start of the next cycle and handed to it.

use crate::context::{self, ExecutionContext};
use crate::error::ExecutorError;
use crate::executor::{EndGuard, Executor, ExecutorFactory};
use crate::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};


/// Base of an asynchronous use case
#[derive(Clone, Debug)]
pub struct Interactor {
    /// Executor on which the use case runs
    executor: Executor,

    /// Refresh requested for the next cycle
    refresh: Arc<AtomicBool>,
}
//
impl Interactor {
    /// Create an interactor running on a specific executor
    pub fn new(executor: Executor) -> Self {
        Interactor {
            executor,
            refresh: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Create an interactor sharing the executor of every use case of type U
    pub fn for_use_case<U: ?Sized + 'static>() -> Result<Self, ExecutorError> {
        Ok(Self::new(ExecutorFactory::global().get_for::<U>()?))
    }

    /// Executor on which the use case runs
    pub fn executor(&self) -> &Executor {
        &self.executor
    }

    /// Truth that a cycle of this use case (or of another use case sharing
    /// its executor) is in progress
    pub fn executing(&self) -> bool {
        self.executor.executing()
    }

    /// Request a refresh on the next cycle
    pub fn set_needs_refresh(&self) {
        self.refresh.store(true, Ordering::SeqCst);
    }

    /// Truth that a refresh was requested since the current cycle started
    pub fn needs_refresh(&self) -> bool {
        self.refresh.load(Ordering::SeqCst)
    }

    /// Start a cycle
    ///
    /// The block runs on the executor and receives the cycle handle, which
    /// it ends once the use case is done (possibly asynchronously).
    ///
    pub fn begin<F>(&self, block: F)
        where F: FnOnce(Cycle) + Send + 'static
    {
        let refresh = self.refresh.clone();
        self.executor.submit(move |guard| {
            let refresh = take_refresh(&refresh);
            block(Cycle { guard, refresh });
        });
    }

    /// Run a cycle which ends as soon as the block returns
    pub fn perform<F>(&self, block: F)
        where F: FnOnce(&Cycle) + Send + 'static
    {
        self.begin(move |cycle| {
            block(&cycle);
            cycle.end(|| {});
        });
    }

    /// Run a cycle which ends when a future is resolved
    ///
    /// The block receives the future to resolve, and whether a refresh was
    /// requested before the cycle started. The returned future mirrors it,
    /// and runs its continuation on the main queue.
    ///
    pub fn perform_with_future<T, F>(&self, block: F) -> Future<T>
        where T: Clone + Send + 'static,
              F: FnOnce(Future<T>, bool) + Send + 'static
    {
        let refresh = self.refresh.clone();
        self.executor.submit_future(move |future| {
            block(future, take_refresh(&refresh))
        })
    }
}


/// Handle to a running cycle of a use case
///
/// Dropping the handle ends the cycle.
///
pub struct Cycle {
    guard: EndGuard,
    refresh: bool,
}
//
impl Cycle {
    /// Truth that a refresh was requested before this cycle started
    pub fn refresh(&self) -> bool {
        self.refresh
    }

    /// End the cycle, running a block on the main queue
    ///
    /// The executor is released before the block is dispatched, so the
    /// block already observes the use case as idle.
    ///
    pub fn end<F>(self, block: F)
        where F: FnOnce() + Send + 'static
    {
        self.guard.end();
        context::main_queue().dispatch(Box::new(block));
    }
}


/// Read and clear a refresh request
fn take_refresh(refresh: &AtomicBool) -> bool {
    let requested = refresh.swap(false, Ordering::SeqCst);
    if requested {
        event!(TRACE, "cycle starts with a refresh");
    }
    requested
}


/// Unit tests
#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FutureError;
    use std::collections::HashMap;
    use std::sync::{Mutex, mpsc};
    use std::thread;
    use std::time::Duration;

    /// Use case looking up user names, with a cache
    struct GetUserName {
        interactor: Interactor,
        directory: Arc<HashMap<u32, &'static str>>,
        cache: Arc<Mutex<HashMap<u32, String>>>,
        lookups: Arc<Mutex<u32>>,
    }
    //
    impl GetUserName {
        fn new() -> Self {
            let directory = [(1, "ada"), (2, "grace")].into_iter().collect();
            GetUserName {
                interactor: Interactor::for_use_case::<Self>().unwrap(),
                directory: Arc::new(directory),
                cache: Arc::default(),
                lookups: Arc::default(),
            }
        }

        fn execute(&self, id: u32) -> Future<String> {
            let directory = self.directory.clone();
            let cache = self.cache.clone();
            let lookups = self.lookups.clone();
            self.interactor.perform_with_future(move |future, refresh| {
                if !refresh {
                    if let Some(name) = cache.lock().unwrap().get(&id) {
                        future.set_value(name.clone());
                        return;
                    }
                }
                *lookups.lock().unwrap() += 1;
                match directory.get(&id) {
                    Some(name) => {
                        cache.lock().unwrap().insert(id, name.to_string());
                        future.set_value(name.to_string());
                    }
                    None => future.set_error(FutureError::NilValue),
                }
            })
        }
    }

    /// Use cases produce futures, and honor refresh requests
    #[test]
    fn use_case() {
        let use_case = GetUserName::new();
        assert_eq!(use_case.execute(1).value(), Ok(String::from("ada")));
        assert_eq!(use_case.execute(1).value(), Ok(String::from("ada")));
        assert_eq!(*use_case.lookups.lock().unwrap(), 1);

        use_case.interactor.set_needs_refresh();
        assert!(use_case.interactor.needs_refresh());
        assert_eq!(use_case.execute(1).value(), Ok(String::from("ada")));
        assert!(!use_case.interactor.needs_refresh());
        assert_eq!(*use_case.lookups.lock().unwrap(), 2);

        assert_eq!(use_case.execute(9).value(), Err(FutureError::NilValue));
    }

    /// Use cases of the same type share their executor
    #[test]
    fn shared_executor() {
        let first = GetUserName::new();
        let second = GetUserName::new();
        assert!(first.interactor.executor().ptr_eq(second.interactor.executor()));
        let other = Interactor::for_use_case::<String>().unwrap();
        assert!(!other.executor().ptr_eq(first.interactor.executor()));
    }

    /// Cycles end asynchronously, running their end block on the main queue
    #[test]
    fn begin_end() {
        let interactor = Interactor::new(Executor::new("test.cycle").unwrap());
        let (sender, receiver) = mpsc::channel();
        interactor.set_needs_refresh();
        interactor.begin(move |cycle| {
            let refresh = cycle.refresh();
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(20));
                cycle.end(move || {
                    let on_main = context::main_queue().is_current();
                    sender.send((refresh, on_main)).unwrap();
                });
            });
        });
        assert!(interactor.executing());
        let (refresh, on_main) = receiver.recv_timeout(Duration::from_secs(1))
                                         .unwrap();
        assert!(refresh);
        assert!(on_main);
        assert!(!interactor.executing());
        assert!(!interactor.needs_refresh());
    }

    /// Refresh requests made during a cycle are kept for the next one
    #[test]
    fn refresh_during_cycle() {
        let interactor = Interactor::new(Executor::direct());
        let c_interactor = interactor.clone();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let c_seen = seen.clone();
        interactor.perform(move |cycle| {
            c_seen.lock().unwrap().push(cycle.refresh());
            c_interactor.set_needs_refresh();
        });
        assert!(interactor.needs_refresh());
        let c_seen = seen.clone();
        interactor.perform(move |cycle| c_seen.lock().unwrap().push(cycle.refresh()));
        assert_eq!(*seen.lock().unwrap(), vec![false, true]);
        assert!(!interactor.executing());
    }
}
