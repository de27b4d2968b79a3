//! Futures: eventual values or errors with continuation dispatch
//!
//! A [`Future`] is shared between a producer, which eventually resolves it
//! with a value or an error, and consumers, which attach a continuation
//! (or build derived futures with the combinators) and are called back
//! once the result is available. Futures are cheap handles: cloning one
//! yields another handle to the same shared state.
//!
//! By default a future is single-shot: the first resolution wins and the
//! continuation fires exactly once. A reactive future instead accepts any
//! number of resolutions, each of them being replayed to its continuation
//! and observers.
//!
//! Continuations run inline on the thread which completes the pair
//! (result, continuation), unless a return context was configured with
//! [`Future::in_queue`], in which case they are dispatched there.

pub mod combinators;
pub mod observer;
pub mod polling;
pub mod time;
pub mod zip;

pub use self::observer::Observer;
pub use self::polling::{Polling, PollingClient, PollingObserver};

use crate::context::{self, ExecutionContext};
use crate::error::FutureError;
use crate::hub::Hub;
use crate::status::{self, FutureState, ResultSlot};
use std::fmt;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError, Weak};
use std::time::{Duration, Instant};


/// Callback receiving the outcome of a future
pub type Continuation<T> = Box<dyn FnMut(Result<T, FutureError>) + Send + 'static>;

/// Continuations may be called several times (reactive futures) from
/// several threads (return contexts), so they are shared behind a mutex
type SharedContinuation<T> = Arc<Mutex<Continuation<T>>>;

/// Hook run right after content is stored
type SharedHook = Arc<Mutex<Box<dyn FnMut() + Send + 'static>>>;

/// Hook amending content right before it is stored
type SharedRewrite<T> =
    Arc<Mutex<Box<dyn FnMut(&mut Result<T, FutureError>) + Send + 'static>>>;


/// Handle to an eventual value of type T, or an error
pub struct Future<T> {
    inner: Arc<Inner<T>>,
}
//
impl<T> Clone for Future<T> {
    fn clone(&self) -> Self {
        Future { inner: self.inner.clone() }
    }
}


/// Non-owning handle to a future
pub struct WeakFuture<T> {
    inner: Weak<Inner<T>>,
}
//
impl<T> Clone for WeakFuture<T> {
    fn clone(&self) -> Self {
        WeakFuture { inner: self.inner.clone() }
    }
}
//
impl<T> WeakFuture<T> {
    /// Get back a future handle, if the future is still alive
    pub fn upgrade(&self) -> Option<Future<T>> {
        self.inner.upgrade().map(|inner| Future { inner })
    }

    /// Truth that this handle refers to the given future
    pub fn refers_to(&self, future: &Future<T>) -> bool {
        std::ptr::eq(self.inner.as_ptr(), Arc::as_ptr(&future.inner))
    }
}


/// State shared by every handle to a future
struct Inner<T> {
    /// Mutable state (mutex-protected)
    shared: Mutex<Shared<T>>,

    /// Condition variable used to wake up synchronous readers
    resolved: Condvar,
}
//
struct Shared<T> {
    /// Where the future stands in its lifecycle
    state: FutureState,

    /// Latest result delivered by the producer
    slot: ResultSlot<T>,

    /// Whether the future accepts more than one resolution
    reactive: bool,

    /// Context on which the continuation runs (inline if None)
    context: Option<Arc<dyn ExecutionContext>>,

    /// Consumer callback
    continuation: Option<SharedContinuation<T>>,

    /// Hook run whenever content is stored
    on_set: Option<SharedHook>,

    /// Hook run before content is stored
    before_set: Option<SharedRewrite<T>>,

    /// Observers, which do not keep the future's interest alive
    observers: Vec<Weak<dyn Observer<T>>>,

    /// Multicast point of this future, created on demand
    hub: Option<Hub<T>>,
}


/// What to do once the state lock has been released
struct Delivery<T> {
    continuation: SharedContinuation<T>,
    context: Option<Arc<dyn ExecutionContext>>,
    result: Result<T, FutureError>,
}


impl<T> Future<T> {
    /// Create a non-owning handle to this future
    pub fn downgrade(&self) -> WeakFuture<T> {
        WeakFuture { inner: Arc::downgrade(&self.inner) }
    }

    /// Truth that two handles refer to the same future
    pub fn ptr_eq(&self, other: &Future<T>) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Current lifecycle state
    pub fn state(&self) -> FutureState {
        self.lock().state
    }

    /// Whether this future accepts more than one resolution
    pub fn is_reactive(&self) -> bool {
        self.lock().reactive
    }

    /// Change reactivity, used when a future mirrors another one
    pub(crate) fn set_reactive(&self, reactive: bool) {
        self.lock().reactive = reactive;
    }

    /// Neutralize the future
    ///
    /// The continuation, hook, observers and stored result are released and
    /// no continuation will ever fire for this future again, whether it is
    /// reactive or not. Synchronous readers blocked on it wake up with
    /// [`FutureError::NoValue`].
    ///
    pub fn complete(&self) {
        let mut shared = self.lock();
        shared.state = FutureState::Completed;
        shared.slot = ResultSlot::Pending;
        shared.continuation = None;
        shared.on_set = None;
        shared.before_set = None;
        shared.observers.clear();
        shared.hub = None;
        drop(shared);
        self.inner.resolved.notify_all();
        event!(TRACE, "future neutralized");
    }

    /// Reset the future to a blank state
    ///
    /// The stored result and the continuation are dropped, so that both can
    /// be provided again. Observers and the content hook are kept.
    ///
    pub fn clear(&self) -> &Self {
        let mut shared = self.lock();
        shared.state = FutureState::Blank;
        shared.slot = ResultSlot::Pending;
        shared.continuation = None;
        self
    }

    /// Configure the context on which the continuation will run
    ///
    /// Returns a handle to the same future, to allow call-site chaining.
    ///
    pub fn in_queue(&self, context: Arc<dyn ExecutionContext>) -> Future<T> {
        self.lock().context = Some(context);
        self.clone()
    }

    /// Run the continuation on the main queue
    pub fn in_main_queue(&self) -> Future<T> {
        self.in_queue(context::main_queue())
    }

    /// Install a hook that runs right after content is stored, before any
    /// continuation is called
    ///
    /// There is a single hook slot: installing a hook replaces the previous
    /// one. The hook of a single-shot future runs at most once.
    ///
    pub fn on_set<F>(&self, hook: F)
        where F: FnMut() + Send + 'static
    {
        let hook: Box<dyn FnMut() + Send + 'static> = Box::new(hook);
        self.lock().on_set = Some(Arc::new(Mutex::new(hook)));
    }

    /// Install a hook that may amend each result right before it is stored
    ///
    /// The hook can replace a value, turn it into an error or recover from
    /// an error. Observers, continuations and synchronous readers only ever
    /// see the amended result. There is a single rewrite slot.
    ///
    pub fn before_set<F>(&self, hook: F)
        where F: FnMut(&mut Result<T, FutureError>) + Send + 'static
    {
        let hook: Box<dyn FnMut(&mut Result<T, FutureError>) + Send + 'static> =
            Box::new(hook);
        self.lock().before_set = Some(Arc::new(Mutex::new(hook)));
    }

    /// Register an observer, which is held weakly
    pub fn add_observer<O>(&self, observer: &Arc<O>)
        where O: Observer<T> + 'static
    {
        let observer: Weak<O> = Arc::downgrade(observer);
        let observer: Weak<dyn Observer<T>> = observer;
        self.lock().observers.push(observer);
    }

    /// Unregister an observer
    pub fn remove_observer<O>(&self, observer: &Arc<O>)
        where O: Observer<T> + 'static
    {
        let target = Arc::as_ptr(observer).cast::<()>();
        self.lock().observers.retain(|weak| {
            weak.as_ptr().cast::<()>() != target && weak.strong_count() > 0
        });
    }

    /// Access the shared state
    fn lock(&self) -> MutexGuard<'_, Shared<T>> {
        // User code never runs under this lock, so poisoning can only come
        // from a panicking clone and the state is still consistent
        self.inner.shared.lock().unwrap_or_else(PoisonError::into_inner)
    }
}


impl<T: Clone + Send + 'static> Future<T> {
    /// Create a blank single-shot future
    pub fn new() -> Self {
        Self::with_reactivity(false)
    }

    /// Create a blank reactive future
    pub fn reactive() -> Self {
        Self::with_reactivity(true)
    }

    /// Create a blank future with the requested reactivity
    pub(crate) fn with_reactivity(reactive: bool) -> Self {
        Future {
            inner: Arc::new(Inner {
                shared: Mutex::new(Shared {
                    state: FutureState::Blank,
                    slot: ResultSlot::Pending,
                    reactive,
                    context: None,
                    continuation: None,
                    on_set: None,
                    before_set: None,
                    observers: Vec::new(),
                    hub: None,
                }),
                resolved: Condvar::new(),
            }),
        }
    }

    /// Create a future which already holds a value
    pub fn from_value(value: T) -> Self {
        Self::from_result(Ok(value))
    }

    /// Create a future which already holds an error
    pub fn from_error(error: FutureError) -> Self {
        Self::from_result(Err(error))
    }

    /// Create a future which already holds a result
    pub fn from_result(result: Result<T, FutureError>) -> Self {
        let future = Self::new();
        future.set(result);
        future
    }

    /// Create a future whose result always equals the one of another future
    ///
    /// Both present and future resolutions of the source are forwarded, and
    /// the new future copies the reactivity of its source.
    ///
    pub fn mirroring(source: &Future<T>) -> Self {
        let future = Self::with_reactivity(source.is_reactive());
        if let Err(error) = future.set_future(source) {
            future.set_error(error);
        }
        future
    }

    /// Create a future and hand it over to a producer
    ///
    /// If the producer fails, the future is resolved with its error.
    ///
    pub fn with<F>(producer: F) -> Self
        where F: FnOnce(&Future<T>) -> Result<(), FutureError>
    {
        let future = Self::new();
        if let Err(error) = producer(&future) {
            future.set_error(error);
        }
        future
    }

    /// Resolve the future with a value
    pub fn set_value(&self, value: T) {
        self.set(Ok(value));
    }

    /// Resolve the future with an error
    pub fn set_error(&self, error: FutureError) {
        self.set(Err(error));
    }

    /// Resolve the future, ignoring the request if it cannot be honored
    pub fn set(&self, result: Result<T, FutureError>) {
        // Rejections are already traced by try_set
        let _ = self.try_set(result);
    }

    /// Resolve the future with the outcome of another future
    ///
    /// This future copies the reactivity of the source and mirrors each of
    /// its resolutions.
    ///
    /// # Errors
    ///
    /// Same as [`Future::then`] on the source.
    ///
    pub fn set_future(&self, source: &Future<T>) -> Result<(), FutureError> {
        self.set_reactive(source.is_reactive());
        let target = self.clone();
        source.then(move |result| target.set(result))
    }

    /// Resolve the future
    ///
    /// # Errors
    ///
    /// [`FutureError::AlreadyCompleted`] is returned, and the future is left
    /// untouched, if the future is single-shot and already holds or has
    /// already sent a result, or if it was neutralized.
    ///
    pub fn try_set(&self, mut result: Result<T, FutureError>)
        -> Result<(), FutureError>
    {
        // Let the rewrite hook amend the content first...
        let rewrite = {
            let shared = self.lock();
            Self::check_settable(&shared)?;
            shared.before_set.clone()
        };
        if let Some(rewrite) = rewrite {
            let mut rewrite = rewrite.lock().unwrap_or_else(PoisonError::into_inner);
            (*rewrite)(&mut result);
        }

        // ...then store it, unless another producer won the race meanwhile
        let (hook, (observers, notified), delivery) = {
            let mut shared = self.lock();
            Self::check_settable(&shared)?;
            shared.slot = ResultSlot::from(result.clone());
            if !shared.reactive {
                shared.before_set = None;
            }
            let hook = shared.on_set.clone();
            let observers = live_observers(&mut shared.observers);
            let notified = if observers.is_empty() {
                None
            } else {
                Some(result.clone())
            };

            // Send it if someone is listening
            let delivery = match shared.continuation.clone() {
                Some(continuation) => {
                    let delivery = Delivery { continuation,
                                              context: shared.context.clone(),
                                              result };
                    Self::after_send(&mut shared);
                    Some(delivery)
                }
                None => {
                    shared.state = FutureState::WaitingForContinuation;
                    if !shared.reactive {
                        shared.on_set = None;
                    }
                    None
                }
            };
            event!(TRACE, state = ?shared.state, "future resolved");
            (hook, (observers, notified), delivery)
        };

        // Wake up synchronous readers
        self.inner.resolved.notify_all();

        if let Some(hook) = hook {
            let mut hook = hook.lock().unwrap_or_else(PoisonError::into_inner);
            (*hook)();
        }
        if let Some(result) = notified {
            for observer in observers.iter() {
                match &result {
                    Ok(value) => observer.did_set_value(self, value),
                    Err(error) => observer.did_set_error(self, error),
                }
            }
        }
        if let Some(delivery) = delivery {
            self.deliver(delivery, &observers);
        }
        Ok(())
    }

    /// Attach the continuation
    ///
    /// The continuation receives every result sent by this future: once for
    /// a single-shot future, once per resolution for a reactive one. If a
    /// result is stored and was not sent yet, the continuation fires right
    /// away.
    ///
    /// A future has a single continuation slot. A reactive future replaces
    /// its continuation with the new one. Use a [`Hub`] to feed several
    /// consumers from one future.
    ///
    /// # Errors
    ///
    /// [`FutureError::ContinuationAlreadySet`] if the future is single-shot
    /// and already has a continuation, [`FutureError::AlreadyCompleted`] if
    /// the future is completed. The continuation is dropped in both cases.
    ///
    pub fn then<F>(&self, continuation: F) -> Result<(), FutureError>
        where F: FnMut(Result<T, FutureError>) + Send + 'static
    {
        let (observers, delivery) = {
            let mut shared = self.lock();
            if status::is_final(shared.state) {
                event!(WARN, "continuation attached to a completed future");
                return Err(FutureError::AlreadyCompleted);
            }
            if shared.continuation.is_some() {
                if !shared.reactive {
                    event!(WARN, "single-shot future already has a continuation");
                    return Err(FutureError::ContinuationAlreadySet);
                }
                event!(DEBUG, "continuation of a reactive future replaced");
            }

            let continuation: Continuation<T> = Box::new(continuation);
            let continuation = Arc::new(Mutex::new(continuation));
            shared.continuation = Some(continuation.clone());
            let unsent = match shared.state {
                FutureState::WaitingForContinuation => shared.slot.to_result(),
                _ => None,
            };
            match unsent {
                None => {
                    shared.state = FutureState::WaitingForResult;
                    event!(TRACE, "continuation waits for a result");
                    return Ok(());
                }
                Some(result) => {
                    let observers = live_observers(&mut shared.observers);
                    let delivery = Delivery { continuation,
                                              context: shared.context.clone(),
                                              result };
                    Self::after_send(&mut shared);
                    (observers, delivery)
                }
            }
        };
        self.deliver(delivery, &observers);
        Ok(())
    }

    /// Block the calling thread until the future is resolved
    ///
    /// Returns the stored value, or the stored error. This must not be
    /// called from the return context of the future, as the result could
    /// then never be delivered.
    ///
    /// # Errors
    ///
    /// The error of the future, or [`FutureError::NoValue`] if the future
    /// was neutralized.
    ///
    pub fn value(&self) -> Result<T, FutureError> {
        let mut shared = self.lock();
        loop {
            if let Some(result) = shared.slot.to_result() {
                return result;
            }
            if shared.state == FutureState::Completed {
                return Err(FutureError::NoValue);
            }
            shared = self.inner.resolved
                         .wait(shared)
                         .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Like [`Future::value`], but give up after some time
    ///
    /// # Errors
    ///
    /// Same as [`Future::value`], plus [`FutureError::Timeout`] if the
    /// future was not resolved in time.
    ///
    pub fn value_timeout(&self, timeout: Duration) -> Result<T, FutureError> {
        let deadline = Instant::now() + timeout;
        let mut shared = self.lock();
        loop {
            if let Some(result) = shared.slot.to_result() {
                return result;
            }
            if shared.state == FutureState::Completed {
                return Err(FutureError::NoValue);
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(FutureError::Timeout);
            }
            shared = self.inner.resolved
                         .wait_timeout(shared, remaining)
                         .unwrap_or_else(PoisonError::into_inner)
                         .0;
        }
    }

    /// Access the result without blocking
    ///
    /// # Errors
    ///
    /// The error of the future, or [`FutureError::NoValue`] while the future
    /// is pending.
    ///
    pub fn try_value(&self) -> Result<T, FutureError> {
        self.lock().slot.to_result().unwrap_or(Err(FutureError::NoValue))
    }

    /// Access the multicast point of this future
    ///
    /// The hub is created on first use, and takes over the continuation of
    /// this future: every later resolution is replayed to the futures
    /// plugged into the hub.
    ///
    /// # Errors
    ///
    /// Same as [`Future::then`], when the hub is created.
    ///
    pub fn hub(&self) -> Result<Hub<T>, FutureError> {
        let hub = {
            let mut shared = self.lock();
            if let Some(hub) = &shared.hub {
                return Ok(hub.clone());
            }
            let hub = Hub::new();
            shared.hub = Some(hub.clone());
            hub
        };
        if let Err(error) = hub.attach(self) {
            self.lock().hub = None;
            return Err(error);
        }
        Ok(hub)
    }

    /// Check that the future accepts a new result
    fn check_settable(shared: &Shared<T>) -> Result<(), FutureError> {
        // Only reactive futures accept more than one result
        let already_resolved = !shared.reactive && !shared.slot.is_pending();
        if status::is_final(shared.state) || already_resolved {
            event!(WARN, state = ?shared.state,
                   "rejected resolution of a completed future");
            return Err(FutureError::AlreadyCompleted);
        }
        Ok(())
    }

    /// Bookkeeping after a result was handed over to the continuation
    fn after_send(shared: &mut Shared<T>) {
        if shared.reactive {
            let has_continuation = shared.continuation.is_some();
            shared.state = FutureState::after_reactive_send(has_continuation);
        } else {
            // Release everything the future will never use again
            shared.state = FutureState::Completed;
            shared.continuation = None;
            shared.on_set = None;
            shared.observers.clear();
        }
    }

    /// Hand over a result to the continuation, on the right context
    fn deliver(&self,
               delivery: Delivery<T>,
               observers: &[Arc<dyn Observer<T>>]) {
        for observer in observers.iter() {
            match &delivery.result {
                Ok(value) => observer.did_send_value(self, value),
                Err(error) => observer.did_send_error(self, error),
            }
        }

        let Delivery { continuation, context, result } = delivery;
        let job = move || {
            let mut continuation = continuation.lock()
                                               .unwrap_or_else(PoisonError::into_inner);
            (*continuation)(result);
        };
        match context {
            Some(context) => {
                event!(TRACE, context = context.name(), "dispatching continuation");
                context.dispatch(Box::new(job));
            }
            None => job(),
        }
    }
}
//
impl<T: Clone + Send + 'static> Default for Future<T> {
    fn default() -> Self {
        Self::new()
    }
}
//
impl<T: fmt::Debug> fmt::Debug for Future<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let shared = self.lock();
        f.debug_struct("Future")
         .field("state", &shared.state)
         .field("slot", &shared.slot)
         .field("reactive", &shared.reactive)
         .finish()
    }
}


/// Collect the observers which are still alive, forgetting the others
fn live_observers<T>(observers: &mut Vec<Weak<dyn Observer<T>>>)
    -> Vec<Arc<dyn Observer<T>>>
{
    let mut live = Vec::with_capacity(observers.len());
    observers.retain(|weak| match weak.upgrade() {
        Some(observer) => {
            live.push(observer);
            true
        }
        None => false,
    });
    live
}
