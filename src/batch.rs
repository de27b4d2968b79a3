//! Fan-in of several futures
//!
//! A [`Batch`] tracks a set of futures, each tagged with an opaque context
//! value. An item callback is called as each of them completes, in
//! completion order, and a completion callback is called exactly once,
//! after every tracked future has completed and every item callback has
//! returned. Batches are single-use: once the completion callback has
//! fired, no more futures can be added.
//!
//! A batch to which no future was ever added never completes.

use crate::error::{ExecutorError, FutureError};
use crate::future::Future;
use std::mem;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};


/// Called with the outcome and context of each completed future
pub type ItemCallback<T, C> =
    Arc<dyn Fn(&Result<T, FutureError>, &C) + Send + Sync + 'static>;

/// Called once with the last error (if any) and the last context
pub type CompletionCallback<C> =
    Box<dyn FnOnce(Option<FutureError>, Option<C>) + Send + 'static>;


/// Collector waiting for a set of futures
pub struct Batch<T, C = ()> {
    inner: Arc<BatchInner<T, C>>,
}
//
impl<T, C> Clone for Batch<T, C> {
    fn clone(&self) -> Self {
        Batch { inner: self.inner.clone() }
    }
}


struct BatchInner<T, C> {
    state: Mutex<BatchState<T, C>>,
}
//
struct BatchState<T, C> {
    /// Futures (and holds) which have not completed yet
    pending: usize,

    /// Number of futures added so far
    added: usize,

    /// Whether the completion callback has been called
    fired: bool,

    /// Error of the latest failed future
    last_error: Option<FutureError>,

    /// Context of the latest completed future
    last_context: Option<C>,

    on_item: Option<ItemCallback<T, C>>,
    on_completion: Option<CompletionCallback<C>>,
}


impl<T, C> Batch<T, C>
    where T: Clone + Send + 'static,
          C: Clone + Send + 'static
{
    /// Create an empty batch
    pub fn new() -> Self {
        Batch {
            inner: Arc::new(BatchInner {
                state: Mutex::new(BatchState {
                    pending: 0,
                    added: 0,
                    fired: false,
                    last_error: None,
                    last_context: None,
                    on_item: None,
                    on_completion: None,
                }),
            }),
        }
    }

    /// Set the callback called as each future completes
    pub fn on_item<F>(self, callback: F) -> Self
        where F: Fn(&Result<T, FutureError>, &C) + Send + Sync + 'static
    {
        self.lock().on_item = Some(Arc::new(callback));
        self
    }

    /// Set the callback called once every future has completed
    ///
    /// If every future added so far has already completed, the callback is
    /// called right away.
    ///
    pub fn on_completion<F>(self, callback: F) -> Self
        where F: FnOnce(Option<FutureError>, Option<C>) + Send + 'static
    {
        let mut state = self.lock();
        state.on_completion = Some(Box::new(callback));
        let completion = Self::take_completion(&mut state);
        drop(state);
        Self::fire(completion);
        self
    }

    /// Truth that the completion callback has been called
    pub fn is_completed(&self) -> bool {
        self.lock().fired
    }

    /// Number of tracked futures which have not completed yet
    pub fn pending(&self) -> usize {
        self.lock().pending
    }

    /// Track a future, tagged with the default context
    ///
    /// # Errors
    ///
    /// Same as [`Batch::batch_future_with`].
    ///
    pub fn batch_future(&self, future: &Future<T>) -> Result<(), ExecutorError>
        where C: Default
    {
        self.batch_future_with(future, C::default())
    }

    /// Track a future, tagged with a context
    ///
    /// Only the first resolution of a reactive future is taken into account.
    ///
    /// # Errors
    ///
    /// [`ExecutorError::BatchCompleted`] if the batch already completed,
    /// [`ExecutorError::Unbatchable`] if the future rejects the batch's
    /// continuation. The future is not tracked in either case.
    ///
    pub fn batch_future_with(&self, future: &Future<T>, context: C)
        -> Result<(), ExecutorError>
    {
        {
            let mut state = self.lock();
            if state.fired {
                event!(WARN, "future added to a completed batch");
                return Err(ExecutorError::BatchCompleted);
            }
            state.pending += 1;
            state.added += 1;
        }

        let batch = self.clone();
        let mut context = Some(context);
        let attached = future.then(move |result| {
            if let Some(context) = context.take() {
                batch.item_done(result, context);
            }
        });

        // Forget about futures which cannot report their completion
        if let Err(error) = attached {
            let completion = {
                let mut state = self.lock();
                state.pending -= 1;
                state.added -= 1;
                Self::take_completion(&mut state)
            };
            Self::fire(completion);
            return Err(ExecutorError::Unbatchable(error));
        }
        Ok(())
    }

    /// Track several futures at once
    ///
    /// The completion callback cannot fire before all of them are tracked,
    /// even if some of them are already resolved.
    ///
    /// # Errors
    ///
    /// Same as [`Batch::batch_future_with`]. Futures following the one in
    /// error are not tracked.
    ///
    pub fn batch_futures<I>(&self, futures: I) -> Result<(), ExecutorError>
        where I: IntoIterator<Item = (Future<T>, C)>
    {
        {
            let mut state = self.lock();
            if state.fired {
                return Err(ExecutorError::BatchCompleted);
            }
            state.pending += 1;
        }
        let result = futures.into_iter()
                            .try_for_each(|(future, context)| {
                                self.batch_future_with(&future, context)
                            });
        let completion = {
            let mut state = self.lock();
            state.pending -= 1;
            Self::take_completion(&mut state)
        };
        Self::fire(completion);
        result
    }

    /// Account for a completed future
    fn item_done(&self, result: Result<T, FutureError>, context: C) {
        let on_item = self.lock().on_item.clone();
        if let Some(on_item) = on_item {
            on_item(&result, &context);
        }

        let completion = {
            let mut state = self.lock();
            if let Err(error) = result {
                state.last_error = Some(error);
            }
            state.last_context = Some(context);
            state.pending -= 1;
            event!(TRACE, pending = state.pending, "batched future completed");
            Self::take_completion(&mut state)
        };
        Self::fire(completion);
    }

    /// Extract the completion callback and its arguments, if it is time
    fn take_completion(state: &mut BatchState<T, C>)
        -> Option<(CompletionCallback<C>, Option<FutureError>, Option<C>)>
    {
        if state.fired || state.pending > 0 || state.added == 0 {
            return None;
        }
        let callback = state.on_completion.take()?;
        state.fired = true;
        state.on_item = None;
        Some((callback, state.last_error.take(), mem::take(&mut state.last_context)))
    }

    fn fire(completion: Option<(CompletionCallback<C>, Option<FutureError>, Option<C>)>) {
        if let Some((callback, error, context)) = completion {
            event!(TRACE, failed = error.is_some(), "batch completed");
            callback(error, context);
        }
    }

    fn lock(&self) -> MutexGuard<'_, BatchState<T, C>> {
        self.inner.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
//
impl<T, C> Default for Batch<T, C>
    where T: Clone + Send + 'static,
          C: Clone + Send + 'static
{
    fn default() -> Self {
        Self::new()
    }
}


/// Collapse several futures into a future of all their values
///
/// Values are kept in input order. The first error wins. An empty input
/// resolves to an empty vector right away.
///
pub fn all<T, I>(futures: I) -> Future<Vec<T>>
    where T: Clone + Send + 'static,
          I: IntoIterator<Item = Future<T>>
{
    let futures = futures.into_iter().collect::<Vec<_>>();
    let collected = Future::new();
    if futures.is_empty() {
        collected.set_value(Vec::new());
        return collected;
    }

    let values = Arc::new(Mutex::new(vec![None; futures.len()]));
    let (c_values, c_collected) = (values.clone(), collected.clone());
    let batch = Batch::<T, usize>::new()
        .on_item(move |result, &index| match result {
            Ok(value) => {
                c_values.lock().unwrap_or_else(PoisonError::into_inner)[index] =
                    Some(value.clone());
            }
            Err(error) => c_collected.set_error(error.clone()),
        });

    let c_collected = collected.clone();
    let batch = batch.on_completion(move |error, _| {
        if error.is_none() {
            let values = mem::take(&mut *values.lock()
                                               .unwrap_or_else(PoisonError::into_inner));
            c_collected.set_value(values.into_iter().flatten().collect());
        }
    });

    // The batch is not completed yet, so only the futures may refuse it
    let added = batch.batch_futures(futures.into_iter().enumerate()
                                           .map(|(index, future)| (future, index)));
    if let Err(ExecutorError::Unbatchable(error)) = added {
        collected.set_error(error);
    }
    collected
}
