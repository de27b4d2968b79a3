//! Functional combinators
//!
//! Each combinator builds a new future fed from the resolutions of an
//! existing one. Nothing is forced eagerly: the derived future is wired
//! through the continuation of its source and resolves whenever the source
//! does. Derived futures inherit the reactivity of their source, so a
//! reactive pipeline stays reactive from end to end.
//!
//! Since a future has a single continuation slot, a future can feed only one
//! combinator. Use a hub to fork a pipeline.

use super::Future;
use crate::error::FutureError;


impl<T: Clone + Send + 'static> Future<T> {
    /// Build a future resolved by `forward` on each resolution of self
    ///
    /// If self rejects the continuation, the derived future fails with the
    /// reason of the rejection.
    ///
    fn derive<U, F>(&self, mut forward: F) -> Future<U>
        where U: Clone + Send + 'static,
              F: FnMut(Result<T, FutureError>, &Future<U>) + Send + 'static
    {
        let derived = Future::with_reactivity(self.is_reactive());
        let target = derived.clone();
        if let Err(error) = self.then(move |result| forward(result, &target)) {
            derived.set_error(error);
        }
        derived
    }

    /// Resolve self with every result of another future, without copying
    /// its reactivity
    pub(crate) fn follow(&self, source: &Future<T>) {
        let target = self.clone();
        if let Err(error) = source.then(move |result| target.set(result)) {
            self.set_error(error);
        }
    }

    /// Transform the value, leaving errors unchanged
    pub fn map<U, F>(&self, mut transform: F) -> Future<U>
        where U: Clone + Send + 'static,
              F: FnMut(T) -> U + Send + 'static
    {
        self.derive(move |result, future| future.set(result.map(&mut transform)))
    }

    /// Transform the error, leaving values unchanged
    pub fn map_error<F>(&self, mut transform: F) -> Future<T>
        where F: FnMut(FutureError) -> FutureError + Send + 'static
    {
        self.derive(move |result, future| {
            future.set(result.map_err(&mut transform))
        })
    }

    /// Chain another asynchronous computation on success
    ///
    /// On failure, `next` is not called and the error is forwarded.
    ///
    pub fn flat_map<U, F>(&self, mut next: F) -> Future<U>
        where U: Clone + Send + 'static,
              F: FnMut(T) -> Future<U> + Send + 'static
    {
        self.derive(move |result, future| match result {
            Ok(value) => future.follow(&next(value)),
            Err(error) => future.set_error(error),
        })
    }

    /// Replace a failure by another asynchronous computation
    ///
    /// On success, the value is forwarded and `fallback` is not called.
    ///
    pub fn recover<F>(&self, mut fallback: F) -> Future<T>
        where F: FnMut(FutureError) -> Future<T> + Send + 'static
    {
        self.derive(move |result, future| match result {
            Ok(value) => future.set_value(value),
            Err(error) => future.follow(&fallback(error)),
        })
    }

    /// Turn some values into failures
    ///
    /// If `check` returns an error for a value, the derived future fails with
    /// that error instead of carrying the value.
    ///
    pub fn filter<F>(&self, mut check: F) -> Future<T>
        where F: FnMut(&T) -> Option<FutureError> + Send + 'static
    {
        self.derive(move |result, future| match result {
            Ok(value) => match check(&value) {
                Some(error) => future.set_error(error),
                None => future.set_value(value),
            },
            Err(error) => future.set_error(error),
        })
    }

    /// Run a closure after either outcome, before forwarding it
    pub fn on_completion<F>(&self, mut closure: F) -> Future<T>
        where F: FnMut() + Send + 'static
    {
        self.derive(move |result, future| {
            closure();
            future.set(result);
        })
    }

    /// Peek at values, forwarding every outcome
    pub fn success<F>(&self, mut on_value: F) -> Future<T>
        where F: FnMut(&T) + Send + 'static
    {
        self.and_then(move |result| {
            if let Ok(value) = result {
                on_value(value);
            }
        })
    }

    /// Peek at errors, forwarding every outcome
    pub fn failure<F>(&self, mut on_error: F) -> Future<T>
        where F: FnMut(&FutureError) + Send + 'static
    {
        self.and_then(move |result| {
            if let Err(error) = result {
                on_error(error);
            }
        })
    }

    /// Peek at every outcome, forwarding it unchanged
    pub fn and_then<F>(&self, mut inspect: F) -> Future<T>
        where F: FnMut(&Result<T, FutureError>) + Send + 'static
    {
        self.derive(move |result, future| {
            inspect(&result);
            future.set(result);
        })
    }

    /// Wrap the value into an option
    pub fn optional(&self) -> Future<Option<T>> {
        self.map(Some)
    }
}


impl<T: Clone + Send + 'static> Future<Option<T>> {
    /// Unwrap an optional value, failing with [`FutureError::NilValue`] if
    /// there is none
    pub fn unwrap_optional(&self) -> Future<T> {
        self.derive(|result, future| {
            future.set(result.and_then(|value| value.ok_or(FutureError::NilValue)))
        })
    }
}
